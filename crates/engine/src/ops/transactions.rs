use chrono::NaiveDate;
use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, NewTransactionCmd, ResultEngine, Transaction, UpdateTransactionCmd, splitwise,
    transactions, util::normalize_optional_text,
};

use super::{Engine, with_tx};

mod list;
mod validate;

pub use list::TransactionListFilter;
pub(super) use validate::MoneyFields;

/// Everything needed to insert a transaction row.
pub(super) struct TransactionDraft {
    pub(super) fields: MoneyFields,
    pub(super) date: NaiveDate,
    pub(super) description: Option<String>,
    pub(super) needs_confirmation: bool,
    pub(super) recurring_transaction_id: Option<Uuid>,
    pub(super) splitwise_transaction_id: Option<i64>,
}

/// Active model with every column set, for full-row rewrites.
pub(super) fn full_active_model(model: &transactions::Model) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: ActiveValue::Set(model.id),
        kind: ActiveValue::Set(model.kind.clone()),
        amount_minor: ActiveValue::Set(model.amount_minor),
        date: ActiveValue::Set(model.date),
        description: ActiveValue::Set(model.description.clone()),
        account_id: ActiveValue::Set(model.account_id),
        receiving_account_id: ActiveValue::Set(model.receiving_account_id),
        category_id: ActiveValue::Set(model.category_id),
        recurring_transaction_id: ActiveValue::Set(model.recurring_transaction_id),
        splitwise_transaction_id: ActiveValue::Set(model.splitwise_transaction_id),
        processed: ActiveValue::Set(model.processed),
        needs_confirmation: ActiveValue::Set(model.needs_confirmation),
        is_confirmed: ActiveValue::Set(model.is_confirmed),
    }
}

impl Engine {
    /// Return a transaction snapshot from DB.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Inserts a row built from `draft` and settles it if already due.
    ///
    /// The caller is responsible for validating the draft.
    pub(super) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        draft: TransactionDraft,
        today: NaiveDate,
    ) -> ResultEngine<(transactions::Model, bool)> {
        let TransactionDraft {
            fields,
            date,
            description,
            needs_confirmation,
            recurring_transaction_id,
            splitwise_transaction_id,
        } = draft;
        let model = transactions::Model {
            id: Uuid::new_v4(),
            kind: fields.kind.as_str().to_string(),
            amount_minor: fields.amount_minor,
            date,
            description,
            account_id: fields.account_id,
            receiving_account_id: fields.receiving_account_id,
            category_id: fields.category_id,
            recurring_transaction_id,
            splitwise_transaction_id,
            processed: false,
            needs_confirmation,
            is_confirmed: needs_confirmation.then_some(false),
        };
        full_active_model(&model).insert(db_tx).await?;
        let applied = self.settle_if_due(db_tx, &model, today).await?;
        Ok((model, applied))
    }

    /// Create a transaction. It is applied right away when its date is not in
    /// the future and it does not wait for a confirmation.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Uuid> {
        let NewTransactionCmd {
            kind,
            amount_minor,
            date,
            account_id,
            receiving_account_id,
            category_id,
            description,
            needs_confirmation,
        } = cmd;
        let fields = MoneyFields {
            kind,
            amount_minor,
            account_id,
            receiving_account_id,
            category_id,
        };
        let today = self.today();

        with_tx!(self, |db_tx| {
            self.validate_money_fields(&db_tx, &fields, None, false)
                .await?;
            let draft = TransactionDraft {
                fields,
                date,
                description: normalize_optional_text(description.as_deref()),
                needs_confirmation,
                recurring_transaction_id: None,
                splitwise_transaction_id: None,
            };
            let (model, _) = self.insert_transaction(&db_tx, draft, today).await?;
            Ok(model.id)
        })
    }

    /// Patch a transaction.
    ///
    /// A processed transaction is reverted, rewritten and applied again if it
    /// is still due, so balances always match the stored row. Transactions
    /// imported from Splitwise only accept description and category changes.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<()> {
        let today = self.today();
        with_tx!(self, |db_tx| {
            let current = self.require_transaction(&db_tx, cmd.transaction_id).await?;
            if current.splitwise_transaction_id.is_some() && cmd.touches_money() {
                return Err(EngineError::InvalidTransaction(
                    "splitwise transactions only accept description and category changes"
                        .to_string(),
                ));
            }

            let mut next = current.clone();
            if let Some(kind) = cmd.kind {
                next.kind = kind.as_str().to_string();
            }
            if let Some(amount_minor) = cmd.amount_minor {
                next.amount_minor = amount_minor;
            }
            if let Some(date) = cmd.date {
                next.date = date;
            }
            if let Some(account_id) = cmd.account_id {
                next.account_id = account_id;
            }
            if let Some(receiving_account_id) = cmd.receiving_account_id {
                next.receiving_account_id = receiving_account_id;
            }
            if let Some(category_id) = cmd.category_id {
                next.category_id = category_id;
            }
            if let Some(description) = cmd.description.as_ref() {
                next.description = normalize_optional_text(description.as_deref());
            }
            if let Some(flag) = cmd.needs_confirmation
                && flag != next.needs_confirmation
            {
                next.needs_confirmation = flag;
                next.is_confirmed = flag.then_some(false);
            }

            let previous = MoneyFields::try_from(&current)?;
            self.validate_money_fields(
                &db_tx,
                &MoneyFields::try_from(&next)?,
                Some(&previous),
                next.splitwise_transaction_id.is_some(),
            )
            .await?;

            if current.processed {
                self.revert_effect(&db_tx, &current).await?;
                next.processed = false;
            }
            full_active_model(&next).update(&db_tx).await?;
            self.settle_if_due(&db_tx, &next, today).await?;
            Ok(())
        })
    }

    /// Delete a transaction, reverting its effect first. Deleting an imported
    /// Splitwise expense makes it importable again.
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let current = self.require_transaction(&db_tx, transaction_id).await?;
            if current.processed {
                self.revert_effect(&db_tx, &current).await?;
            }
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;

            if let Some(splitwise_id) = current.splitwise_transaction_id {
                let cached = splitwise::ActiveModel {
                    id: ActiveValue::Set(splitwise_id),
                    imported: ActiveValue::Set(false),
                    ..Default::default()
                };
                cached.update(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// Confirm (or withdraw the confirmation of) a transaction created with
    /// `needs_confirmation`.
    ///
    /// Confirming a due transaction applies it; withdrawing the confirmation
    /// of a processed one reverts it.
    pub async fn confirm_transaction(
        &self,
        transaction_id: Uuid,
        confirmed: bool,
    ) -> ResultEngine<()> {
        let today = self.today();
        with_tx!(self, |db_tx| {
            let current = self.require_transaction(&db_tx, transaction_id).await?;
            if !current.needs_confirmation {
                return Err(EngineError::InvalidTransaction(
                    "transaction does not need confirmation".to_string(),
                ));
            }
            if current.is_confirmed == Some(confirmed) {
                return Ok(());
            }

            if !confirmed && current.processed {
                self.revert_effect(&db_tx, &current).await?;
            }
            let model = transactions::ActiveModel {
                id: ActiveValue::Set(transaction_id),
                is_confirmed: ActiveValue::Set(Some(confirmed)),
                ..Default::default()
            };
            model.update(&db_tx).await?;

            if confirmed {
                let mut next = current;
                next.is_confirmed = Some(true);
                self.settle_if_due(&db_tx, &next, today).await?;
            }
            Ok(())
        })
    }
}
