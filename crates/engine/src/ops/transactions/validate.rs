use sea_orm::DatabaseTransaction;
use uuid::Uuid;

use crate::{
    AccountKind, EngineError, ResultEngine, TransactionKind, recurring_transactions, transactions,
    util::ensure_positive_amount,
};

use super::super::Engine;

/// The fields that decide where a transaction's money goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::ops) struct MoneyFields {
    pub(in crate::ops) kind: TransactionKind,
    pub(in crate::ops) amount_minor: i64,
    pub(in crate::ops) account_id: Uuid,
    pub(in crate::ops) receiving_account_id: Option<Uuid>,
    pub(in crate::ops) category_id: Option<Uuid>,
}

impl TryFrom<&transactions::Model> for MoneyFields {
    type Error = EngineError;

    fn try_from(model: &transactions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: model.kind()?,
            amount_minor: model.amount_minor,
            account_id: model.account_id,
            receiving_account_id: model.receiving_account_id,
            category_id: model.category_id,
        })
    }
}

impl TryFrom<&recurring_transactions::Model> for MoneyFields {
    type Error = EngineError;

    fn try_from(model: &recurring_transactions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            account_id: model.account_id,
            receiving_account_id: model.receiving_account_id,
            category_id: model.category_id,
        })
    }
}

impl Engine {
    /// Checks a transaction (or template) shape against the accounts and
    /// categories it refers to.
    ///
    /// - `amount_minor > 0`
    /// - expense/income: a category, no receiving account
    /// - transfer: a distinct receiving account, no category
    /// - referenced rows exist and are not obsolete; rows already referenced
    ///   by `previous` are accepted even if they became obsolete since
    /// - the Splitwise account only takes expenses imported from Splitwise
    pub(in crate::ops) async fn validate_money_fields(
        &self,
        db_tx: &DatabaseTransaction,
        fields: &MoneyFields,
        previous: Option<&MoneyFields>,
        from_splitwise: bool,
    ) -> ResultEngine<()> {
        ensure_positive_amount(fields.amount_minor)?;

        let account = self.require_account(db_tx, fields.account_id).await?;
        let keeps_account = previous.is_some_and(|p| p.account_id == fields.account_id);
        if account.is_obsolete && !keeps_account {
            return Err(EngineError::InvalidAccount("account is obsolete".to_string()));
        }
        let splitwise_account =
            AccountKind::try_from(account.kind.as_str())? == AccountKind::Splitwise;

        match fields.kind {
            TransactionKind::Transfer => {
                let to = fields.receiving_account_id.ok_or_else(|| {
                    EngineError::InvalidTransaction(
                        "transfer requires a receiving account".to_string(),
                    )
                })?;
                if to == fields.account_id {
                    return Err(EngineError::InvalidTransaction(
                        "transfer accounts must differ".to_string(),
                    ));
                }
                if fields.category_id.is_some() {
                    return Err(EngineError::InvalidTransaction(
                        "transfers have no category".to_string(),
                    ));
                }
                let receiving = self.require_account(db_tx, to).await?;
                let keeps_receiving =
                    previous.is_some_and(|p| p.receiving_account_id == Some(to));
                if receiving.is_obsolete && !keeps_receiving {
                    return Err(EngineError::InvalidAccount(
                        "receiving account is obsolete".to_string(),
                    ));
                }
            }
            TransactionKind::Expense | TransactionKind::Income => {
                if fields.receiving_account_id.is_some() {
                    return Err(EngineError::InvalidTransaction(
                        "only transfers have a receiving account".to_string(),
                    ));
                }
                let category_id = fields.category_id.ok_or_else(|| {
                    EngineError::InvalidTransaction("category is required".to_string())
                })?;
                let category = self.require_category(db_tx, category_id).await?;
                let keeps_category = previous.is_some_and(|p| p.category_id == Some(category_id));
                if category.is_obsolete && !keeps_category {
                    return Err(EngineError::InvalidCategory(
                        "category is obsolete".to_string(),
                    ));
                }
                if splitwise_account && !from_splitwise {
                    return Err(EngineError::InvalidTransaction(
                        "expenses on the splitwise account come from Splitwise".to_string(),
                    ));
                }
                if from_splitwise && (!splitwise_account || fields.kind != TransactionKind::Expense)
                {
                    return Err(EngineError::InvalidTransaction(
                        "splitwise expenses belong to the splitwise account".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
