use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, SplitwiseExpense, SplitwiseSource, SplitwiseTransaction,
    TransactionKind, splitwise, splitwise::sync_state, transactions,
};

use super::{
    Engine,
    transactions::{MoneyFields, TransactionDraft, full_active_model},
    with_tx,
};

/// Outcome of a Splitwise synchronization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Expenses seen for the first time.
    pub added: u32,
    /// Cached expenses refreshed with newer data.
    pub updated: u32,
    /// Cached expenses dropped (deleted remotely or no longer involving the user).
    pub removed: u32,
    /// Updates ignored because they were not newer than the cache.
    pub skipped: u32,
    /// Local transactions rewritten after a change upstream.
    pub transactions_updated: u32,
    /// Local transactions deleted together with their expense.
    pub transactions_removed: u32,
}

impl Engine {
    /// Cached Splitwise expenses, newest first. With `only_importable`,
    /// those already imported are left out.
    pub async fn splitwise_transactions(
        &self,
        only_importable: bool,
    ) -> ResultEngine<Vec<SplitwiseTransaction>> {
        let mut query = splitwise::Entity::find();
        if only_importable {
            query = query.filter(splitwise::Column::Imported.eq(false));
        }
        let models = query
            .order_by_desc(splitwise::Column::Date)
            .order_by_desc(splitwise::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(SplitwiseTransaction::from).collect())
    }

    /// Last `updated_at` seen by a sync, if any.
    pub async fn splitwise_cursor(&self) -> ResultEngine<Option<DateTime<Utc>>> {
        Ok(sync_state::Entity::find_by_id(sync_state::ROW_ID)
            .one(&self.database)
            .await?
            .and_then(|state| state.last_updated_at))
    }

    /// Pulls the expenses changed since the last sync and reconciles the
    /// local cache and the imported transactions with them.
    ///
    /// The source is queried before taking the engine lock; the whole batch
    /// is then applied in a single DB transaction.
    pub async fn sync_splitwise<S>(&self, source: &S) -> ResultEngine<SyncReport>
    where
        S: SplitwiseSource + Sync,
    {
        let since = self.splitwise_cursor().await?;
        let mut expenses = source
            .fetch_expenses(since)
            .await
            .map_err(|err| EngineError::Splitwise(err.to_string()))?;
        expenses.sort_by_key(|expense| (expense.updated_at, expense.id));
        let today = self.today();

        let report = with_tx!(self, |db_tx| {
            let mut report = SyncReport::default();
            let mut newest = since;
            for expense in &expenses {
                newest = newest.max(Some(expense.updated_at));
                self.reconcile_expense(&db_tx, expense, today, &mut report)
                    .await?;
            }
            self.store_splitwise_cursor(&db_tx, newest).await?;
            Ok(report)
        })?;

        tracing::info!(
            fetched = expenses.len(),
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            skipped = report.skipped,
            "splitwise sync completed"
        );
        Ok(report)
    }

    /// Turn a cached expense into a local expense of the user's share on the
    /// Splitwise account.
    pub async fn import_splitwise_transaction(
        &self,
        splitwise_id: i64,
        category_id: Uuid,
    ) -> ResultEngine<Uuid> {
        let today = self.today();
        with_tx!(self, |db_tx| {
            let cached = splitwise::Entity::find_by_id(splitwise_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("splitwise transaction not exists".to_string())
                })?;
            if cached.imported {
                return Err(EngineError::ExistingKey(format!(
                    "splitwise transaction {splitwise_id}"
                )));
            }
            let account = self.splitwise_account(&db_tx).await?.ok_or_else(|| {
                EngineError::InvalidAccount("no splitwise account configured".to_string())
            })?;

            let fields = MoneyFields {
                kind: TransactionKind::Expense,
                amount_minor: cached.personal_minor,
                account_id: account.id,
                receiving_account_id: None,
                category_id: Some(category_id),
            };
            self.validate_money_fields(&db_tx, &fields, None, true)
                .await?;

            let draft = TransactionDraft {
                fields,
                date: cached.date,
                description: Some(cached.description.clone()),
                needs_confirmation: false,
                recurring_transaction_id: None,
                splitwise_transaction_id: Some(splitwise_id),
            };
            let (model, _) = self.insert_transaction(&db_tx, draft, today).await?;

            let imported = splitwise::ActiveModel {
                id: ActiveValue::Set(splitwise_id),
                imported: ActiveValue::Set(true),
                ..Default::default()
            };
            imported.update(&db_tx).await?;
            Ok(model.id)
        })
    }

    async fn reconcile_expense(
        &self,
        db_tx: &DatabaseTransaction,
        expense: &SplitwiseExpense,
        today: NaiveDate,
        report: &mut SyncReport,
    ) -> ResultEngine<()> {
        let cached = splitwise::Entity::find_by_id(expense.id).one(db_tx).await?;
        let Some(cached) = cached else {
            if expense.involves_user() {
                cache_model(expense, false).insert(db_tx).await?;
                report.added += 1;
            }
            return Ok(());
        };

        if expense.updated_at <= cached.updated_at {
            report.skipped += 1;
            return Ok(());
        }

        if !expense.involves_user() {
            report.transactions_removed += self.drop_linked_transactions(db_tx, expense.id).await?;
            splitwise::Entity::delete_by_id(expense.id)
                .exec(db_tx)
                .await?;
            report.removed += 1;
            tracing::debug!(splitwise = expense.id, "splitwise expense removed");
            return Ok(());
        }

        cache_model(expense, cached.imported).update(db_tx).await?;
        report.updated += 1;
        if cached.imported {
            report.transactions_updated += self
                .resync_linked_transactions(db_tx, expense, today)
                .await?;
        }
        Ok(())
    }

    /// Reverts and deletes the transactions imported from `splitwise_id`.
    async fn drop_linked_transactions(
        &self,
        db_tx: &DatabaseTransaction,
        splitwise_id: i64,
    ) -> ResultEngine<u32> {
        let linked = transactions::Entity::find()
            .filter(transactions::Column::SplitwiseTransactionId.eq(splitwise_id))
            .all(db_tx)
            .await?;
        let mut removed = 0;
        for tx in linked {
            if tx.processed {
                self.revert_effect(db_tx, &tx).await?;
            }
            transactions::Entity::delete_by_id(tx.id).exec(db_tx).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Rewrites amount, date and description of the imported transactions
    /// from the fresh expense, keeping balances consistent.
    async fn resync_linked_transactions(
        &self,
        db_tx: &DatabaseTransaction,
        expense: &SplitwiseExpense,
        today: NaiveDate,
    ) -> ResultEngine<u32> {
        let linked = transactions::Entity::find()
            .filter(transactions::Column::SplitwiseTransactionId.eq(expense.id))
            .all(db_tx)
            .await?;
        let mut changed = 0;
        for current in linked {
            let description = Some(expense.description.clone());
            if current.amount_minor == expense.personal_minor
                && current.date == expense.date
                && current.description == description
            {
                continue;
            }

            let mut next = current.clone();
            next.amount_minor = expense.personal_minor;
            next.date = expense.date;
            next.description = description;
            if current.processed {
                self.revert_effect(db_tx, &current).await?;
                next.processed = false;
            }
            full_active_model(&next).update(db_tx).await?;
            self.settle_if_due(db_tx, &next, today).await?;
            changed += 1;
        }
        Ok(changed)
    }

    async fn store_splitwise_cursor(
        &self,
        db_tx: &DatabaseTransaction,
        last_updated_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<()> {
        let state = sync_state::ActiveModel {
            id: ActiveValue::Set(sync_state::ROW_ID),
            last_updated_at: ActiveValue::Set(last_updated_at),
        };
        let exists = sync_state::Entity::find_by_id(sync_state::ROW_ID)
            .one(db_tx)
            .await?
            .is_some();
        if exists {
            state.update(db_tx).await?;
        } else {
            state.insert(db_tx).await?;
        }
        Ok(())
    }
}

fn cache_model(expense: &SplitwiseExpense, imported: bool) -> splitwise::ActiveModel {
    splitwise::ActiveModel {
        id: ActiveValue::Set(expense.id),
        description: ActiveValue::Set(expense.description.clone()),
        date: ActiveValue::Set(expense.date),
        updated_at: ActiveValue::Set(expense.updated_at),
        total_minor: ActiveValue::Set(expense.total_minor),
        paid_minor: ActiveValue::Set(expense.paid_minor),
        personal_minor: ActiveValue::Set(expense.personal_minor),
        imported: ActiveValue::Set(imported),
    }
}
