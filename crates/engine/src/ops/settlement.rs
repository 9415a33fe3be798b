//! Settlement: applying and reverting the monetary effect of transactions.
//!
//! A transaction carries its effect iff `processed` is set. `apply_effect`
//! and `revert_effect` are the only places flipping that flag, and both
//! compute the effect from the row they are given, so reverting the stored
//! row always undoes exactly what applying it did.

use std::collections::HashSet;

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, TransactionKind, accounts, budget_categories, budgets, categories,
    transactions,
};

use super::{Engine, with_tx};

/// Outcome of a settlement run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Recurring instances materialized.
    pub generated: u32,
    /// Transactions whose effect has been applied (generated ones included).
    pub processed: u32,
}

/// Signed balance changes of a transaction, one per touched account.
pub(super) fn effects(tx: &transactions::Model) -> ResultEngine<Vec<(Uuid, i64)>> {
    let amount = tx.amount_minor;
    match tx.kind()? {
        TransactionKind::Expense => Ok(vec![(tx.account_id, -amount)]),
        TransactionKind::Income => Ok(vec![(tx.account_id, amount)]),
        TransactionKind::Transfer => {
            let to = tx.receiving_account_id.ok_or_else(|| {
                EngineError::InvalidTransaction("transfer without receiving account".to_string())
            })?;
            Ok(vec![(tx.account_id, -amount), (to, amount)])
        }
    }
}

impl Engine {
    /// Applies the effect of `tx` and marks it processed.
    pub(super) async fn apply_effect(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &transactions::Model,
    ) -> ResultEngine<()> {
        if tx.processed {
            return Err(EngineError::InvalidTransaction(
                "transaction already processed".to_string(),
            ));
        }
        self.shift_effect(db_tx, tx, 1).await?;
        self.set_processed(db_tx, tx.id, true).await?;
        tracing::debug!(transaction = %tx.id, date = %tx.date, "applied transaction");
        Ok(())
    }

    /// Undoes the effect of `tx` and clears its processed flag.
    pub(super) async fn revert_effect(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &transactions::Model,
    ) -> ResultEngine<()> {
        if !tx.processed {
            return Err(EngineError::InvalidTransaction(
                "transaction not processed".to_string(),
            ));
        }
        self.shift_effect(db_tx, tx, -1).await?;
        self.set_processed(db_tx, tx.id, false).await?;
        tracing::debug!(transaction = %tx.id, date = %tx.date, "reverted transaction");
        Ok(())
    }

    /// Applies `tx` if it is due and not yet processed. Returns whether it did.
    pub(super) async fn settle_if_due(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &transactions::Model,
        today: NaiveDate,
    ) -> ResultEngine<bool> {
        if tx.processed || !tx.is_due(today) {
            return Ok(false);
        }
        self.apply_effect(db_tx, tx).await?;
        Ok(true)
    }

    /// Moves balances, daily snapshots and budgets by `sign * effect` without
    /// touching the processed flag. Shared by apply/revert and the full
    /// rebuild.
    pub(super) async fn shift_effect(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &transactions::Model,
        sign: i64,
    ) -> ResultEngine<()> {
        for (account_id, delta) in effects(tx)? {
            let delta = sign * delta;
            accounts::Entity::update_many()
                .col_expr(
                    accounts::Column::CurrentBalanceMinor,
                    Expr::col(accounts::Column::CurrentBalanceMinor).add(delta),
                )
                .filter(accounts::Column::Id.eq(account_id))
                .exec(db_tx)
                .await?;
            self.shift_daily_balance(db_tx, account_id, tx.date, delta)
                .await?;
        }

        if tx.kind()? == TransactionKind::Expense
            && let Some(category_id) = tx.category_id
        {
            let budget_ids = self.covering_budgets(db_tx, category_id, tx.date).await?;
            if !budget_ids.is_empty() {
                budgets::Entity::update_many()
                    .col_expr(
                        budgets::Column::SpentMinor,
                        Expr::col(budgets::Column::SpentMinor).add(sign * tx.amount_minor),
                    )
                    .filter(budgets::Column::Id.is_in(budget_ids))
                    .exec(db_tx)
                    .await?;
            }
        }
        Ok(())
    }

    async fn set_processed(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
        processed: bool,
    ) -> ResultEngine<()> {
        let active = transactions::ActiveModel {
            id: ActiveValue::Set(transaction_id),
            processed: ActiveValue::Set(processed),
            ..Default::default()
        };
        active.update(db_tx).await?;
        Ok(())
    }

    /// Budgets active on `date` that cover `category_id` directly or through
    /// one of its ancestors.
    async fn covering_budgets(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
        date: NaiveDate,
    ) -> ResultEngine<Vec<Uuid>> {
        let chain = self.category_ancestry(db_tx, category_id).await?;
        let links = budget_categories::Entity::find()
            .filter(budget_categories::Column::CategoryId.is_in(chain))
            .all(db_tx)
            .await?;
        let candidate_ids: HashSet<Uuid> = links.into_iter().map(|l| l.budget_id).collect();
        if candidate_ids.is_empty() {
            return Ok(Vec::new());
        }

        let active = budgets::Entity::find()
            .filter(budgets::Column::Id.is_in(candidate_ids))
            .filter(budgets::Column::StartDate.lte(date))
            .filter(budgets::Column::EndDate.gte(date))
            .all(db_tx)
            .await?;
        Ok(active.into_iter().map(|b| b.id).collect())
    }

    /// `category_id` followed by its ancestors, root last.
    pub(super) async fn category_ancestry(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        let mut chain = vec![category_id];
        let mut current = categories::Entity::find_by_id(category_id)
            .one(db_tx)
            .await?
            .and_then(|c| c.parent_id);
        while let Some(parent_id) = current {
            if chain.contains(&parent_id) {
                return Err(EngineError::InvalidCategory(
                    "category tree contains a cycle".to_string(),
                ));
            }
            chain.push(parent_id);
            current = categories::Entity::find_by_id(parent_id)
                .one(db_tx)
                .await?
                .and_then(|c| c.parent_id);
        }
        Ok(chain)
    }

    /// Runs a settlement pass for the current date.
    pub async fn process_pending(&self) -> ResultEngine<ProcessReport> {
        self.process_pending_at(self.today()).await
    }

    /// Runs a settlement pass as if today were `today`.
    ///
    /// Materializes due recurring instances, then applies every unprocessed
    /// transaction that is due. Running it twice in a row is a no-op.
    pub async fn process_pending_at(&self, today: NaiveDate) -> ResultEngine<ProcessReport> {
        let report = with_tx!(self, |db_tx| {
            let mut report = self.generate_due_recurring(&db_tx, today).await?;

            let pending = transactions::Entity::find()
                .filter(transactions::Column::Processed.eq(false))
                .filter(transactions::Column::Date.lte(today))
                .order_by_asc(transactions::Column::Date)
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?;
            for tx in &pending {
                if self.settle_if_due(&db_tx, tx, today).await? {
                    report.processed += 1;
                }
            }
            Ok(report)
        })?;

        tracing::info!(
            %today,
            generated = report.generated,
            processed = report.processed,
            "settlement run completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(kind: TransactionKind, receiving: Option<Uuid>) -> transactions::Model {
        transactions::Model {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            amount_minor: 1250,
            date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            description: None,
            account_id: Uuid::from_u128(1),
            receiving_account_id: receiving,
            category_id: None,
            recurring_transaction_id: None,
            splitwise_transaction_id: None,
            processed: false,
            needs_confirmation: false,
            is_confirmed: None,
        }
    }

    #[test]
    fn expense_and_income_touch_one_account() {
        let expense = effects(&model(TransactionKind::Expense, None)).unwrap();
        assert_eq!(expense, vec![(Uuid::from_u128(1), -1250)]);
        let income = effects(&model(TransactionKind::Income, None)).unwrap();
        assert_eq!(income, vec![(Uuid::from_u128(1), 1250)]);
    }

    #[test]
    fn transfer_moves_money_between_accounts() {
        let to = Uuid::from_u128(2);
        let transfer = effects(&model(TransactionKind::Transfer, Some(to))).unwrap();
        assert_eq!(transfer, vec![(Uuid::from_u128(1), -1250), (to, 1250)]);
        assert!(effects(&model(TransactionKind::Transfer, None)).is_err());
    }
}
