use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{DailyBalance, EngineError, ResultEngine, accounts, budgets, daily_balances, transactions};

use super::{Engine, with_tx};

impl Engine {
    /// Adds `delta` to the balance of `account_id` from `date` onwards.
    ///
    /// The timeline only stores days on which something happened: a missing
    /// snapshot is created from the closest earlier one (or zero), then every
    /// snapshot from `date` on is shifted.
    pub(super) async fn shift_daily_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
        date: NaiveDate,
        delta: i64,
    ) -> ResultEngine<()> {
        if delta == 0 {
            return Ok(());
        }

        let existing = daily_balances::Entity::find_by_id((account_id, date))
            .one(db_tx)
            .await?;
        if existing.is_none() {
            let previous = daily_balances::Entity::find()
                .filter(daily_balances::Column::AccountId.eq(account_id))
                .filter(daily_balances::Column::Date.lt(date))
                .order_by_desc(daily_balances::Column::Date)
                .one(db_tx)
                .await?
                .map(|snapshot| snapshot.balance_minor)
                .unwrap_or(0);
            let snapshot = daily_balances::ActiveModel {
                account_id: ActiveValue::Set(account_id),
                date: ActiveValue::Set(date),
                balance_minor: ActiveValue::Set(previous),
            };
            daily_balances::Entity::insert(snapshot)
                .exec_without_returning(db_tx)
                .await?;
        }

        daily_balances::Entity::update_many()
            .col_expr(
                daily_balances::Column::BalanceMinor,
                Expr::col(daily_balances::Column::BalanceMinor).add(delta),
            )
            .filter(daily_balances::Column::AccountId.eq(account_id))
            .filter(daily_balances::Column::Date.gte(date))
            .exec(db_tx)
            .await?;
        Ok(())
    }

    /// Balance of an account at the end of `date`.
    pub async fn balance_at(&self, account_id: Uuid, date: NaiveDate) -> ResultEngine<i64> {
        accounts::Entity::find_by_id(account_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

        let snapshot = daily_balances::Entity::find()
            .filter(daily_balances::Column::AccountId.eq(account_id))
            .filter(daily_balances::Column::Date.lte(date))
            .order_by_desc(daily_balances::Column::Date)
            .one(&self.database)
            .await?;
        Ok(snapshot.map(|s| s.balance_minor).unwrap_or(0))
    }

    /// Stored snapshots of an account in chronological order, optionally
    /// restricted to `[from, to]`.
    pub async fn daily_balances(
        &self,
        account_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ResultEngine<Vec<DailyBalance>> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(EngineError::InvalidDate(
                "from must not be after to".to_string(),
            ));
        }
        accounts::Entity::find_by_id(account_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

        let mut query =
            daily_balances::Entity::find().filter(daily_balances::Column::AccountId.eq(account_id));
        if let Some(from) = from {
            query = query.filter(daily_balances::Column::Date.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(daily_balances::Column::Date.lte(to));
        }
        let models = query
            .order_by_asc(daily_balances::Column::Date)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(DailyBalance::from).collect())
    }

    /// Rebuilds every derived figure from the processed transactions:
    /// account balances, the daily timeline and budget spending.
    ///
    /// - Unprocessed transactions are ignored.
    /// - Transactions are replayed in chronological order.
    pub async fn recompute_balances(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            daily_balances::Entity::delete_many().exec(&db_tx).await?;
            accounts::Entity::update_many()
                .col_expr(accounts::Column::CurrentBalanceMinor, Expr::value(0i64))
                .exec(&db_tx)
                .await?;
            budgets::Entity::update_many()
                .col_expr(budgets::Column::SpentMinor, Expr::value(0i64))
                .exec(&db_tx)
                .await?;

            let processed = transactions::Entity::find()
                .filter(transactions::Column::Processed.eq(true))
                .order_by_asc(transactions::Column::Date)
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?;
            for tx in &processed {
                self.shift_effect(&db_tx, tx, 1).await?;
            }
            tracing::info!(transactions = processed.len(), "balances recomputed");
            Ok(())
        })
    }
}
