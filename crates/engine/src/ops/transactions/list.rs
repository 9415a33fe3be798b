use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{EngineError, ResultEngine, Transaction, TransactionKind, transactions};

use super::super::Engine;

/// Filters for listing transactions. Both bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Transactions touching this account, as source or destination.
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub recurring_transaction_id: Option<Uuid>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    /// Restrict to processed (`Some(true)`) or pending (`Some(false)`) ones.
    pub processed: Option<bool>,
    /// Only transactions still waiting for the user's confirmation.
    pub awaiting_confirmation: bool,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::InvalidDate(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidTransaction(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::Date.lte(to));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(account_id))
                    .add(transactions::Column::ReceivingAccountId.eq(account_id)),
            );
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(recurring_id) = filter.recurring_transaction_id {
            self = self.filter(transactions::Column::RecurringTransactionId.eq(recurring_id));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(processed) = filter.processed {
            self = self.filter(transactions::Column::Processed.eq(processed));
        }
        if filter.awaiting_confirmation {
            self = self
                .filter(transactions::Column::NeedsConfirmation.eq(true))
                .filter(transactions::Column::IsConfirmed.eq(false));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    date: NaiveDate,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Lists transactions with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(date DESC, id DESC)`. The returned
    /// cursor is `None` on the last page.
    pub async fn list_transactions_page(
        &self,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;

        let limit_plus_one = limit.saturating_add(1);
        let mut query = transactions::Entity::find()
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Id)
            .limit(limit_plus_one);

        if let Some(cursor) = cursor {
            let cursor = TransactionsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::Date.lt(cursor.date))
                    .add(
                        Condition::all()
                            .add(transactions::Column::Date.eq(cursor.date))
                            .add(transactions::Column::Id.lt(cursor.transaction_id)),
                    ),
            );
        }
        query = query.apply_tx_filters(filter);

        let rows = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let out = rows
            .into_iter()
            .take(limit as usize)
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let next_cursor = if has_more {
            out.last()
                .map(|tx| TransactionsCursor {
                    date: tx.date,
                    transaction_id: tx.id,
                })
                .map(|c| c.encode())
                .transpose()?
        } else {
            None
        };

        Ok((out, next_cursor))
    }

    /// First page of [`Engine::list_transactions_page`].
    pub async fn list_transactions(
        &self,
        limit: u64,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let (items, _next) = self.list_transactions_page(limit, None, filter).await?;
        Ok(items)
    }
}
