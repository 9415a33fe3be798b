use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{DatabaseConnection, DatabaseTransaction, prelude::*};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{AccountKind, EngineError, ResultEngine};

mod accounts;
mod balances;
mod budgets;
mod categories;
mod recurring;
mod settlement;
mod splitwise;
mod transactions;

pub use settlement::ProcessReport;
pub use splitwise::SyncReport;
pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
///
/// The engine-wide invoke lock is held for the whole block: writers are
/// serialized so two settlements can never interleave their balance updates.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let _invoke = $self.invoke.lock().await;
        let $tx = $self.database.begin().await?;
        let result: ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    timezone: Tz,
    invoke: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Current date in the configured timezone. Transactions dated on or
    /// before it are due.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    async fn require_account(
        &self,
        db: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultEngine<crate::accounts::Model> {
        crate::accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    async fn require_category(
        &self,
        db: &DatabaseTransaction,
        category_id: Uuid,
    ) -> ResultEngine<crate::categories::Model> {
        crate::categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    async fn require_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<crate::transactions::Model> {
        crate::transactions::Entity::find_by_id(transaction_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    async fn require_recurring(
        &self,
        db: &DatabaseTransaction,
        recurring_id: Uuid,
    ) -> ResultEngine<crate::recurring_transactions::Model> {
        crate::recurring_transactions::Entity::find_by_id(recurring_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound("recurring transaction not exists".to_string())
            })
    }

    async fn splitwise_account(
        &self,
        db: &DatabaseTransaction,
    ) -> ResultEngine<Option<crate::accounts::Model>> {
        crate::accounts::Entity::find()
            .filter(crate::accounts::Column::Kind.eq(AccountKind::Splitwise.as_str()))
            .one(db)
            .await
            .map_err(Into::into)
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    timezone: Tz,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            timezone: Tz::UTC,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Timezone used to decide which day "today" is. Defaults to UTC.
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            timezone: self.timezone,
            invoke: Mutex::new(()),
        })
    }
}
