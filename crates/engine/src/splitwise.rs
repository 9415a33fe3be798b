//! Local mirror of Splitwise expenses.
//!
//! Splitwise owns these records; the engine only caches the expenses the user
//! takes part in and, on request, *imports* one as a local expense on the
//! Splitwise account. A cached expense is either imported (exactly one local
//! transaction points at it) or not (none does).
//!
//! The HTTP client is not part of the engine: anything able to list expenses
//! changed after a point in time implements [`SplitwiseSource`].

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An expense as reported by Splitwise, already reduced to the current user's
/// point of view. Amounts are integer cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitwiseExpense {
    pub id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
    /// Settle-up payments between users; never imported as expenses.
    #[serde(default)]
    pub payment: bool,
    pub total_minor: i64,
    /// What the user paid.
    pub paid_minor: i64,
    /// The user's own share of the expense.
    pub personal_minor: i64,
}

impl SplitwiseExpense {
    /// Whether the expense concerns the user at all.
    pub fn involves_user(&self) -> bool {
        !self.deleted && !self.payment && self.personal_minor > 0
    }
}

/// Error reported by a [`SplitwiseSource`].
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Where expenses come from.
pub trait SplitwiseSource {
    /// Expenses created, changed or deleted after `updated_after` (all of
    /// them when `None`).
    fn fetch_expenses(
        &self,
        updated_after: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<SplitwiseExpense>, SourceError>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitwiseTransaction {
    pub id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub personal_minor: i64,
    pub imported: bool,
}

impl SplitwiseTransaction {
    /// Net position on this expense: positive when others owe the user.
    pub fn owed_minor(&self) -> i64 {
        self.paid_minor - self.personal_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "splitwise_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub description: String,
    pub date: Date,
    pub updated_at: DateTimeUtc,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub personal_minor: i64,
    pub imported: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SplitwiseTransaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            date: model.date,
            updated_at: model.updated_at,
            total_minor: model.total_minor,
            paid_minor: model.paid_minor,
            personal_minor: model.personal_minor,
            imported: model.imported,
        }
    }
}

/// Singleton row remembering how far the last sync got.
pub mod sync_state {
    use sea_orm::entity::prelude::*;

    pub const ROW_ID: i32 = 1;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "splitwise_sync_state")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub last_updated_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
