//! Transaction primitives.
//!
//! A `Transaction` moves money in (income), out (expense) or between two
//! accounts (transfer). Its monetary effect is applied once, when the
//! transaction is *processed*; see [`Transaction::is_due`].

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidTransaction(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub account_id: Uuid,
    pub receiving_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub recurring_transaction_id: Option<Uuid>,
    pub splitwise_transaction_id: Option<i64>,
    pub processed: bool,
    pub needs_confirmation: bool,
    /// `None` unless `needs_confirmation` is set.
    pub is_confirmed: Option<bool>,
}

impl Transaction {
    /// Whether the transaction should carry its effect as of `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        is_due(self.date, self.needs_confirmation, self.is_confirmed, today)
    }
}

pub(crate) fn is_due(
    date: NaiveDate,
    needs_confirmation: bool,
    is_confirmed: Option<bool>,
    today: NaiveDate,
) -> bool {
    date <= today && (!needs_confirmation || is_confirmed == Some(true))
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub date: Date,
    pub description: Option<String>,
    pub account_id: Uuid,
    pub receiving_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub recurring_transaction_id: Option<Uuid>,
    pub splitwise_transaction_id: Option<i64>,
    pub processed: bool,
    pub needs_confirmation: bool,
    pub is_confirmed: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::recurring_transactions::Entity",
        from = "Column::RecurringTransactionId",
        to = "super::recurring_transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    RecurringTransaction,
    #[sea_orm(
        belongs_to = "super::splitwise::Entity",
        from = "Column::SplitwiseTransactionId",
        to = "super::splitwise::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    SplitwiseTransaction,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::recurring_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringTransaction.def()
    }
}

impl Related<super::splitwise::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitwiseTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn kind(&self) -> Result<TransactionKind, EngineError> {
        TransactionKind::try_from(self.kind.as_str())
    }

    pub(crate) fn is_due(&self, today: NaiveDate) -> bool {
        is_due(self.date, self.needs_confirmation, self.is_confirmed, today)
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: model.kind()?,
            amount_minor: model.amount_minor,
            date: model.date,
            description: model.description,
            account_id: model.account_id,
            receiving_account_id: model.receiving_account_id,
            category_id: model.category_id,
            recurring_transaction_id: model.recurring_transaction_id,
            splitwise_transaction_id: model.splitwise_transaction_id,
            processed: model.processed,
            needs_confirmation: model.needs_confirmation,
            is_confirmed: model.is_confirmed,
        })
    }
}
