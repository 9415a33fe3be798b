//! The module contains `Account` struct and its persistence model.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// What an account represents.
///
/// `Splitwise` is the single shadow account that mirrors the balance shared
/// with other people on Splitwise; only imported Splitwise expenses and
/// transfers may touch it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Normal,
    Splitwise,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Splitwise => "splitwise",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "normal" => Ok(Self::Normal),
            "splitwise" => Ok(Self::Splitwise),
            other => Err(EngineError::InvalidAccount(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// A place where money is kept: a bank account, cash, a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub description: String,
    pub kind: AccountKind,
    pub is_default: bool,
    pub is_obsolete: bool,
    /// Sum of the effects of every processed transaction on this account.
    pub current_balance_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub description: String,
    pub description_norm: String,
    pub kind: String,
    pub is_default: bool,
    pub is_obsolete: bool,
    pub current_balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::daily_balances::Entity")]
    DailyBalances,
}

impl Related<super::daily_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            description: model.description,
            kind: AccountKind::try_from(model.kind.as_str())?,
            is_default: model.is_default,
            is_obsolete: model.is_obsolete,
            current_balance_minor: model.current_balance_minor,
        })
    }
}
