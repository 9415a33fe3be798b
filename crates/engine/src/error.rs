//! The module contains the error the engine can throw.
//!
//! Validation failures carry a human readable message and are grouped by the
//! entity they refer to ([`InvalidTransaction`], [`InvalidCategory`], ...).
//! Lookups that miss return [`KeyNotFound`], deletions blocked by references
//! return [`InUse`].
//!
//!  [`InvalidTransaction`]: EngineError::InvalidTransaction
//!  [`InvalidCategory`]: EngineError::InvalidCategory
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InUse`]: EngineError::InUse
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid account: {0}")]
    InvalidAccount(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
    #[error("Invalid budget: {0}")]
    InvalidBudget(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Still in use: {0}")]
    InUse(String),
    #[error("Splitwise error: {0}")]
    Splitwise(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::InvalidTransaction(a), Self::InvalidTransaction(b)) => a == b,
            (Self::InvalidAccount(a), Self::InvalidAccount(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::InvalidRecurrence(a), Self::InvalidRecurrence(b)) => a == b,
            (Self::InvalidBudget(a), Self::InvalidBudget(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InUse(a), Self::InUse(b)) => a == b,
            (Self::Splitwise(a), Self::Splitwise(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
