//! Salvadanaio engine.
//!
//! Owns the persistence model (sea-orm entities) and every rule about money:
//! when a transaction is settled, how its effect reaches account balances,
//! the daily-balance history and budgets, and how that effect is reverted
//! when the transaction changes. All entry points live on [`Engine`].

pub use accounts::{Account, AccountKind};
pub use budgets::Budget;
pub use categories::Category;
pub use commands::{
    NewBudgetCmd, NewCategoryCmd, NewRecurringCmd, NewTransactionCmd, UpdateAccountCmd,
    UpdateBudgetCmd, UpdateCategoryCmd, UpdateRecurringCmd, UpdateTransactionCmd,
};
pub use daily_balances::DailyBalance;
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, ProcessReport, SyncReport, TransactionListFilter};
pub use recurring_transactions::{IntervalUnit, RecurringTransaction, occurrence_date};
pub use splitwise::{SourceError, SplitwiseExpense, SplitwiseSource, SplitwiseTransaction};
pub use transactions::{Transaction, TransactionKind};

pub mod accounts;
pub mod budget_categories;
pub mod budgets;
pub mod categories;
mod commands;
pub mod daily_balances;
mod error;
mod money;
mod ops;
pub mod recurring_transactions;
pub mod splitwise;
pub mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
