//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. Update commands are patches:
//! `None` leaves a field untouched, `Some(None)` clears a nullable field.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{IntervalUnit, TransactionKind};

/// Create a category.
#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub description: String,
    pub parent_id: Option<Uuid>,
    pub expected_monthly_minor: i64,
}

impl NewCategoryCmd {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            parent_id: None,
            expected_monthly_minor: 0,
        }
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn expected_monthly(mut self, amount_minor: i64) -> Self {
        self.expected_monthly_minor = amount_minor;
        self
    }
}

/// Patch a category.
#[derive(Clone, Debug, Default)]
pub struct UpdateCategoryCmd {
    pub category_id: Uuid,
    pub description: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub expected_monthly_minor: Option<i64>,
    pub is_obsolete: Option<bool>,
}

impl UpdateCategoryCmd {
    #[must_use]
    pub fn new(category_id: Uuid) -> Self {
        Self {
            category_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn expected_monthly(mut self, amount_minor: i64) -> Self {
        self.expected_monthly_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn obsolete(mut self, is_obsolete: bool) -> Self {
        self.is_obsolete = Some(is_obsolete);
        self
    }
}

/// Patch an account. The kind of an account never changes.
#[derive(Clone, Debug, Default)]
pub struct UpdateAccountCmd {
    pub account_id: Uuid,
    pub description: Option<String>,
    pub is_default: Option<bool>,
    pub is_obsolete: Option<bool>,
}

impl UpdateAccountCmd {
    #[must_use]
    pub fn new(account_id: Uuid) -> Self {
        Self {
            account_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_account(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    #[must_use]
    pub fn obsolete(mut self, is_obsolete: bool) -> Self {
        self.is_obsolete = Some(is_obsolete);
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub account_id: Uuid,
    pub receiving_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub needs_confirmation: bool,
}

impl NewTransactionCmd {
    fn new(kind: TransactionKind, account_id: Uuid, amount_minor: i64, date: NaiveDate) -> Self {
        Self {
            kind,
            amount_minor,
            date,
            account_id,
            receiving_account_id: None,
            category_id: None,
            description: None,
            needs_confirmation: false,
        }
    }

    #[must_use]
    pub fn expense(account_id: Uuid, amount_minor: i64, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Expense, account_id, amount_minor, date)
    }

    #[must_use]
    pub fn income(account_id: Uuid, amount_minor: i64, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Income, account_id, amount_minor, date)
    }

    #[must_use]
    pub fn transfer(from: Uuid, to: Uuid, amount_minor: i64, date: NaiveDate) -> Self {
        let mut cmd = Self::new(TransactionKind::Transfer, from, amount_minor, date);
        cmd.receiving_account_id = Some(to);
        cmd
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn needs_confirmation(mut self, needs_confirmation: bool) -> Self {
        self.needs_confirmation = needs_confirmation;
        self
    }
}

/// Patch a transaction.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub date: Option<NaiveDate>,
    pub account_id: Option<Uuid>,
    pub receiving_account_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub description: Option<Option<String>>,
    pub needs_confirmation: Option<bool>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn receiving_account(mut self, account_id: Option<Uuid>) -> Self {
        self.receiving_account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn needs_confirmation(mut self, needs_confirmation: bool) -> Self {
        self.needs_confirmation = Some(needs_confirmation);
        self
    }

    /// True when the patch touches anything besides description/category.
    pub(crate) fn touches_money(&self) -> bool {
        self.kind.is_some()
            || self.amount_minor.is_some()
            || self.date.is_some()
            || self.account_id.is_some()
            || self.receiving_account_id.is_some()
            || self.needs_confirmation.is_some()
    }
}

/// Create a recurring transaction template.
#[derive(Clone, Debug)]
pub struct NewRecurringCmd {
    pub transaction: NewTransactionCmd,
    pub end_date: Option<NaiveDate>,
    pub interval: u32,
    pub interval_unit: IntervalUnit,
}

impl NewRecurringCmd {
    /// `transaction.date` is the first occurrence.
    #[must_use]
    pub fn new(transaction: NewTransactionCmd, interval: u32, interval_unit: IntervalUnit) -> Self {
        Self {
            transaction,
            end_date: None,
            interval,
            interval_unit,
        }
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// Patch a recurring template.
///
/// `start_date`, `interval` and `interval_unit` can only change while no
/// instance has been generated.
#[derive(Clone, Debug, Default)]
pub struct UpdateRecurringCmd {
    pub recurring_id: Uuid,
    pub description: Option<Option<String>>,
    pub amount_minor: Option<i64>,
    pub account_id: Option<Uuid>,
    pub receiving_account_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub needs_confirmation: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub interval: Option<u32>,
    pub interval_unit: Option<IntervalUnit>,
}

impl UpdateRecurringCmd {
    #[must_use]
    pub fn new(recurring_id: Uuid) -> Self {
        Self {
            recurring_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn needs_confirmation(mut self, needs_confirmation: bool) -> Self {
        self.needs_confirmation = Some(needs_confirmation);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: Option<NaiveDate>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn schedule(mut self, start_date: NaiveDate, interval: u32, unit: IntervalUnit) -> Self {
        self.start_date = Some(start_date);
        self.interval = Some(interval);
        self.interval_unit = Some(unit);
        self
    }
}

/// Create a budget.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub description: String,
    pub amount_minor: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category_ids: Vec<Uuid>,
}

/// Patch a budget.
#[derive(Clone, Debug, Default)]
pub struct UpdateBudgetCmd {
    pub budget_id: Uuid,
    pub description: Option<String>,
    pub amount_minor: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_ids: Option<Vec<Uuid>>,
}
