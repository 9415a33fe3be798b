//! Recurring transaction templates and their schedule arithmetic.
//!
//! A template produces one [`Transaction`](crate::Transaction) per occurrence.
//! Occurrence `k` (0-based) falls on `start_date + k * interval`; computing
//! every occurrence from `start_date` keeps month-end schedules stable (a
//! template starting on Jan 31st yields Feb 28th, then Mar 31st).

use chrono::{Days, Months, NaiveDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl IntervalUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

impl TryFrom<&str> for IntervalUnit {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "days" => Ok(Self::Days),
            "weeks" => Ok(Self::Weeks),
            "months" => Ok(Self::Months),
            "years" => Ok(Self::Years),
            other => Err(EngineError::InvalidRecurrence(format!(
                "invalid interval unit: {other}"
            ))),
        }
    }
}

/// Returns the date of occurrence `index` of a schedule, `None` when it does
/// not fit in a `NaiveDate`.
pub fn occurrence_date(
    start_date: NaiveDate,
    interval: u32,
    unit: IntervalUnit,
    index: u32,
) -> Option<NaiveDate> {
    let steps = interval.checked_mul(index)?;
    match unit {
        IntervalUnit::Days => start_date.checked_add_days(Days::new(u64::from(steps))),
        IntervalUnit::Weeks => start_date.checked_add_days(Days::new(u64::from(steps) * 7)),
        IntervalUnit::Months => start_date.checked_add_months(Months::new(steps)),
        IntervalUnit::Years => start_date.checked_add_months(Months::new(steps.checked_mul(12)?)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: Uuid,
    pub description: Option<String>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub account_id: Uuid,
    pub receiving_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub needs_confirmation: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub interval: u32,
    pub interval_unit: IntervalUnit,
    /// Number of instances generated so far.
    pub occurrences: u32,
    pub last_occurrence: Option<NaiveDate>,
    /// `None` once the schedule is finished.
    pub next_occurrence: Option<NaiveDate>,
    pub is_finished: bool,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub description: Option<String>,
    pub kind: String,
    pub amount_minor: i64,
    pub account_id: Uuid,
    pub receiving_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub needs_confirmation: bool,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub interval: i32,
    pub interval_unit: String,
    pub occurrences: i32,
    pub last_occurrence: Option<Date>,
    pub next_occurrence: Option<Date>,
    pub is_finished: bool,
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

impl Model {
    pub(crate) fn schedule(&self) -> ResultEngine<(u32, IntervalUnit)> {
        let interval = u32::try_from(self.interval)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                EngineError::InvalidRecurrence(format!("invalid interval: {}", self.interval))
            })?;
        Ok((interval, IntervalUnit::try_from(self.interval_unit.as_str())?))
    }

    /// Date of occurrence `index`, or `None` if it lies past the end date.
    pub(crate) fn occurrence(&self, index: u32) -> ResultEngine<Option<NaiveDate>> {
        let (interval, unit) = self.schedule()?;
        let date = occurrence_date(self.start_date, interval, unit, index).ok_or_else(|| {
            EngineError::InvalidRecurrence("occurrence date out of range".to_string())
        })?;
        Ok(match self.end_date {
            Some(end) if date > end => None,
            _ => Some(date),
        })
    }
}

impl TryFrom<Model> for RecurringTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let (interval, interval_unit) = model.schedule()?;
        Ok(Self {
            id: model.id,
            description: model.description,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            account_id: model.account_id,
            receiving_account_id: model.receiving_account_id,
            category_id: model.category_id,
            needs_confirmation: model.needs_confirmation,
            start_date: model.start_date,
            end_date: model.end_date,
            interval,
            interval_unit,
            occurrences: u32::try_from(model.occurrences).unwrap_or_default(),
            last_occurrence: model.last_occurrence,
            next_occurrence: model.next_occurrence,
            is_finished: model.is_finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_and_weekly_steps() {
        let start = date(2026, 1, 1);
        assert_eq!(
            occurrence_date(start, 3, IntervalUnit::Days, 2),
            Some(date(2026, 1, 7))
        );
        assert_eq!(
            occurrence_date(start, 2, IntervalUnit::Weeks, 1),
            Some(date(2026, 1, 15))
        );
        assert_eq!(occurrence_date(start, 1, IntervalUnit::Days, 0), Some(start));
    }

    #[test]
    fn monthly_schedule_is_anchored_on_start() {
        let start = date(2026, 1, 31);
        assert_eq!(
            occurrence_date(start, 1, IntervalUnit::Months, 1),
            Some(date(2026, 2, 28))
        );
        assert_eq!(
            occurrence_date(start, 1, IntervalUnit::Months, 2),
            Some(date(2026, 3, 31))
        );
    }

    #[test]
    fn yearly_schedule_handles_leap_days() {
        let start = date(2024, 2, 29);
        assert_eq!(
            occurrence_date(start, 1, IntervalUnit::Years, 1),
            Some(date(2025, 2, 28))
        );
        assert_eq!(
            occurrence_date(start, 1, IntervalUnit::Years, 4),
            Some(date(2028, 2, 29))
        );
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert!(IntervalUnit::try_from("fortnights").is_err());
    }
}
