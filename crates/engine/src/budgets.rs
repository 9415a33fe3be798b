//! Budgets: a spending cap over a date range for a set of categories.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Processed expenses counted against the budget.
    pub spent_minor: i64,
    pub category_ids: Vec<Uuid>,
}

impl Budget {
    /// What is left to spend; negative once the budget is exceeded.
    pub fn remaining_minor(&self) -> i64 {
        self.amount_minor - self.spent_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub start_date: Date,
    pub end_date: Date,
    pub spent_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_categories::Entity")]
    BudgetCategories,
}

impl Related<super::budget_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Budget {
    pub(crate) fn from_parts(model: Model, category_ids: Vec<Uuid>) -> Self {
        Self {
            id: model.id,
            description: model.description,
            amount_minor: model.amount_minor,
            start_date: model.start_date,
            end_date: model.end_date,
            spent_minor: model.spent_minor,
            category_ids,
        }
    }
}
