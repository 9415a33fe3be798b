use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, EngineError, NewBudgetCmd, ResultEngine, TransactionKind, UpdateBudgetCmd,
    budget_categories, budgets, categories, transactions,
    util::{ensure_positive_amount, normalize_required_text},
};

use super::{Engine, categories::subtree, with_tx};

fn ensure_period(start_date: NaiveDate, end_date: NaiveDate) -> ResultEngine<()> {
    if end_date < start_date {
        return Err(EngineError::InvalidBudget(
            "end date must not be before the start date".to_string(),
        ));
    }
    Ok(())
}

fn dedup_categories(category_ids: Vec<Uuid>) -> ResultEngine<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = category_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();
    if ids.is_empty() {
        return Err(EngineError::InvalidBudget(
            "a budget needs at least one category".to_string(),
        ));
    }
    Ok(ids)
}

impl Engine {
    /// Return a budget snapshot from DB.
    pub async fn budget(&self, budget_id: Uuid) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
        let category_ids = budget_categories::Entity::find()
            .filter(budget_categories::Column::BudgetId.eq(budget_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|link| link.category_id)
            .collect();
        Ok(Budget::from_parts(model, category_ids))
    }

    /// Budgets ordered by start date, optionally only those active on `date`.
    pub async fn list_budgets(&self, active_on: Option<NaiveDate>) -> ResultEngine<Vec<Budget>> {
        let mut query = budgets::Entity::find();
        if let Some(date) = active_on {
            query = query
                .filter(budgets::Column::StartDate.lte(date))
                .filter(budgets::Column::EndDate.gte(date));
        }
        let models = query
            .order_by_asc(budgets::Column::StartDate)
            .order_by_asc(budgets::Column::Id)
            .all(&self.database)
            .await?;

        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in budget_categories::Entity::find()
            .all(&self.database)
            .await?
        {
            links.entry(link.budget_id).or_default().push(link.category_id);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let ids = links.remove(&model.id).unwrap_or_default();
                Budget::from_parts(model, ids)
            })
            .collect())
    }

    /// Create a budget over `[start_date, end_date]`. Its spending is
    /// computed from the expenses already processed in the period.
    pub async fn create_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Uuid> {
        let NewBudgetCmd {
            description,
            amount_minor,
            start_date,
            end_date,
            category_ids,
        } = cmd;
        let description = normalize_required_text(&description, "budget")?;
        ensure_positive_amount(amount_minor)?;
        ensure_period(start_date, end_date)?;
        let category_ids = dedup_categories(category_ids)?;

        with_tx!(self, |db_tx| {
            for category_id in &category_ids {
                self.require_category(&db_tx, *category_id).await?;
            }

            let id = Uuid::new_v4();
            let model = budgets::ActiveModel {
                id: ActiveValue::Set(id),
                description: ActiveValue::Set(description),
                amount_minor: ActiveValue::Set(amount_minor),
                start_date: ActiveValue::Set(start_date),
                end_date: ActiveValue::Set(end_date),
                spent_minor: ActiveValue::Set(0),
            };
            model.insert(&db_tx).await?;
            self.replace_budget_categories(&db_tx, id, &category_ids)
                .await?;
            self.refresh_budget(&db_tx, id).await?;
            Ok(id)
        })
    }

    /// Patch a budget and recompute its spending.
    pub async fn update_budget(&self, cmd: UpdateBudgetCmd) -> ResultEngine<()> {
        let UpdateBudgetCmd {
            budget_id,
            description,
            amount_minor,
            start_date,
            end_date,
            category_ids,
        } = cmd;
        let description = description
            .map(|d| normalize_required_text(&d, "budget"))
            .transpose()?;
        if let Some(amount_minor) = amount_minor {
            ensure_positive_amount(amount_minor)?;
        }
        let category_ids = category_ids.map(dedup_categories).transpose()?;

        with_tx!(self, |db_tx| {
            let current = budgets::Entity::find_by_id(budget_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
            let start_date = start_date.unwrap_or(current.start_date);
            let end_date = end_date.unwrap_or(current.end_date);
            ensure_period(start_date, end_date)?;

            let mut model = budgets::ActiveModel {
                id: ActiveValue::Set(budget_id),
                start_date: ActiveValue::Set(start_date),
                end_date: ActiveValue::Set(end_date),
                ..Default::default()
            };
            if let Some(description) = description {
                model.description = ActiveValue::Set(description);
            }
            if let Some(amount_minor) = amount_minor {
                model.amount_minor = ActiveValue::Set(amount_minor);
            }
            model.update(&db_tx).await?;

            if let Some(category_ids) = category_ids.as_ref() {
                for category_id in category_ids {
                    self.require_category(&db_tx, *category_id).await?;
                }
                self.replace_budget_categories(&db_tx, budget_id, category_ids)
                    .await?;
            }
            self.refresh_budget(&db_tx, budget_id).await?;
            Ok(())
        })
    }

    pub async fn delete_budget(&self, budget_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            budget_categories::Entity::delete_many()
                .filter(budget_categories::Column::BudgetId.eq(budget_id))
                .exec(&db_tx)
                .await?;
            let result = budgets::Entity::delete_by_id(budget_id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound("budget not exists".to_string()));
            }
            Ok(())
        })
    }

    async fn replace_budget_categories(
        &self,
        db_tx: &DatabaseTransaction,
        budget_id: Uuid,
        category_ids: &[Uuid],
    ) -> ResultEngine<()> {
        budget_categories::Entity::delete_many()
            .filter(budget_categories::Column::BudgetId.eq(budget_id))
            .exec(db_tx)
            .await?;
        let links = category_ids.iter().map(|category_id| budget_categories::ActiveModel {
            budget_id: ActiveValue::Set(budget_id),
            category_id: ActiveValue::Set(*category_id),
        });
        budget_categories::Entity::insert_many(links)
            .exec_without_returning(db_tx)
            .await?;
        Ok(())
    }

    /// Sets `spent_minor` to the processed expenses of the period whose
    /// category lies in one of the budget's subtrees.
    async fn refresh_budget(&self, db_tx: &DatabaseTransaction, budget_id: Uuid) -> ResultEngine<()> {
        let all_categories = categories::Entity::find().all(db_tx).await?;
        self.refresh_budget_with(db_tx, budget_id, &all_categories)
            .await
    }

    /// Recomputes every budget, e.g. after the category tree changed shape.
    pub(super) async fn refresh_all_budgets(&self, db_tx: &DatabaseTransaction) -> ResultEngine<()> {
        let all_categories = categories::Entity::find().all(db_tx).await?;
        let budget_ids: Vec<Uuid> = budgets::Entity::find()
            .all(db_tx)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        for budget_id in budget_ids {
            self.refresh_budget_with(db_tx, budget_id, &all_categories)
                .await?;
        }
        Ok(())
    }

    async fn refresh_budget_with(
        &self,
        db_tx: &DatabaseTransaction,
        budget_id: Uuid,
        all_categories: &[categories::Model],
    ) -> ResultEngine<()> {
        let budget = budgets::Entity::find_by_id(budget_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
        let roots = budget_categories::Entity::find()
            .filter(budget_categories::Column::BudgetId.eq(budget_id))
            .all(db_tx)
            .await?;
        let covered: HashSet<Uuid> = roots
            .iter()
            .flat_map(|link| subtree(all_categories, link.category_id))
            .collect();

        let spent: i64 = transactions::Entity::find()
            .filter(transactions::Column::Processed.eq(true))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::Date.gte(budget.start_date))
            .filter(transactions::Column::Date.lte(budget.end_date))
            .filter(transactions::Column::CategoryId.is_in(covered))
            .all(db_tx)
            .await?
            .iter()
            .map(|tx| tx.amount_minor)
            .sum();

        let model = budgets::ActiveModel {
            id: ActiveValue::Set(budget_id),
            spent_minor: ActiveValue::Set(spent),
            ..Default::default()
        };
        model.update(db_tx).await?;
        Ok(())
    }
}
