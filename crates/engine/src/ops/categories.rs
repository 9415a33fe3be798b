use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, NewCategoryCmd, ResultEngine, UpdateCategoryCmd, budget_categories,
    categories, recurring_transactions, transactions,
    util::{normalize_key, normalize_required_text},
};

use super::{Engine, with_tx};

/// `root` and every category below it, parents before children.
pub(super) fn subtree(all: &[categories::Model], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in all {
        if let Some(parent_id) = category.parent_id {
            children.entry(parent_id).or_default().push(category.id);
        }
    }

    let mut out = vec![root];
    let mut seen = HashSet::from([root]);
    let mut cursor = 0;
    while cursor < out.len() {
        if let Some(next) = children.get(&out[cursor]) {
            for child in next {
                if seen.insert(*child) {
                    out.push(*child);
                }
            }
        }
        cursor += 1;
    }
    out
}

impl Engine {
    /// Return a category snapshot from DB.
    pub async fn category(&self, category_id: Uuid) -> ResultEngine<Category> {
        categories::Entity::find_by_id(category_id)
            .one(&self.database)
            .await?
            .map(Category::from)
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    /// Categories ordered by description. Obsolete ones only when asked.
    pub async fn list_categories(&self, include_obsolete: bool) -> ResultEngine<Vec<Category>> {
        let mut query = categories::Entity::find();
        if !include_obsolete {
            query = query.filter(categories::Column::IsObsolete.eq(false));
        }
        let models = query
            .order_by_asc(categories::Column::DescriptionNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Ids of `category_id` and all of its descendants.
    pub async fn category_descendants(&self, category_id: Uuid) -> ResultEngine<Vec<Uuid>> {
        let all = categories::Entity::find().all(&self.database).await?;
        if !all.iter().any(|c| c.id == category_id) {
            return Err(EngineError::KeyNotFound("category not exists".to_string()));
        }
        Ok(subtree(&all, category_id))
    }

    /// Add a category, optionally under a parent.
    ///
    /// Sibling descriptions are unique; the parent must not be obsolete.
    pub async fn create_category(&self, cmd: NewCategoryCmd) -> ResultEngine<Uuid> {
        let NewCategoryCmd {
            description,
            parent_id,
            expected_monthly_minor,
        } = cmd;
        let description = normalize_required_text(&description, "category")?;
        let description_norm = normalize_key(&description, "category")?;
        ensure_expected_monthly(expected_monthly_minor)?;

        with_tx!(self, |db_tx| {
            if let Some(parent_id) = parent_id {
                let parent = self.require_category(&db_tx, parent_id).await?;
                if parent.is_obsolete {
                    return Err(EngineError::InvalidCategory(
                        "parent category is obsolete".to_string(),
                    ));
                }
            }
            self.ensure_sibling_free(&db_tx, parent_id, &description_norm, None)
                .await?;

            let id = Uuid::new_v4();
            let model = categories::ActiveModel {
                id: ActiveValue::Set(id),
                description: ActiveValue::Set(description),
                description_norm: ActiveValue::Set(description_norm),
                parent_id: ActiveValue::Set(parent_id),
                expected_monthly_minor: ActiveValue::Set(expected_monthly_minor),
                is_obsolete: ActiveValue::Set(false),
            };
            model.insert(&db_tx).await?;
            Ok(id)
        })
    }

    /// Patch a category.
    ///
    /// - Moving a category below itself or one of its descendants fails.
    /// - Marking a category obsolete marks its subtree obsolete too; moving
    ///   one below an obsolete parent does the same.
    /// - A category under an obsolete parent cannot be un-obsoleted.
    /// - Moving a category refreshes the spending of every budget, since
    ///   budgets cover subtrees.
    pub async fn update_category(&self, cmd: UpdateCategoryCmd) -> ResultEngine<()> {
        let UpdateCategoryCmd {
            category_id,
            description,
            parent_id,
            expected_monthly_minor,
            is_obsolete,
        } = cmd;
        let description = description
            .map(|d| normalize_required_text(&d, "category"))
            .transpose()?;
        if let Some(amount) = expected_monthly_minor {
            ensure_expected_monthly(amount)?;
        }

        with_tx!(self, |db_tx| {
            let current = self.require_category(&db_tx, category_id).await?;
            let all = categories::Entity::find().all(&db_tx).await?;
            let descendants = subtree(&all, category_id);

            let new_parent = parent_id.unwrap_or(current.parent_id);
            let moved = new_parent != current.parent_id;
            let parent_obsolete = match new_parent {
                Some(parent_id) => {
                    if descendants.contains(&parent_id) {
                        return Err(EngineError::InvalidCategory(
                            "category cannot be moved under itself".to_string(),
                        ));
                    }
                    self.require_category(&db_tx, parent_id).await?.is_obsolete
                }
                None => false,
            };

            let obsolete = match is_obsolete {
                Some(false) if parent_obsolete => {
                    return Err(EngineError::InvalidCategory(
                        "parent category is obsolete".to_string(),
                    ));
                }
                Some(value) => value,
                None => current.is_obsolete || parent_obsolete,
            };

            let (description, description_norm) = match description {
                Some(description) => {
                    let norm = normalize_key(&description, "category")?;
                    (description, norm)
                }
                None => (current.description.clone(), current.description_norm.clone()),
            };
            if moved || description_norm != current.description_norm {
                self.ensure_sibling_free(&db_tx, new_parent, &description_norm, Some(category_id))
                    .await?;
            }

            let model = categories::ActiveModel {
                id: ActiveValue::Set(category_id),
                description: ActiveValue::Set(description),
                description_norm: ActiveValue::Set(description_norm),
                parent_id: ActiveValue::Set(new_parent),
                expected_monthly_minor: ActiveValue::Set(
                    expected_monthly_minor.unwrap_or(current.expected_monthly_minor),
                ),
                is_obsolete: ActiveValue::Set(obsolete),
            };
            model.update(&db_tx).await?;

            if obsolete {
                categories::Entity::update_many()
                    .col_expr(categories::Column::IsObsolete, Expr::value(true))
                    .filter(categories::Column::Id.is_in(descendants))
                    .exec(&db_tx)
                    .await?;
            }
            if moved {
                self.refresh_all_budgets(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// Delete a leaf category nothing refers to.
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, category_id).await?;

            let has_children = categories::Entity::find()
                .filter(categories::Column::ParentId.eq(category_id))
                .one(&db_tx)
                .await?
                .is_some();
            if has_children {
                return Err(EngineError::InUse(
                    "category has subcategories".to_string(),
                ));
            }

            let used = transactions::Entity::find()
                .filter(transactions::Column::CategoryId.eq(category_id))
                .one(&db_tx)
                .await?
                .is_some()
                || recurring_transactions::Entity::find()
                    .filter(recurring_transactions::Column::CategoryId.eq(category_id))
                    .one(&db_tx)
                    .await?
                    .is_some()
                || budget_categories::Entity::find()
                    .filter(budget_categories::Column::CategoryId.eq(category_id))
                    .one(&db_tx)
                    .await?
                    .is_some();
            if used {
                return Err(EngineError::InUse(
                    "category is used, mark it obsolete instead".to_string(),
                ));
            }

            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Fails if `parent_id` already has a child whose key is `description_norm`.
    async fn ensure_sibling_free(
        &self,
        db_tx: &DatabaseTransaction,
        parent_id: Option<Uuid>,
        description_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::DescriptionNorm.eq(description_norm));
        query = match parent_id {
            Some(parent_id) => query.filter(categories::Column::ParentId.eq(parent_id)),
            None => query.filter(categories::Column::ParentId.is_null()),
        };
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(description_norm.to_string()));
        }
        Ok(())
    }
}

fn ensure_expected_monthly(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor < 0 {
        return Err(EngineError::InvalidAmount(
            "expected monthly amount must be >= 0".to_string(),
        ));
    }
    Ok(())
}
