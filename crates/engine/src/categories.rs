//! Category tree.
//!
//! Categories form a forest through `parent_id`. Marking a category obsolete
//! marks its whole subtree obsolete; the reverse never happens implicitly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub description: String,
    pub parent_id: Option<Uuid>,
    /// How much the user expects to spend in this category every month.
    pub expected_monthly_minor: i64,
    pub is_obsolete: bool,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub description: String,
    pub description_norm: String,
    pub parent_id: Option<Uuid>,
    pub expected_monthly_minor: i64,
    pub is_obsolete: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            parent_id: model.parent_id,
            expected_monthly_minor: model.expected_monthly_minor,
            is_obsolete: model.is_obsolete,
        }
    }
}
