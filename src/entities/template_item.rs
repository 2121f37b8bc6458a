//! Template membership join rows.
//!
//! The composite primary key makes each (template, item) pair unique.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Template-to-line-item association
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "template_items")]
pub struct Model {
    /// Owning template
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_id: i64,
    /// Member line item
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i64,
}

/// Defines relationships between `TemplateItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each link belongs to one template
    #[sea_orm(
        belongs_to = "super::template::Entity",
        from = "Column::TemplateId",
        to = "super::template::Column::Id"
    )]
    Template,
    /// Each link points at one line item
    #[sea_orm(
        belongs_to = "super::line_item::Entity",
        from = "Column::ItemId",
        to = "super::line_item::Column::Id"
    )]
    LineItem,
}

impl Related<super::template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
