//! Template entity - a named, reusable bundle of line items of one category.

use super::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Template database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "templates")]
pub struct Model {
    /// Unique identifier, shared across all categories
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Which kind of line items this template bundles
    pub category: Category,
    /// Human-readable name (e.g., "Base salary")
    pub name: String,
    /// Free-form notes
    pub description: Option<String>,
    /// When the template was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Template and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One template has many member links
    #[sea_orm(has_many = "super::template_item::Entity")]
    TemplateItems,
    /// One template can be referenced by many plan periods
    #[sea_orm(has_many = "super::period_template::Entity")]
    PeriodTemplates,
}

impl Related<super::template_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateItems.def()
    }
}

impl Related<super::period_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PeriodTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
