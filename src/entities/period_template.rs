//! Period template references - non-owning links from a period to shared templates.
//!
//! `category` is copied from the template so the id lists can be rebuilt
//! without reading the template rows.

use super::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Period-to-template association
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "period_templates")]
pub struct Model {
    /// Owning period
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_id: i64,
    /// Referenced template
    #[sea_orm(primary_key, auto_increment = false)]
    pub template_id: i64,
    /// Category the reference was made under
    pub category: Category,
}

/// Defines relationships between `PeriodTemplate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each link belongs to one period
    #[sea_orm(
        belongs_to = "super::period::Entity",
        from = "Column::PeriodId",
        to = "super::period::Column::Id"
    )]
    Period,
    /// Each link points at one template
    #[sea_orm(
        belongs_to = "super::template::Entity",
        from = "Column::TemplateId",
        to = "super::template::Column::Id"
    )]
    Template,
}

impl Related<super::period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Period.def()
    }
}

impl Related<super::template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
