//! Period entity - a calendar-month span inside a plan.
//!
//! Both bounds are stored as the first day of their month and `start_month <= end_month`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Period database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "periods")]
pub struct Model {
    /// Unique identifier, fresh on every replace
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning plan
    pub plan_id: i64,
    /// First month of the span (day 1)
    pub start_month: Date,
    /// Last month of the span (day 1)
    pub end_month: Date,
    /// When the period was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Period and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each period belongs to one plan
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
    /// One period has many template references
    #[sea_orm(has_many = "super::period_template::Entity")]
    PeriodTemplates,
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl Related<super::period_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PeriodTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
