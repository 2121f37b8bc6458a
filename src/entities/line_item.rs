//! Line item entity - a single income, expense, or saving amount.
//!
//! All three kinds share one table keyed by `kind`. The expense-only columns
//! stay empty for incomes and savings.

use super::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "line_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Whether this is an income, expense, or saving
    pub kind: Category,
    /// Human-readable name (e.g., "Salary", "Rent")
    pub name: String,
    /// Monthly amount
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Free-form notes
    pub description: Option<String>,
    /// Expense grouping label (e.g., "housing"); expenses only
    pub expense_category: Option<String>,
    /// Paid once a year instead of monthly; expenses only
    pub is_annual_payment: bool,
    /// Month (1-12) the annual payment falls in
    pub annual_month: Option<i32>,
    /// When the item was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LineItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item can be a member of many templates
    #[sea_orm(has_many = "super::template_item::Entity")]
    TemplateItems,
}

impl Related<super::template_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
