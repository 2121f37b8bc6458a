//! Plan entity - a long-term household plan with car-financing and savings settings.
//!
//! A plan exclusively owns its periods; the periods are deleted with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name of the plan
    pub name: String,
    /// Free-form notes
    pub description: Option<String>,
    /// Checking balance at the start of the plan
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub starting_balance: Decimal,
    /// Savings balance at the start of the plan
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub starting_saving_balance: Decimal,
    /// First day of the month the car financing starts, if any
    pub financing_start_month: Option<Date>,
    /// Purchase price of the car
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_purchase_price: Decimal,
    /// Down payment due at purchase
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_down_payment: Decimal,
    /// Balloon payment due at the end of the term
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_final_payment: Decimal,
    /// Monthly financing installment
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_monthly_rate: Decimal,
    /// Financing term in months
    pub car_term_months: i32,
    /// Monthly insurance cost
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_insurance_monthly: Decimal,
    /// Monthly fuel cost
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_fuel_monthly: Decimal,
    /// Monthly maintenance reserve
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_maintenance_monthly: Decimal,
    /// Monthly vehicle tax
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub car_tax_monthly: Decimal,
    /// Annual financing interest rate in percent
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub car_interest_rate: Decimal,
    /// Expected annual return on savings in percent
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub savings_return_rate: Decimal,
    /// When the plan was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Plan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan has many periods
    #[sea_orm(has_many = "super::period::Entity")]
    Periods,
}

impl Related<super::period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Periods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
