//! Plan business logic - plan records and their financing/savings settings.
//!
//! A plan owns its periods exclusively: deleting the plan deletes its periods
//! and their template references in the same transaction.

use crate::{
    core::{clean_description, clean_name, money, month::Month, round_cents},
    entities::{Period, PeriodTemplate, Plan, period, period_template, plan},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{
    QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, instrument};

/// Exclusive upper bound for percentage rates (`Decimal(5, 2)`).
const RATE_LIMIT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const DEFAULT_SAVINGS_RETURN_RATE: Decimal = Decimal::from_parts(7, 0, 0, false, 0);

/// Financing and savings configuration of a plan
///
/// Monetary values are exact decimals; they only become JSON numbers when
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    /// Checking balance at the start of the plan
    #[serde(with = "rust_decimal::serde::float")]
    pub starting_balance: Decimal,
    /// Savings balance at the start of the plan
    #[serde(with = "rust_decimal::serde::float")]
    pub starting_saving_balance: Decimal,
    /// Month the car financing starts
    pub financing_start_month: Option<Month>,
    /// Purchase price of the car
    #[serde(with = "rust_decimal::serde::float")]
    pub car_purchase_price: Decimal,
    /// Down payment due at purchase
    #[serde(with = "rust_decimal::serde::float")]
    pub car_down_payment: Decimal,
    /// Balloon payment at the end of the term
    #[serde(with = "rust_decimal::serde::float")]
    pub car_final_payment: Decimal,
    /// Monthly financing installment
    #[serde(with = "rust_decimal::serde::float")]
    pub car_monthly_rate: Decimal,
    /// Financing term in months
    pub car_term_months: i32,
    /// Monthly insurance cost
    #[serde(with = "rust_decimal::serde::float")]
    pub car_insurance_monthly: Decimal,
    /// Monthly fuel cost
    #[serde(with = "rust_decimal::serde::float")]
    pub car_fuel_monthly: Decimal,
    /// Monthly maintenance reserve
    #[serde(with = "rust_decimal::serde::float")]
    pub car_maintenance_monthly: Decimal,
    /// Monthly vehicle tax
    #[serde(with = "rust_decimal::serde::float")]
    pub car_tax_monthly: Decimal,
    /// Annual financing interest in percent
    #[serde(with = "rust_decimal::serde::float")]
    pub car_interest_rate: Decimal,
    /// Expected annual savings return in percent
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_return_rate: Decimal,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::ZERO,
            starting_saving_balance: Decimal::ZERO,
            financing_start_month: None,
            car_purchase_price: Decimal::ZERO,
            car_down_payment: Decimal::ZERO,
            car_final_payment: Decimal::ZERO,
            car_monthly_rate: Decimal::ZERO,
            car_term_months: 0,
            car_insurance_monthly: Decimal::ZERO,
            car_fuel_monthly: Decimal::ZERO,
            car_maintenance_monthly: Decimal::ZERO,
            car_tax_monthly: Decimal::ZERO,
            car_interest_rate: Decimal::ZERO,
            savings_return_rate: DEFAULT_SAVINGS_RETURN_RATE,
        }
    }
}

impl PlanSettings {
    /// Checks ranges and rounds every decimal to two places.
    pub fn validated(self) -> Result<Self> {
        if self.car_term_months < 0 {
            return Err(Error::Validation {
                message: format!(
                    "car_term_months must not be negative, got {}",
                    self.car_term_months
                ),
            });
        }

        Ok(Self {
            starting_balance: money(self.starting_balance)?,
            starting_saving_balance: money(self.starting_saving_balance)?,
            financing_start_month: self.financing_start_month,
            car_purchase_price: money(self.car_purchase_price)?,
            car_down_payment: money(self.car_down_payment)?,
            car_final_payment: money(self.car_final_payment)?,
            car_monthly_rate: money(self.car_monthly_rate)?,
            car_term_months: self.car_term_months,
            car_insurance_monthly: money(self.car_insurance_monthly)?,
            car_fuel_monthly: money(self.car_fuel_monthly)?,
            car_maintenance_monthly: money(self.car_maintenance_monthly)?,
            car_tax_monthly: money(self.car_tax_monthly)?,
            car_interest_rate: rate("car_interest_rate", self.car_interest_rate)?,
            savings_return_rate: rate("savings_return_rate", self.savings_return_rate)?,
        })
    }

    /// Settings as stored on `plan`, normalized to two decimal places.
    #[must_use]
    pub fn from_model(plan: &plan::Model) -> Self {
        let cents = |value: Decimal| {
            let mut value = round_cents(value);
            value.rescale(2);
            value
        };
        Self {
            starting_balance: cents(plan.starting_balance),
            starting_saving_balance: cents(plan.starting_saving_balance),
            financing_start_month: plan.financing_start_month.map(Month::containing),
            car_purchase_price: cents(plan.car_purchase_price),
            car_down_payment: cents(plan.car_down_payment),
            car_final_payment: cents(plan.car_final_payment),
            car_monthly_rate: cents(plan.car_monthly_rate),
            car_term_months: plan.car_term_months,
            car_insurance_monthly: cents(plan.car_insurance_monthly),
            car_fuel_monthly: cents(plan.car_fuel_monthly),
            car_maintenance_monthly: cents(plan.car_maintenance_monthly),
            car_tax_monthly: cents(plan.car_tax_monthly),
            car_interest_rate: cents(plan.car_interest_rate),
            savings_return_rate: cents(plan.savings_return_rate),
        }
    }

    fn write_to(&self, model: &mut plan::ActiveModel) {
        model.starting_balance = Set(self.starting_balance);
        model.starting_saving_balance = Set(self.starting_saving_balance);
        model.financing_start_month = Set(self.financing_start_month.map(Month::first_day));
        model.car_purchase_price = Set(self.car_purchase_price);
        model.car_down_payment = Set(self.car_down_payment);
        model.car_final_payment = Set(self.car_final_payment);
        model.car_monthly_rate = Set(self.car_monthly_rate);
        model.car_term_months = Set(self.car_term_months);
        model.car_insurance_monthly = Set(self.car_insurance_monthly);
        model.car_fuel_monthly = Set(self.car_fuel_monthly);
        model.car_maintenance_monthly = Set(self.car_maintenance_monthly);
        model.car_tax_monthly = Set(self.car_tax_monthly);
        model.car_interest_rate = Set(self.car_interest_rate);
        model.savings_return_rate = Set(self.savings_return_rate);
    }
}

fn rate(field: &str, value: Decimal) -> Result<Decimal> {
    let rounded = round_cents(value);
    if rounded < Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("{field} must not be negative, got {value}"),
        });
    }
    if rounded >= RATE_LIMIT {
        return Err(Error::Validation {
            message: format!("{field} must be below {RATE_LIMIT}, got {value}"),
        });
    }
    Ok(rounded)
}

/// Partial settings change; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlanSettingsUpdate {
    /// New starting balance
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub starting_balance: Option<Decimal>,
    /// New starting savings balance
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub starting_saving_balance: Option<Decimal>,
    /// `Some(None)` clears the financing start month
    #[serde(default, deserialize_with = "present")]
    pub financing_start_month: Option<Option<Month>>,
    /// New purchase price
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_purchase_price: Option<Decimal>,
    /// New down payment
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_down_payment: Option<Decimal>,
    /// New balloon payment
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_final_payment: Option<Decimal>,
    /// New monthly installment
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_monthly_rate: Option<Decimal>,
    /// New term
    #[serde(default)]
    pub car_term_months: Option<i32>,
    /// New insurance cost
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_insurance_monthly: Option<Decimal>,
    /// New fuel cost
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_fuel_monthly: Option<Decimal>,
    /// New maintenance reserve
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_maintenance_monthly: Option<Decimal>,
    /// New vehicle tax
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_tax_monthly: Option<Decimal>,
    /// New interest rate
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub car_interest_rate: Option<Decimal>,
    /// New savings return rate
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub savings_return_rate: Option<Decimal>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PlanSettingsUpdate {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlays the provided fields on `base`.
    #[must_use]
    pub fn merge_into(self, base: PlanSettings) -> PlanSettings {
        PlanSettings {
            starting_balance: self.starting_balance.unwrap_or(base.starting_balance),
            starting_saving_balance: self
                .starting_saving_balance
                .unwrap_or(base.starting_saving_balance),
            financing_start_month: self
                .financing_start_month
                .unwrap_or(base.financing_start_month),
            car_purchase_price: self.car_purchase_price.unwrap_or(base.car_purchase_price),
            car_down_payment: self.car_down_payment.unwrap_or(base.car_down_payment),
            car_final_payment: self.car_final_payment.unwrap_or(base.car_final_payment),
            car_monthly_rate: self.car_monthly_rate.unwrap_or(base.car_monthly_rate),
            car_term_months: self.car_term_months.unwrap_or(base.car_term_months),
            car_insurance_monthly: self
                .car_insurance_monthly
                .unwrap_or(base.car_insurance_monthly),
            car_fuel_monthly: self.car_fuel_monthly.unwrap_or(base.car_fuel_monthly),
            car_maintenance_monthly: self
                .car_maintenance_monthly
                .unwrap_or(base.car_maintenance_monthly),
            car_tax_monthly: self.car_tax_monthly.unwrap_or(base.car_tax_monthly),
            car_interest_rate: self.car_interest_rate.unwrap_or(base.car_interest_rate),
            savings_return_rate: self.savings_return_rate.unwrap_or(base.savings_return_rate),
        }
    }
}

/// Input for a new plan
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlan {
    /// Plan name
    pub name: String,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Initial settings; omitted fields take their defaults
    #[serde(flatten)]
    pub settings: PlanSettings,
}

/// A plan without its periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Plan id
    pub id: i64,
    /// Plan name
    pub name: String,
    /// Free-form notes
    pub description: Option<String>,
    /// Financing and savings settings
    #[serde(flatten)]
    pub settings: PlanSettings,
    /// When the plan was created
    pub created_at: DateTimeUtc,
}

impl From<&plan::Model> for PlanSummary {
    fn from(plan: &plan::Model) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            description: plan.description.clone(),
            settings: PlanSettings::from_model(plan),
            created_at: plan.created_at,
        }
    }
}

/// Creates a plan with no periods.
#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_plan(db: &DatabaseConnection, new: NewPlan) -> Result<plan::Model> {
    let name = clean_name("Plan", &new.name)?;
    let settings = new.settings.validated()?;

    let mut model = plan::ActiveModel {
        name: Set(name),
        description: Set(clean_description(new.description)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    settings.write_to(&mut model);

    let result = model.insert(db).await?;
    info!("Created plan {} ({})", result.id, result.name);
    Ok(result)
}

/// Lists all plans, newest first.
pub async fn list_plans(db: &DatabaseConnection) -> Result<Vec<PlanSummary>> {
    let plans = Plan::find()
        .order_by_desc(plan::Column::CreatedAt)
        .order_by_desc(plan::Column::Id)
        .all(db)
        .await?;
    Ok(plans.iter().map(PlanSummary::from).collect())
}

/// Fetches a plan row.
pub async fn get_plan_model<C>(db: &C, plan_id: i64) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    Plan::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or(Error::PlanNotFound { id: plan_id })
}

/// Takes the write lock on a plan row inside `txn` and returns the row.
///
/// Issues a no-op `UPDATE` keyed on the plan id, so concurrent writers to the
/// same plan queue behind this transaction.
pub async fn lock_plan<C>(txn: &C, plan_id: i64) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    let touched = Plan::update_many()
        .col_expr(plan::Column::Id, Expr::col(plan::Column::Id).into())
        .filter(plan::Column::Id.eq(plan_id))
        .exec(txn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(Error::PlanNotFound { id: plan_id });
    }
    debug!("Locked plan {}", plan_id);
    get_plan_model(txn, plan_id).await
}

/// Overwrites a plan's settings.
pub async fn update_settings<C>(
    db: &C,
    plan: plan::Model,
    settings: &PlanSettings,
) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    let mut model: plan::ActiveModel = plan.into();
    settings.write_to(&mut model);
    model.update(db).await.map_err(Into::into)
}

/// Deletes the template references of the given periods, then the periods.
pub(crate) async fn delete_periods<C>(db: &C, plan_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let period_ids: Vec<i64> = Period::find()
        .select_only()
        .column(period::Column::Id)
        .filter(period::Column::PlanId.eq(plan_id))
        .into_tuple()
        .all(db)
        .await?;
    if period_ids.is_empty() {
        return Ok(0);
    }

    PeriodTemplate::delete_many()
        .filter(period_template::Column::PeriodId.is_in(period_ids))
        .exec(db)
        .await?;
    let removed = Period::delete_many()
        .filter(period::Column::PlanId.eq(plan_id))
        .exec(db)
        .await?;
    Ok(removed.rows_affected)
}

/// Deletes a plan with all its periods and their template references.
#[instrument(skip(db))]
pub async fn delete_plan(db: &DatabaseConnection, plan_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let plan = lock_plan(&txn, plan_id).await?;
    let removed = delete_periods(&txn, plan_id).await?;
    plan.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted plan {} and {} period(s)", plan_id, removed);
    Ok(())
}
