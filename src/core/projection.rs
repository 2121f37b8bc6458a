//! Plan projection - the hydrated read model of a plan and its periods.
//!
//! Periods are ordered by `(start_month, id)`. Template id lists always reflect
//! the reference rows present at read time; a reference whose template row is
//! gone keeps its id but gets no name summary.

use crate::{
    core::{
        month::Month,
        plan::{PlanSummary, get_plan_model},
    },
    entities::{Category, Period, PeriodTemplate, Template, period, period_template, plan, template},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Id and name of a referenced template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    /// Template id
    pub id: i64,
    /// Template name
    pub name: String,
}

/// One period with its template references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodProjection {
    /// Period id
    pub id: i64,
    /// First month of the span
    pub start_month: Month,
    /// Last month of the span
    pub end_month: Month,
    /// Referenced income template ids, ascending
    pub income_template_ids: Vec<i64>,
    /// Referenced expense template ids, ascending
    pub expense_template_ids: Vec<i64>,
    /// Referenced saving template ids, ascending
    pub saving_template_ids: Vec<i64>,
    /// Summaries of the income templates that still exist
    pub income_templates: Vec<TemplateSummary>,
    /// Summaries of the expense templates that still exist
    pub expense_templates: Vec<TemplateSummary>,
    /// Summaries of the saving templates that still exist
    pub saving_templates: Vec<TemplateSummary>,
}

impl PeriodProjection {
    /// Id list of one category.
    #[must_use]
    pub fn template_ids(&self, category: Category) -> &[i64] {
        match category {
            Category::Income => &self.income_template_ids,
            Category::Expense => &self.expense_template_ids,
            Category::Saving => &self.saving_template_ids,
        }
    }

    /// Summary list of one category.
    #[must_use]
    pub fn templates(&self, category: Category) -> &[TemplateSummary] {
        match category {
            Category::Income => &self.income_templates,
            Category::Expense => &self.expense_templates,
            Category::Saving => &self.saving_templates,
        }
    }
}

/// A plan with its settings and ordered periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanProjection {
    /// Plan fields and settings
    #[serde(flatten)]
    pub plan: PlanSummary,
    /// Periods ordered by start month, then id
    pub periods: Vec<PeriodProjection>,
}

/// Assembles a projection from already loaded rows.
///
/// `links` may contain rows of other periods; they are ignored. A link counts
/// as resolved only when `templates` holds a row with the same id and
/// category.
#[must_use]
pub fn build_projection(
    plan: &plan::Model,
    mut periods: Vec<period::Model>,
    links: &[period_template::Model],
    templates: &[template::Model],
) -> PlanProjection {
    periods.sort_by(|a, b| (a.start_month, a.id).cmp(&(b.start_month, b.id)));

    let names: HashMap<(i64, Category), &str> = templates
        .iter()
        .map(|t| ((t.id, t.category), t.name.as_str()))
        .collect();

    let mut refs: HashMap<(i64, Category), BTreeSet<i64>> = HashMap::new();
    for link in links {
        refs.entry((link.period_id, link.category))
            .or_default()
            .insert(link.template_id);
    }

    let periods = periods
        .into_iter()
        .map(|period| {
            let ids = |category: Category| -> Vec<i64> {
                refs.get(&(period.id, category))
                    .map(|ids| ids.iter().copied().collect())
                    .unwrap_or_default()
            };
            let summaries = |ids: &[i64], category: Category| -> Vec<TemplateSummary> {
                ids.iter()
                    .filter_map(|id| {
                        names.get(&(*id, category)).map(|name| TemplateSummary {
                            id: *id,
                            name: (*name).to_string(),
                        })
                    })
                    .collect()
            };

            let income_template_ids = ids(Category::Income);
            let expense_template_ids = ids(Category::Expense);
            let saving_template_ids = ids(Category::Saving);
            PeriodProjection {
                id: period.id,
                start_month: Month::containing(period.start_month),
                end_month: Month::containing(period.end_month),
                income_templates: summaries(&income_template_ids, Category::Income),
                expense_templates: summaries(&expense_template_ids, Category::Expense),
                saving_templates: summaries(&saving_template_ids, Category::Saving),
                income_template_ids,
                expense_template_ids,
                saving_template_ids,
            }
        })
        .collect();

    PlanProjection {
        plan: PlanSummary::from(plan),
        periods,
    }
}

/// Loads a plan and everything its projection needs through `db`.
///
/// Pass the open transaction to read uncommitted state.
pub async fn load_plan_projection<C>(db: &C, plan_id: i64) -> Result<PlanProjection>
where
    C: ConnectionTrait,
{
    let plan = get_plan_model(db, plan_id).await?;

    let periods = Period::find()
        .filter(period::Column::PlanId.eq(plan_id))
        .order_by_asc(period::Column::StartMonth)
        .order_by_asc(period::Column::Id)
        .all(db)
        .await?;

    let period_ids: Vec<i64> = periods.iter().map(|p| p.id).collect();
    let links = if period_ids.is_empty() {
        Vec::new()
    } else {
        PeriodTemplate::find()
            .filter(period_template::Column::PeriodId.is_in(period_ids))
            .all(db)
            .await?
    };

    let template_ids: BTreeSet<i64> = links.iter().map(|l| l.template_id).collect();
    let templates = if template_ids.is_empty() {
        Vec::new()
    } else {
        Template::find()
            .filter(template::Column::Id.is_in(template_ids))
            .all(db)
            .await?
    };

    debug!(
        "Loaded plan {} with {} period(s) and {} reference(s)",
        plan_id,
        periods.len(),
        links.len()
    );
    Ok(build_projection(&plan, periods, &links, &templates))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn plan_model() -> plan::Model {
        plan::Model {
            id: 1,
            name: "Family".to_string(),
            description: None,
            starting_balance: Decimal::new(1_250_075, 2),
            starting_saving_balance: Decimal::ZERO,
            financing_start_month: NaiveDate::from_ymd_opt(2025, 4, 1),
            car_purchase_price: Decimal::new(3_500_000, 2),
            car_down_payment: Decimal::new(500_000, 2),
            car_final_payment: Decimal::ZERO,
            car_monthly_rate: Decimal::new(41_999, 2),
            car_term_months: 48,
            car_insurance_monthly: Decimal::ZERO,
            car_fuel_monthly: Decimal::ZERO,
            car_maintenance_monthly: Decimal::ZERO,
            car_tax_monthly: Decimal::ZERO,
            car_interest_rate: Decimal::new(399, 2),
            savings_return_rate: Decimal::from(7),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    fn period_model(id: i64, start: (i32, u32), end: (i32, u32)) -> period::Model {
        period::Model {
            id,
            plan_id: 1,
            start_month: NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap(),
            end_month: NaiveDate::from_ymd_opt(end.0, end.1, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    fn link(period_id: i64, template_id: i64, category: Category) -> period_template::Model {
        period_template::Model {
            period_id,
            template_id,
            category,
        }
    }

    fn template_model(id: i64, category: Category, name: &str) -> template::Model {
        template::Model {
            id,
            category,
            name: name.to_string(),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_periods_ordered_by_start_then_id() {
        let periods = vec![
            period_model(5, (2024, 1), (2024, 3)),
            period_model(9, (2023, 5), (2023, 8)),
            period_model(2, (2024, 1), (2024, 1)),
        ];
        let projection = build_projection(&plan_model(), periods, &[], &[]);
        let order: Vec<i64> = projection.periods.iter().map(|p| p.id).collect();
        assert_eq!(order, vec![9, 2, 5]);
    }

    #[test]
    fn test_ids_sorted_and_links_of_other_periods_ignored() {
        let links = vec![
            link(1, 30, Category::Expense),
            link(1, 10, Category::Expense),
            link(1, 20, Category::Income),
            link(7, 99, Category::Income),
        ];
        let templates = vec![
            template_model(10, Category::Expense, "Rent"),
            template_model(20, Category::Income, "Salary"),
            template_model(30, Category::Expense, "Car"),
        ];
        let projection = build_projection(
            &plan_model(),
            vec![period_model(1, (2024, 1), (2024, 12))],
            &links,
            &templates,
        );

        let period = &projection.periods[0];
        assert_eq!(period.template_ids(Category::Expense), &[10, 30]);
        assert_eq!(period.template_ids(Category::Income), &[20]);
        assert!(period.template_ids(Category::Saving).is_empty());
        let names: Vec<&str> = period
            .templates(Category::Expense)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Rent", "Car"]);
    }

    #[test]
    fn test_dangling_reference_keeps_id_but_drops_summary() {
        let links = vec![link(1, 4, Category::Saving), link(1, 8, Category::Saving)];
        let templates = vec![template_model(8, Category::Saving, "ETF")];
        let projection = build_projection(
            &plan_model(),
            vec![period_model(1, (2024, 1), (2024, 12))],
            &links,
            &templates,
        );

        let period = &projection.periods[0];
        assert_eq!(period.saving_template_ids, vec![4, 8]);
        assert_eq!(
            period.saving_templates,
            vec![TemplateSummary {
                id: 8,
                name: "ETF".to_string()
            }]
        );
    }

    #[test]
    fn test_wire_form() {
        let links = vec![link(3, 2, Category::Income)];
        let templates = vec![template_model(2, Category::Income, "Job")];
        let projection = build_projection(
            &plan_model(),
            vec![period_model(3, (2023, 5), (2023, 8))],
            &links,
            &templates,
        );
        let json = serde_json::to_value(&projection).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Family");
        assert_eq!(json["starting_balance"], 12500.75);
        assert_eq!(json["car_monthly_rate"], 419.99);
        assert_eq!(json["car_interest_rate"], 3.99);
        assert_eq!(json["financing_start_month"], "2025-04");
        assert_eq!(json["periods"][0]["start_month"], "2023-05");
        assert_eq!(json["periods"][0]["end_month"], "2023-08");
        assert_eq!(json["periods"][0]["income_template_ids"], serde_json::json!([2]));
        assert_eq!(
            json["periods"][0]["income_templates"],
            serde_json::json!([{"id": 2, "name": "Job"}])
        );
        assert_eq!(json["periods"][0]["saving_templates"], serde_json::json!([]));
    }
}
