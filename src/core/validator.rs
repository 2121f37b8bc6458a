//! Period validation - pure checks on raw period descriptors.
//!
//! Validation never touches the database. A descriptor that passes has a
//! parsed month range with `start <= end` and no repeated template id within
//! any one category.

use crate::{
    core::month::Month,
    entities::Category,
    errors::{Error, Result},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A period as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    /// First month, `YYYY-MM`
    #[serde(default, deserialize_with = "month_token")]
    pub start_month: Option<String>,
    /// Last month, `YYYY-MM`
    #[serde(default, deserialize_with = "month_token")]
    pub end_month: Option<String>,
    /// Income templates applied during the period
    #[serde(default)]
    pub income_template_ids: Vec<i64>,
    /// Expense templates applied during the period
    #[serde(default)]
    pub expense_template_ids: Vec<i64>,
    /// Saving templates applied during the period
    #[serde(default)]
    pub saving_template_ids: Vec<i64>,
}

/// Accepts any JSON value for a month field; a non-string is kept in its
/// rendered form and later rejected as a malformed month.
fn month_token<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(raw) => Some(raw),
        other => Some(other.to_string()),
    })
}

impl PeriodDescriptor {
    /// Descriptor spanning `start..=end` with no template references.
    #[must_use]
    pub fn new(start_month: &str, end_month: &str) -> Self {
        Self {
            start_month: Some(start_month.to_string()),
            end_month: Some(end_month.to_string()),
            ..Self::default()
        }
    }

    /// Replaces the id list of one category.
    #[must_use]
    pub fn with_templates(mut self, category: Category, ids: impl IntoIterator<Item = i64>) -> Self {
        let ids = ids.into_iter().collect();
        match category {
            Category::Income => self.income_template_ids = ids,
            Category::Expense => self.expense_template_ids = ids,
            Category::Saving => self.saving_template_ids = ids,
        }
        self
    }

    /// Raw id list of one category.
    #[must_use]
    pub fn template_ids(&self, category: Category) -> &[i64] {
        match category {
            Category::Income => &self.income_template_ids,
            Category::Expense => &self.expense_template_ids,
            Category::Saving => &self.saving_template_ids,
        }
    }
}

/// Template references of one period, per category, free of duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRefs {
    income: Vec<i64>,
    expense: Vec<i64>,
    saving: Vec<i64>,
}

impl TemplateRefs {
    /// Ids referenced under `category`, in submission order.
    #[must_use]
    pub fn get(&self, category: Category) -> &[i64] {
        match category {
            Category::Income => &self.income,
            Category::Expense => &self.expense,
            Category::Saving => &self.saving,
        }
    }

    /// Every (category, ids) pair in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[i64])> {
        Category::ALL.into_iter().map(|category| (category, self.get(category)))
    }
}

/// A descriptor that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPeriod {
    /// First month of the span
    pub start_month: Month,
    /// Last month of the span
    pub end_month: Month,
    /// Template references per category
    pub references: TemplateRefs,
}

/// Validates one descriptor.
///
/// Checks run in order: month format, range, then duplicates for income,
/// expense and saving ids.
pub fn validate_period(descriptor: &PeriodDescriptor) -> Result<ValidatedPeriod> {
    let start_month = parse_month_field(descriptor.start_month.as_deref())?;
    let end_month = parse_month_field(descriptor.end_month.as_deref())?;

    if start_month > end_month {
        return Err(Error::InvalidRange {
            start: start_month,
            end: end_month,
        });
    }

    for category in Category::ALL {
        let duplicates = find_duplicates(descriptor.template_ids(category));
        if !duplicates.is_empty() {
            return Err(Error::DuplicateReference {
                category,
                duplicate_ids: duplicates.into_iter().collect(),
            });
        }
    }

    Ok(ValidatedPeriod {
        start_month,
        end_month,
        references: TemplateRefs {
            income: descriptor.income_template_ids.clone(),
            expense: descriptor.expense_template_ids.clone(),
            saving: descriptor.saving_template_ids.clone(),
        },
    })
}

/// Validates every descriptor in order and stops at the first failure.
pub fn validate_batch(descriptors: &[PeriodDescriptor]) -> Result<Vec<ValidatedPeriod>> {
    descriptors.iter().map(validate_period).collect()
}

fn parse_month_field(value: Option<&str>) -> Result<Month> {
    // A missing or null month is reported like any other malformed token.
    value.map_or_else(
        || {
            Err(Error::MalformedMonth {
                value: String::new(),
            })
        },
        Month::parse,
    )
}

/// Every id that occurs more than once, ascending.
fn find_duplicates(ids: &[i64]) -> BTreeSet<i64> {
    let mut seen = BTreeSet::new();
    ids.iter()
        .copied()
        .filter(|id| !seen.insert(*id))
        .collect()
}
