//! Reference resolution - confirms every template a batch of periods points at exists.
//!
//! The ids of the whole batch are unioned per category first, so each category
//! costs one lookup no matter how many periods reference it.

use crate::{
    core::{template::missing_templates, validator::ValidatedPeriod},
    entities::Category,
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Union of template ids referenced by a batch, per category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    by_category: BTreeMap<Category, BTreeSet<i64>>,
}

impl ReferenceSet {
    /// Collects the ids of every period in the batch.
    #[must_use]
    pub fn collect(periods: &[ValidatedPeriod]) -> Self {
        let mut by_category: BTreeMap<Category, BTreeSet<i64>> = BTreeMap::new();
        for period in periods {
            for (category, ids) in period.references.iter() {
                by_category
                    .entry(category)
                    .or_default()
                    .extend(ids.iter().copied());
            }
        }
        by_category.retain(|_, ids| !ids.is_empty());
        Self { by_category }
    }

    /// Referenced ids of one category.
    #[must_use]
    pub fn ids(&self, category: Category) -> Option<&BTreeSet<i64>> {
        self.by_category.get(&category)
    }

    /// True when the batch references no templates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}

/// Fails with [`Error::UnknownTemplate`] for the first category (income,
/// expense, saving) that references an id missing from the registry.
pub async fn resolve_references<C>(db: &C, references: &ReferenceSet) -> Result<()>
where
    C: ConnectionTrait,
{
    for category in Category::ALL {
        let Some(ids) = references.ids(category) else {
            continue;
        };

        let missing = missing_templates(db, category, ids).await?;
        if !missing.is_empty() {
            return Err(Error::UnknownTemplate {
                category,
                missing_ids: missing.into_iter().collect(),
            });
        }
        debug!("All {} referenced {} template(s) exist", ids.len(), category);
    }
    Ok(())
}
