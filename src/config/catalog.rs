//! Template catalog loading from config.toml
//!
//! The catalog lists templates, with their line items, that should exist in a
//! fresh database. Seeding only adds what is missing and never touches
//! templates that are already present.

use crate::{
    core::{
        clean_name,
        item::{NewLineItem, create_item},
        template::{NewTemplate, find_template_by_name, insert_template},
    },
    entities::Category,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    /// Templates to seed
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Configuration for a single template
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    /// Template name, unique within its category
    pub name: String,
    /// `income`, `expense` or `saving`
    pub category: Category,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Line items created for and bundled by the template
    pub items: Vec<ItemConfig>,
}

/// Configuration for one line item of a template
#[derive(Debug, Deserialize, Clone)]
pub struct ItemConfig {
    /// Item name
    pub name: String,
    /// Monthly amount
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
}

/// Path of the catalog file: `FINANCEFLOW_CONFIG` or `./config.toml`.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var("FINANCEFLOW_CONFIG").map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Loads a catalog from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing or a category is unknown
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_catalog(&contents)
}

/// Parses catalog TOML.
pub fn parse_catalog(contents: &str) -> Result<Catalog> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Creates every catalog template whose (category, name) is not yet present.
///
/// Names are compared after trimming. Each template is written together with
/// its items in one transaction, so a failing entry leaves nothing behind.
///
/// Returns the number of templates created.
pub async fn seed_catalog(db: &DatabaseConnection, catalog: &Catalog) -> Result<usize> {
    let mut created = 0;

    for entry in &catalog.templates {
        let name = clean_name("Template", &entry.name)?;
        let txn = db.begin().await?;

        if let Some(existing) = find_template_by_name(&txn, entry.category, &name).await? {
            warn!(
                "Skipping {} template '{}': already exists with id {}",
                entry.category, name, existing.id
            );
            txn.rollback().await?;
            continue;
        }

        let mut item_ids = Vec::with_capacity(entry.items.len());
        for item in &entry.items {
            let new = NewLineItem {
                description: item.description.clone(),
                ..NewLineItem::new(&item.name, item.amount)
            };
            item_ids.push(create_item(&txn, entry.category, new).await?.id);
        }

        let detail = insert_template(
            &txn,
            entry.category,
            NewTemplate {
                name,
                description: entry.description.clone(),
                item_ids,
            },
        )
        .await?;
        txn.commit().await?;

        info!(
            "Seeded {} template '{}' (id {})",
            entry.category, detail.template.name, detail.template.id
        );
        created += 1;
    }

    Ok(created)
}
