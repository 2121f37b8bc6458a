//! Template registry - named bundles of line items of one category.
//!
//! Templates are shared: periods reference them without owning them. Deleting a
//! template removes its membership rows and every period reference to it, but
//! leaves the member items and the periods in place.

use crate::{
    core::{clean_description, clean_name, item::missing_items},
    entities::{
        Category, LineItem, PeriodTemplate, Template, TemplateItem, line_item, period_template,
        template, template_item,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};

/// Input for a new template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTemplate {
    /// Template name
    pub name: String,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Member line items; at least one, all of the template's category
    #[serde(alias = "income_ids", alias = "expense_ids", alias = "saving_ids")]
    pub item_ids: Vec<i64>,
}

/// A template with its member items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDetail {
    /// The template row
    #[serde(flatten)]
    pub template: template::Model,
    /// Member items, ascending by id
    pub items: Vec<line_item::Model>,
}

/// Creates a template bundling `item_ids`.
///
/// Repeated ids are collapsed. Every id must name an existing item of the same
/// category, otherwise nothing is written.
#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_template(
    db: &DatabaseConnection,
    category: Category,
    new: NewTemplate,
) -> Result<TemplateDetail> {
    let txn = db.begin().await?;
    let detail = insert_template(&txn, category, new).await?;
    txn.commit().await?;

    info!(
        "Created {} template {} with {} item(s)",
        category,
        detail.template.id,
        detail.items.len()
    );
    Ok(detail)
}

/// Inserts a template and its membership rows through `db` without
/// committing; the caller owns the transaction.
pub async fn insert_template<C>(
    db: &C,
    category: Category,
    new: NewTemplate,
) -> Result<TemplateDetail>
where
    C: ConnectionTrait,
{
    let name = clean_name("Template", &new.name)?;
    let item_ids: BTreeSet<i64> = new.item_ids.into_iter().collect();
    if item_ids.is_empty() {
        return Err(Error::Validation {
            message: "A template needs at least one item".to_string(),
        });
    }

    let missing = missing_items(db, category, &item_ids).await?;
    if !missing.is_empty() {
        return Err(Error::ItemNotFound {
            category,
            missing_ids: missing.into_iter().collect(),
        });
    }

    let created = template::ActiveModel {
        category: Set(category),
        name: Set(name),
        description: Set(clean_description(new.description)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for item_id in &item_ids {
        template_item::ActiveModel {
            template_id: Set(created.id),
            item_id: Set(*item_id),
        }
        .insert(db)
        .await?;
    }

    hydrate(db, vec![created]).await?.pop().ok_or_else(|| {
        Error::Database(DbErr::RecordNotFound(
            "template vanished inside its own transaction".to_string(),
        ))
    })
}

/// Fetches one template of `category` with its members.
pub async fn get_template(
    db: &DatabaseConnection,
    category: Category,
    id: i64,
) -> Result<TemplateDetail> {
    let found = Template::find_by_id(id)
        .filter(template::Column::Category.eq(category))
        .one(db)
        .await?
        .ok_or(Error::TemplateNotFound { category, id })?;

    hydrate(db, vec![found])
        .await?
        .pop()
        .ok_or(Error::TemplateNotFound { category, id })
}

/// Lists templates of `category`, newest first, with their members.
pub async fn list_templates(
    db: &DatabaseConnection,
    category: Category,
) -> Result<Vec<TemplateDetail>> {
    let templates = Template::find()
        .filter(template::Column::Category.eq(category))
        .order_by_desc(template::Column::CreatedAt)
        .order_by_desc(template::Column::Id)
        .all(db)
        .await?;

    hydrate(db, templates).await
}

/// Finds a template of `category` by exact name.
pub async fn find_template_by_name<C>(
    db: &C,
    category: Category,
    name: &str,
) -> Result<Option<template::Model>>
where
    C: ConnectionTrait,
{
    Template::find()
        .filter(template::Column::Category.eq(category))
        .filter(template::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Deletes a template, its membership rows, and all period references to it.
#[instrument(skip(db))]
pub async fn delete_template(db: &DatabaseConnection, category: Category, id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let found = Template::find_by_id(id)
        .filter(template::Column::Category.eq(category))
        .one(&txn)
        .await?
        .ok_or(Error::TemplateNotFound { category, id })?;

    let members = TemplateItem::delete_many()
        .filter(template_item::Column::TemplateId.eq(id))
        .exec(&txn)
        .await?;
    let references = PeriodTemplate::delete_many()
        .filter(period_template::Column::TemplateId.eq(id))
        .exec(&txn)
        .await?;
    found.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted {} template {} ({} member link(s), {} period reference(s))",
        category, id, members.rows_affected, references.rows_affected
    );
    Ok(())
}

/// Returns the ids in `ids` that are not templates of `category`, ascending.
///
/// An id that exists under a different category counts as missing.
pub async fn missing_templates<C>(
    db: &C,
    category: Category,
    ids: &BTreeSet<i64>,
) -> Result<BTreeSet<i64>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let found: Vec<i64> = Template::find()
        .select_only()
        .column(template::Column::Id)
        .filter(template::Column::Category.eq(category))
        .filter(template::Column::Id.is_in(ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;
    let found: BTreeSet<i64> = found.into_iter().collect();
    debug!("{} of {} {} template id(s) found", found.len(), ids.len(), category);

    Ok(ids.difference(&found).copied().collect())
}

/// Attaches member items to each template, keeping the input order.
async fn hydrate<C>(db: &C, templates: Vec<template::Model>) -> Result<Vec<TemplateDetail>>
where
    C: ConnectionTrait,
{
    if templates.is_empty() {
        return Ok(Vec::new());
    }

    let template_ids: Vec<i64> = templates.iter().map(|t| t.id).collect();
    let links = TemplateItem::find()
        .filter(template_item::Column::TemplateId.is_in(template_ids))
        .all(db)
        .await?;

    let item_ids: BTreeSet<i64> = links.iter().map(|l| l.item_id).collect();
    let items: HashMap<i64, line_item::Model> = LineItem::find()
        .filter(line_item::Column::Id.is_in(item_ids))
        .order_by_asc(line_item::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut members: HashMap<i64, Vec<line_item::Model>> = HashMap::new();
    for link in links {
        if let Some(found) = items.get(&link.item_id) {
            members
                .entry(link.template_id)
                .or_default()
                .push(found.clone());
        }
    }

    Ok(templates
        .into_iter()
        .map(|template| {
            let mut items = members.remove(&template.id).unwrap_or_default();
            items.sort_by_key(|i| i.id);
            TemplateDetail { template, items }
        })
        .collect())
}
