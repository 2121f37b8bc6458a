//! Line item business logic - incomes, expenses, and savings.
//!
//! Items are plain records: create, get, list, delete. Deleting an item removes
//! its template memberships but never the templates themselves.

use crate::{
    core::{clean_description, clean_name, money},
    entities::{Category, LineItem, TemplateItem, line_item, template_item},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{info, instrument};

const DEFAULT_EXPENSE_CATEGORY: &str = "other";

/// Input for a new line item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLineItem {
    /// Item name
    pub name: String,
    /// Monthly amount, must be positive
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Free-form notes
    #[serde(default)]
    pub description: Option<String>,
    /// Expense grouping label
    #[serde(default, rename = "category")]
    pub expense_category: Option<String>,
    /// Paid once a year; expenses only
    #[serde(default)]
    pub is_annual_payment: bool,
    /// Month of the annual payment
    #[serde(default)]
    pub annual_month: Option<i32>,
}

impl NewLineItem {
    /// Minimal item with a name and amount.
    #[must_use]
    pub fn new(name: &str, amount: Decimal) -> Self {
        Self {
            name: name.to_string(),
            amount,
            ..Self::default()
        }
    }
}

/// Creates a line item of `kind` after validating the input.
///
/// Expense-only fields are dropped for incomes and savings. For expenses the
/// grouping label defaults to `"other"`, and an annual payment needs a month
/// in 1-12.
#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_item<C>(db: &C, kind: Category, new: NewLineItem) -> Result<line_item::Model>
where
    C: ConnectionTrait,
{
    let name = clean_name(kind.title(), &new.name)?;
    let amount = money(new.amount)?;
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount: new.amount });
    }

    let (expense_category, is_annual_payment, annual_month) = if kind == Category::Expense {
        let label = new
            .expense_category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPENSE_CATEGORY.to_string());
        let annual_month = if new.is_annual_payment {
            match new.annual_month {
                Some(month @ 1..=12) => Some(month),
                Some(month) => {
                    return Err(Error::Validation {
                        message: format!("Annual month must be between 1 and 12, got {month}"),
                    });
                }
                None => {
                    return Err(Error::Validation {
                        message: "Annual month is required for yearly payments.".to_string(),
                    });
                }
            }
        } else {
            None
        };
        (Some(label), new.is_annual_payment, annual_month)
    } else {
        (None, false, None)
    };

    let item = line_item::ActiveModel {
        kind: Set(kind),
        name: Set(name),
        amount: Set(amount),
        description: Set(clean_description(new.description)),
        expense_category: Set(expense_category),
        is_annual_payment: Set(is_annual_payment),
        annual_month: Set(annual_month),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = item.insert(db).await?;
    info!("Created {} item {} ({})", kind, result.id, result.name);
    Ok(result)
}

/// Fetches one item of `kind`.
pub async fn get_item(db: &DatabaseConnection, kind: Category, id: i64) -> Result<line_item::Model> {
    LineItem::find_by_id(id)
        .filter(line_item::Column::Kind.eq(kind))
        .one(db)
        .await?
        .ok_or_else(|| Error::ItemNotFound {
            category: kind,
            missing_ids: vec![id],
        })
}

/// Lists all items of `kind`, newest first.
pub async fn list_items(db: &DatabaseConnection, kind: Category) -> Result<Vec<line_item::Model>> {
    LineItem::find()
        .filter(line_item::Column::Kind.eq(kind))
        .order_by_desc(line_item::Column::CreatedAt)
        .order_by_desc(line_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes an item together with its template memberships.
#[instrument(skip(db))]
pub async fn delete_item(db: &DatabaseConnection, kind: Category, id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let item = LineItem::find_by_id(id)
        .filter(line_item::Column::Kind.eq(kind))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::ItemNotFound {
            category: kind,
            missing_ids: vec![id],
        })?;

    let unlinked = TemplateItem::delete_many()
        .filter(template_item::Column::ItemId.eq(id))
        .exec(&txn)
        .await?;
    item.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted {} item {} and {} template membership(s)",
        kind, id, unlinked.rows_affected
    );
    Ok(())
}

/// Returns the ids in `ids` that are not items of `kind`, ascending.
pub async fn missing_items<C>(db: &C, kind: Category, ids: &BTreeSet<i64>) -> Result<BTreeSet<i64>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let found: Vec<i64> = LineItem::find()
        .select_only()
        .column(line_item::Column::Id)
        .filter(line_item::Column::Kind.eq(kind))
        .filter(line_item::Column::Id.is_in(ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;
    let found: BTreeSet<i64> = found.into_iter().collect();

    Ok(ids.difference(&found).copied().collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_item_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_item(&db, Category::Income, NewLineItem::new("  ", Decimal::ONE)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result =
            create_item(&db, Category::Income, NewLineItem::new("Salary", Decimal::ZERO)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = create_item(
            &db,
            Category::Saving,
            NewLineItem::new("ETF", Decimal::new(-500, 2)),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = create_item(
            &db,
            Category::Expense,
            NewLineItem::new("Yacht", Decimal::from(10_000_000_000_i64)),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_annual_expense_requires_month() -> Result<()> {
        let db = setup_test_db().await?;

        let mut new = NewLineItem::new("Car insurance", Decimal::new(60_000, 2));
        new.is_annual_payment = true;
        let result = create_item(&db, Category::Expense, new.clone()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        new.annual_month = Some(13);
        let result = create_item(&db, Category::Expense, new.clone()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        new.annual_month = Some(3);
        let item = create_item(&db, Category::Expense, new).await?;
        assert!(item.is_annual_payment);
        assert_eq!(item.annual_month, Some(3));
        assert_eq!(item.expense_category.as_deref(), Some("other"));

        Ok(())
    }

    #[tokio::test]
    async fn test_non_expense_items_drop_expense_fields() -> Result<()> {
        let db = setup_test_db().await?;

        let mut new = NewLineItem::new("Salary", Decimal::new(320_000, 2));
        new.expense_category = Some("housing".to_string());
        new.is_annual_payment = true;
        new.annual_month = Some(4);
        let item = create_item(&db, Category::Income, new).await?;

        assert_eq!(item.kind, Category::Income);
        assert_eq!(item.expense_category, None);
        assert!(!item.is_annual_payment);
        assert_eq!(item.annual_month, None);
        assert_eq!(item.amount, Decimal::new(320_000, 2));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_item_is_scoped_to_kind() -> Result<()> {
        let db = setup_test_db().await?;
        let income = create_test_item(&db, Category::Income, "Salary").await?;

        assert_eq!(get_item(&db, Category::Income, income.id).await?.name, "Salary");
        let result = get_item(&db, Category::Expense, income.id).await;
        assert!(matches!(
            result,
            Err(Error::ItemNotFound { category: Category::Expense, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_items_filters_by_kind() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_item(&db, Category::Income, "Salary").await?;
        create_test_item(&db, Category::Income, "Bonus").await?;
        create_test_item(&db, Category::Expense, "Rent").await?;

        let incomes = list_items(&db, Category::Income).await?;
        assert_eq!(incomes.len(), 2);
        assert!(incomes.iter().all(|i| i.kind == Category::Income));
        assert_eq!(incomes[0].name, "Bonus");

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_item_keeps_template() -> Result<()> {
        let db = setup_test_db().await?;
        let salary = create_test_item(&db, Category::Income, "Salary").await?;
        let bonus = create_test_item(&db, Category::Income, "Bonus").await?;
        let template =
            create_test_template(&db, Category::Income, "Job", &[salary.id, bonus.id]).await?;

        delete_item(&db, Category::Income, salary.id).await?;

        let detail =
            crate::core::template::get_template(&db, Category::Income, template.template.id)
                .await?;
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].id, bonus.id);
        assert!(matches!(
            get_item(&db, Category::Income, salary.id).await,
            Err(Error::ItemNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_item() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_item(&db, Category::Saving, 42).await;
        assert!(matches!(result, Err(Error::ItemNotFound { missing_ids, .. }) if missing_ids == vec![42]));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_items() -> Result<()> {
        let db = setup_test_db().await?;
        let rent = create_test_item(&db, Category::Expense, "Rent").await?;
        let salary = create_test_item(&db, Category::Income, "Salary").await?;

        let ids = BTreeSet::from([rent.id, salary.id, 999]);
        let missing = missing_items(&db, Category::Expense, &ids).await?;
        assert_eq!(missing, BTreeSet::from([salary.id, 999]));

        Ok(())
    }
}
