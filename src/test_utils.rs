//! Shared test utilities for `FinanceFlow`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        item::{self, NewLineItem},
        plan::{self, NewPlan},
        template::{self, NewTemplate, TemplateDetail},
    },
    entities::{self, Category},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Routes tracing output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database with all tables initialized.
///
/// Unlike the in-memory setup, the pool can hand out several connections, so
/// transactions really run side by side. Returns the file path for cleanup.
pub async fn setup_file_test_db(label: &str) -> Result<(DatabaseConnection, PathBuf)> {
    init_test_tracing();
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let path = std::env::temp_dir().join(format!(
        "financeflow-{label}-{}-{nanos}.sqlite",
        std::process::id()
    ));
    let db = sea_orm::Database::connect(format!("sqlite://{}?mode=rwc", path.display())).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Closes `db` and deletes its file.
pub async fn teardown_file_test_db(db: DatabaseConnection, path: PathBuf) -> Result<()> {
    db.close().await?;
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
    Ok(())
}

/// Creates a line item of `kind` with sensible defaults.
///
/// # Defaults
/// * `amount`: 100.00
/// * `description`: None
/// * expenses get the `"other"` label and are monthly
pub async fn create_test_item(
    db: &DatabaseConnection,
    kind: Category,
    name: &str,
) -> Result<entities::line_item::Model> {
    item::create_item(db, kind, NewLineItem::new(name, Decimal::from(100))).await
}

/// Creates a template of `category` bundling `item_ids`.
pub async fn create_test_template(
    db: &DatabaseConnection,
    category: Category,
    name: &str,
    item_ids: &[i64],
) -> Result<TemplateDetail> {
    template::create_template(
        db,
        category,
        NewTemplate {
            name: name.to_string(),
            description: None,
            item_ids: item_ids.to_vec(),
        },
    )
    .await
}

/// Creates a plan with default settings and no periods.
pub async fn create_test_plan(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::plan::Model> {
    plan::create_plan(
        db,
        NewPlan {
            name: name.to_string(),
            ..NewPlan::default()
        },
    )
    .await
}
