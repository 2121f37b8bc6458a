//! Category active enum - the three kinds of line items and templates.
//!
//! Stored as a short string so the column stays readable in the `SQLite` file.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a line item, template, or period template reference
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Money coming in
    #[sea_orm(string_value = "income")]
    Income,
    /// Money going out
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Money set aside
    #[sea_orm(string_value = "saving")]
    Saving,
}

impl Category {
    /// All categories in their canonical processing order.
    pub const ALL: [Self; 3] = [Self::Income, Self::Expense, Self::Saving];

    /// Lowercase wire name (`"income"`, `"expense"`, `"saving"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Saving => "saving",
        }
    }

    /// Capitalized name for messages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
            Self::Saving => "Saving",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" | "incomes" => Ok(Self::Income),
            "expense" | "expenses" => Ok(Self::Expense),
            "saving" | "savings" => Ok(Self::Saving),
            other => Err(crate::errors::Error::Validation {
                message: format!("Unknown category '{other}'"),
            }),
        }
    }
}
