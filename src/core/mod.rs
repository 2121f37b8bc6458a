//! Core business logic - framework-agnostic plan, period, and template operations.
//!
//! Replace-all requests flow `validator` -> `resolver` -> `period` -> `projection`.

/// Line items (incomes, expenses, savings)
pub mod item;
/// `YYYY-MM` month tokens
pub mod month;
/// Replace-all store for a plan's periods
pub mod period;
/// Plan records and settings
pub mod plan;
/// Read model of a plan with its periods
pub mod projection;
/// Existence checks for referenced templates
pub mod resolver;
/// Template registry
pub mod template;
/// Pure period descriptor validation
pub mod validator;

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Longest accepted name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Exclusive magnitude bound for monetary values (`Decimal(12, 2)`).
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Trims `name` and checks it is non-empty and at most [`MAX_NAME_LEN`] characters.
pub(crate) fn clean_name(subject: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{subject} name cannot be empty"),
        });
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation {
            message: format!("{subject} name cannot exceed {MAX_NAME_LEN} characters"),
        });
    }
    Ok(trimmed.to_string())
}

/// Rounds to two decimal places, halves away from zero.
pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to cents and checks the value fits the money columns.
pub(crate) fn money(amount: Decimal) -> Result<Decimal> {
    let rounded = round_cents(amount);
    if rounded.abs() >= MONEY_LIMIT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(rounded)
}

/// Empty descriptions are stored as `None`.
pub(crate) fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
