//! Unified error type for the plan engine and its collaborators.
//!
//! Input errors carry the offending identifiers in sorted order so the rendered
//! message is deterministic.

use crate::{core::month::Month, entities::Category};
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Unexpected failure of the backing store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// I/O failure outside the database
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A month token did not match `YYYY-MM` or named an impossible month
    #[error("Invalid month format '{value}'. Expected YYYY-MM.")]
    MalformedMonth {
        /// The raw token as received
        value: String,
    },

    /// A period ends before it starts
    #[error("End month must be the same or after start month ({start} > {end}).")]
    InvalidRange {
        /// Parsed start month
        start: Month,
        /// Parsed end month
        end: Month,
    },

    /// The same template id was listed more than once in one period category
    #[error("Duplicate {category} template IDs found: {duplicate_ids:?}")]
    DuplicateReference {
        /// Category whose id list contained duplicates
        category: Category,
        /// Every duplicated id, ascending
        duplicate_ids: Vec<i64>,
    },

    /// Period references point to templates that do not exist in the category
    #[error("{} templates not found: {missing_ids:?}", category.title())]
    UnknownTemplate {
        /// Category that was searched
        category: Category,
        /// Every missing id, ascending
        missing_ids: Vec<i64>,
    },

    /// No plan with this id
    #[error("Plan not found: {id}")]
    PlanNotFound {
        /// Requested plan id
        id: i64,
    },

    /// A replace-all request carried no periods
    #[error("At least one period is required.")]
    EmptyBatch,

    /// No template with this id in the category
    #[error("{} template not found: {id}", category.title())]
    TemplateNotFound {
        /// Category that was searched
        category: Category,
        /// Requested template id
        id: i64,
    },

    /// Line items referenced by id do not exist with the expected kind
    #[error("{} items not found: {missing_ids:?}", category.title())]
    ItemNotFound {
        /// Kind of line item that was searched
        category: Category,
        /// Every missing id, ascending
        missing_ids: Vec<i64>,
    },

    /// Amount outside the accepted range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Field-level validation failure
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Request body could not be decoded
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Decoder message
        message: String,
    },
}

impl Error {
    /// Short machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::MalformedMonth { .. } => "malformed_month",
            Self::InvalidRange { .. } => "invalid_range",
            Self::DuplicateReference { .. } => "duplicate_reference",
            Self::UnknownTemplate { .. } => "unknown_template",
            Self::PlanNotFound { .. } => "plan_not_found",
            Self::EmptyBatch => "empty_batch",
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::ItemNotFound { .. } => "item_not_found",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::Validation { .. } => "validation",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// True for errors caused by the caller's input rather than the system.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Config { .. } | Self::Io(_) | Self::Json(_)
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_template_message_lists_sorted_ids() {
        let err = Error::UnknownTemplate {
            category: Category::Expense,
            missing_ids: vec![3, 7],
        };
        assert_eq!(err.to_string(), "Expense templates not found: [3, 7]");
        assert_eq!(err.code(), "unknown_template");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_database_error_is_not_input_error() {
        let err = Error::from(sea_orm::DbErr::Custom("boom".to_string()));
        assert!(!err.is_input_error());
        assert_eq!(err.code(), "database");
    }
}
