//! Result model for stock mutations.
//!
//! `add`/`reduce` report "did not apply" as a value, not an error: a caller
//! branches on [`StockOutcome`] to tell a normal business refusal
//! ([`StockOutcome::Rejected`]) from an infrastructure failure
//! ([`StockOutcome::Failed`]).

use serde::Serialize;
use thiserror::Error;

use crate::stock::StockLevel;

/// Why a stock mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StockRejection {
    /// Not enough units on hand for a reduction.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// No stock row matches the requested attribute set.
    #[error("no stock found for this variant")]
    InvalidVariant,

    /// An attribute name or value is not part of the reference taxonomy.
    #[error("unknown attribute {name}={value}")]
    InvalidAttribute { name: String, value: String },
}

/// Outcome of `add`/`reduce`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockOutcome {
    /// Committed; carries the variant's new level.
    Applied(StockLevel),
    /// Rolled back because a business rule refused the change.
    Rejected(StockRejection),
    /// Rolled back because the store failed.
    Failed(String),
}

impl StockOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StockOutcome::Applied(_))
    }

    /// New level when applied.
    pub fn level(&self) -> Option<StockLevel> {
        match self {
            StockOutcome::Applied(level) => Some(*level),
            _ => None,
        }
    }

    /// Short machine-readable label (`applied`, `rejected`, `failed`).
    pub fn kind(&self) -> &'static str {
        match self {
            StockOutcome::Applied(_) => "applied",
            StockOutcome::Rejected(_) => "rejected",
            StockOutcome::Failed(_) => "failed",
        }
    }
}

impl From<StockRejection> for StockOutcome {
    fn from(value: StockRejection) -> Self {
        StockOutcome::Rejected(value)
    }
}
