//! Infrastructure error model.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate key (e.g. product registered twice) |
//! | Database (foreign key violation) | `23503` | `Constraint` | Referenced row vanished (e.g. product deleted mid-transaction) |
//! | Database (check constraint violation) | `23514` | `Constraint` | `quantity >= 0` rejected a write |
//! | Database (other) | Any other | `Database` | Other database errors |
//! | PoolClosed / PoolTimedOut | N/A | `Unavailable` | Pool closed or exhausted |
//! | RowNotFound | N/A | `Database` | Unexpected row not found (should not occur) |
//! | Other | N/A | `Database` | Network errors, connection failures, etc. |

use thiserror::Error;

use stockroom_core::{DomainError, ProductId, StoreId};

/// Failure of a store operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A foreign key or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// No connection could be obtained.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row did not decode into a domain value.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        StoreError::CorruptRow(value.to_string())
    }
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Database(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Failure of a guarded catalog or stock request.
///
/// Stock mutations do not use this type for business refusals; those come
/// back as `StockOutcome`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("store {0} not found")]
    StoreNotFound(StoreId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::StoreNotFound(_) | ServiceError::ProductNotFound(_)
        )
    }
}
