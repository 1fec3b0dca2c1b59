//! Persistence boundary.
//!
//! Services depend on the traits in [`r#trait`] only; `main` picks the
//! implementation (Postgres or in-memory) and injects it.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryStore, Taxonomy};
pub use postgres::{PostgresCatalogStore, PostgresInventoryStore, SCHEMA};
pub use r#trait::{CatalogStore, InventoryStore, StockTransaction, VariantRow};
