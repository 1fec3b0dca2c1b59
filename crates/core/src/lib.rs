//! `stockroom-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod attributes;
pub mod error;
pub mod id;

pub use attributes::{AttributePair, AttributeSet};
pub use error::{DomainError, DomainResult};
pub use id::{AttributeId, AttributeValueId, ProductId, StockId, StoreId};
