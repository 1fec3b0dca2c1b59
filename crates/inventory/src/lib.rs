//! Inventory domain module.
//!
//! Business rules for attribute-keyed stock, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The ledger in
//! `stockroom-infra` runs these rules inside a unit of work.

pub mod outcome;
pub mod stock;

pub use outcome::{StockOutcome, StockRejection};
pub use stock::{Quantity, StockLevel};
