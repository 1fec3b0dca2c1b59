//! Infrastructure layer: persistence, configuration, and the services that
//! run domain rules against the store.

pub mod catalog;
pub mod config;
pub mod error;
pub mod guards;
pub mod ledger;
pub mod resolver;
pub mod store;

pub use catalog::CatalogRepository;
pub use config::{ConfigError, InfraConfig};
pub use error::{ServiceError, StoreError};
pub use guards::ExistenceGuards;
pub use ledger::StockLedger;
