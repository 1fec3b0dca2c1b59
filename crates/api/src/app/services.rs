//! Store construction and the service calls behind the handlers.
//!
//! Stock requests run the product guard first and only then touch the
//! ledger. Catalog requests are guarded inside `CatalogRepository`.

use std::sync::Arc;

use tracing::{info, warn};

use stockroom_core::{AttributeSet, ProductId};
use stockroom_infra::store::postgres::{apply_schema, connect_pool};
use stockroom_infra::store::{
    CatalogStore, InMemoryStore, InventoryStore, PostgresCatalogStore, PostgresInventoryStore,
    Taxonomy,
};
use stockroom_infra::{
    CatalogRepository, ExistenceGuards, InfraConfig, ServiceError, StockLedger, StoreError,
};
use stockroom_inventory::{Quantity, StockLevel, StockOutcome};
use stockroom_products::{NewProduct, Product, ProductDetails};

#[derive(Clone)]
pub struct AppServices {
    catalog: CatalogRepository,
    guards: ExistenceGuards,
    ledger: StockLedger,
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise an in-memory store with a demo taxonomy and one storefront.
pub async fn build_services(config: &InfraConfig) -> Result<AppServices, StoreError> {
    if config.uses_postgres() {
        let pool = connect_pool(config).await?;
        if config.apply_schema {
            apply_schema(&pool).await?;
            info!("schema applied");
        }
        info!(max_connections = config.max_connections, "using postgres stores");
        return Ok(AppServices::new(
            Arc::new(PostgresCatalogStore::new(pool.clone())),
            Arc::new(PostgresInventoryStore::new(pool)),
        ));
    }

    warn!("DATABASE_URL not set; using in-memory stores (data is not persisted)");
    let store = InMemoryStore::new(&Taxonomy::demo())?;
    let store_id = store.add_storefront().await?;
    info!(store_id = %store_id, "demo storefront created");
    Ok(AppServices::in_memory(store))
}

impl AppServices {
    pub fn new(catalog: Arc<dyn CatalogStore>, inventory: Arc<dyn InventoryStore>) -> Self {
        Self {
            catalog: CatalogRepository::new(catalog.clone()),
            guards: ExistenceGuards::new(catalog),
            ledger: StockLedger::new(inventory),
        }
    }

    /// Both seams backed by one shared in-memory store.
    pub fn in_memory(store: InMemoryStore) -> Self {
        let shared = Arc::new(store);
        Self::new(shared.clone(), shared)
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ServiceError> {
        self.catalog.create(product).await
    }

    pub async fn update_product(
        &self,
        product_id: ProductId,
        details: &ProductDetails,
    ) -> Result<Product, ServiceError> {
        self.catalog.update(product_id, details).await
    }

    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), ServiceError> {
        self.catalog.delete(product_id).await
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.catalog.get(product_id).await
    }

    pub async fn check_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<StockLevel, ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        Ok(self.ledger.check_stock(product_id, attributes).await?)
    }

    pub async fn add_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
        quantity: Quantity,
    ) -> Result<StockOutcome, ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        Ok(self.ledger.add_stock(product_id, attributes, quantity).await)
    }

    pub async fn reduce_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
        quantity: Quantity,
    ) -> Result<StockOutcome, ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        Ok(self.ledger.reduce_stock(product_id, attributes, quantity).await)
    }
}
