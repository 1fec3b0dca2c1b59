//! Catalog repository: guarded CRUD over product records.

use std::sync::Arc;

use tracing::{info, instrument};

use stockroom_core::ProductId;
use stockroom_products::{NewProduct, Product, ProductDetails};

use crate::error::ServiceError;
use crate::guards::ExistenceGuards;
use crate::store::CatalogStore;

#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn CatalogStore>,
    guards: ExistenceGuards,
}

impl CatalogRepository {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        let guards = ExistenceGuards::new(store.clone());
        Self { store, guards }
    }

    /// Create a product in an existing store.
    #[instrument(skip(self, product), fields(store_id = %product.store_id), err)]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, ServiceError> {
        self.guards.require_store_exists(product.store_id).await?;
        let created = self.store.insert_product(product).await?;
        info!(product_id = %created.product_id, "product created");
        Ok(created)
    }

    /// Replace the editable fields of an existing product.
    #[instrument(skip(self, details), fields(product_id = %product_id), err)]
    pub async fn update(
        &self,
        product_id: ProductId,
        details: &ProductDetails,
    ) -> Result<Product, ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        self.store
            .update_product(product_id, details)
            .await?
            .ok_or(ServiceError::ProductNotFound(product_id))
    }

    /// Delete a product together with its stock rows.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn delete(&self, product_id: ProductId) -> Result<(), ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        if !self.store.delete_product(product_id).await? {
            return Err(ServiceError::ProductNotFound(product_id));
        }
        info!("product deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn get(&self, product_id: ProductId) -> Result<Product, ServiceError> {
        self.guards.require_product_exists(product_id).await?;
        self.store
            .get_product(product_id)
            .await?
            .ok_or(ServiceError::ProductNotFound(product_id))
    }
}
