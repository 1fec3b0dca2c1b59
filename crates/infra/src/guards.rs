//! Existence guards run before every mutating catalog or stock request.
//!
//! Guards are read-only and sit outside the stock unit of work. A product
//! deleted between the guard and the write is caught by the foreign keys on
//! `stock`, which turn the write into a failed outcome.

use std::sync::Arc;

use tracing::{debug, instrument};

use stockroom_core::{ProductId, StoreId};

use crate::error::ServiceError;
use crate::store::CatalogStore;

#[derive(Clone)]
pub struct ExistenceGuards {
    catalog: Arc<dyn CatalogStore>,
}

impl ExistenceGuards {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self), fields(store_id = %store_id), err)]
    pub async fn require_store_exists(&self, store_id: StoreId) -> Result<(), ServiceError> {
        if self.catalog.store_exists(store_id).await? {
            return Ok(());
        }
        debug!("store guard refused");
        Err(ServiceError::StoreNotFound(store_id))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn require_product_exists(&self, product_id: ProductId) -> Result<(), ServiceError> {
        if self.catalog.product_exists(product_id).await? {
            return Ok(());
        }
        debug!("product guard refused");
        Err(ServiceError::ProductNotFound(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, Taxonomy};
    use stockroom_products::{NewProduct, ProductDetails};

    fn details() -> ProductDetails {
        ProductDetails {
            name: "Mug".into(),
            description: "Stoneware".into(),
            price: 8.0,
            image: "mug.png".into(),
            category_id: 1,
        }
    }

    #[tokio::test]
    async fn known_store_and_product_pass() {
        let store = InMemoryStore::new(&Taxonomy::new()).unwrap();
        let store_id = store.add_storefront().await.unwrap();
        let product = store
            .insert_product(&NewProduct { store_id, details: details() })
            .await
            .unwrap();
        let guards = ExistenceGuards::new(Arc::new(store));

        guards.require_store_exists(store_id).await.unwrap();
        guards.require_product_exists(product.product_id).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let guards = ExistenceGuards::new(Arc::new(InMemoryStore::new(&Taxonomy::new()).unwrap()));

        let store_err = guards
            .require_store_exists(StoreId::new(5).unwrap())
            .await
            .unwrap_err();
        assert_eq!(store_err, ServiceError::StoreNotFound(StoreId::new(5).unwrap()));
        assert!(store_err.is_not_found());

        let product_err = guards
            .require_product_exists(ProductId::new(9).unwrap())
            .await
            .unwrap_err();
        assert_eq!(product_err, ServiceError::ProductNotFound(ProductId::new(9).unwrap()));
    }

    #[tokio::test]
    async fn deleted_product_fails_guard() {
        let store = InMemoryStore::new(&Taxonomy::new()).unwrap();
        let store_id = store.add_storefront().await.unwrap();
        let product = store
            .insert_product(&NewProduct { store_id, details: details() })
            .await
            .unwrap();
        assert!(store.delete_product(product.product_id).await.unwrap());

        let guards = ExistenceGuards::new(Arc::new(store));
        assert!(guards.require_product_exists(product.product_id).await.is_err());
    }
}
