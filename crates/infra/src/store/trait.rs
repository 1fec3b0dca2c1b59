use async_trait::async_trait;

use stockroom_core::{
    AttributeId, AttributePair, AttributeSet, AttributeValueId, ProductId, StockId, StoreId,
};
use stockroom_inventory::{Quantity, StockLevel};
use stockroom_products::{NewProduct, Product, ProductDetails};

use crate::error::StoreError;

/// A stock row located by its attribute set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VariantRow {
    pub stock_id: StockId,
    pub level: StockLevel,
}

/// Product records plus the existence tables (`storefronts`, `products`).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn store_exists(&self, store_id: StoreId) -> Result<bool, StoreError>;

    async fn product_exists(&self, product_id: ProductId) -> Result<bool, StoreError>;

    /// Insert a product and register it in the existence table, atomically.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError>;

    /// Overwrite the editable fields. `None` when no such product.
    async fn update_product(
        &self,
        product_id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, StoreError>;

    /// Delete a product with its existence row and stock. `false` when no such product.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool, StoreError>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError>;
}

/// Attribute-keyed stock rows.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Exact-set variant lookup outside any unit of work (read only).
    async fn find_variant(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError>;

    /// Start a unit of work. The returned transaction owns its connection
    /// until it is committed, rolled back, or dropped.
    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError>;
}

/// One atomic unit of work over the stock tables.
///
/// Dropping a transaction without calling [`StockTransaction::commit`]
/// discards every write made through it.
#[async_trait]
pub trait StockTransaction: Send {
    /// Serialize variant creation for one product until this unit of work ends.
    async fn lock_product(&mut self, product_id: ProductId) -> Result<(), StoreError>;

    /// Exact-set variant lookup. A found row stays locked against other
    /// writers until this unit of work ends.
    async fn find_variant(
        &mut self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError>;

    /// Look up reference ids for one pair. `None` when the attribute or the
    /// value is unknown.
    async fn resolve_attribute(
        &mut self,
        pair: &AttributePair,
    ) -> Result<Option<(AttributeId, AttributeValueId)>, StoreError>;

    /// `quantity = quantity + n`; returns the new level.
    async fn increment(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError>;

    /// `quantity = quantity - n`; returns the new level.
    async fn decrement(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError>;

    /// Insert an unassigned stock row for a product.
    async fn insert_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockId, StoreError>;

    /// Bind a stock row to one (attribute, value) pair.
    async fn assign_attribute(
        &mut self,
        stock_id: StockId,
        attribute_id: AttributeId,
        value_id: AttributeValueId,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
