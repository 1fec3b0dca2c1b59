//! In-memory stores for tests/dev.
//!
//! One [`InMemoryStore`] backs both [`CatalogStore`] and [`InventoryStore`],
//! mirroring the tables of the Postgres schema. A stock unit of work holds
//! the store-wide lock for its whole lifetime and writes into a private copy
//! of the tables, which replaces the shared tables only on commit. That makes
//! every unit of work atomic and fully serialized (stricter than the row
//! locks Postgres uses, with the same observable guarantees).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroom_core::{
    AttributeId, AttributePair, AttributeSet, AttributeValueId, ProductId, StockId, StoreId,
};
use stockroom_inventory::{Quantity, StockLevel};
use stockroom_products::{NewProduct, Product, ProductDetails};

use super::r#trait::{CatalogStore, InventoryStore, StockTransaction, VariantRow};
use crate::error::StoreError;

/// Attribute reference data to seed a store with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    attributes: Vec<(String, Vec<String>)>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute with its permissible values.
    pub fn attribute<N, I, V>(mut self, name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// `color` and `size`, used by the dev server.
    pub fn demo() -> Self {
        Self::new()
            .attribute("color", ["red", "blue", "black", "white"])
            .attribute("size", ["S", "M", "L", "XL"])
    }
}

#[derive(Debug, Clone)]
struct StockRow {
    product_id: ProductId,
    quantity: i64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    storefronts: BTreeSet<StoreId>,
    products: BTreeMap<ProductId, Product>,
    attributes: BTreeMap<String, AttributeId>,
    attribute_values: BTreeMap<(AttributeId, String), AttributeValueId>,
    attribute_names: BTreeMap<AttributeId, String>,
    value_names: BTreeMap<AttributeValueId, String>,
    stock: BTreeMap<StockId, StockRow>,
    stock_attributes: BTreeMap<(StockId, AttributeId), AttributeValueId>,
    last_store_id: i64,
    last_product_id: i64,
    last_stock_id: i64,
}

impl Tables {
    fn seed(taxonomy: &Taxonomy) -> Result<Self, StoreError> {
        let mut tables = Tables::default();
        let mut last_attribute_id = 0i64;
        let mut last_value_id = 0i64;
        for (name, values) in &taxonomy.attributes {
            if tables.attributes.contains_key(name) {
                return Err(StoreError::Conflict(format!("attribute '{name}' seeded twice")));
            }
            last_attribute_id += 1;
            let attribute_id = AttributeId::new(last_attribute_id)?;
            tables.attributes.insert(name.clone(), attribute_id);
            tables.attribute_names.insert(attribute_id, name.clone());

            for value in values {
                let key = (attribute_id, value.clone());
                if tables.attribute_values.contains_key(&key) {
                    continue;
                }
                last_value_id += 1;
                let value_id = AttributeValueId::new(last_value_id)?;
                tables.attribute_values.insert(key, value_id);
                tables.value_names.insert(value_id, value.clone());
            }
        }
        Ok(tables)
    }

    fn find_variant(&self, product_id: ProductId, attributes: &AttributeSet) -> Option<VariantRow> {
        self.stock
            .iter()
            .filter(|(_, row)| row.product_id == product_id)
            .find(|(stock_id, _)| {
                let assigned = self
                    .stock_attributes
                    .iter()
                    .filter(|((sid, _), _)| sid == *stock_id)
                    .filter_map(|((_, attribute_id), value_id)| {
                        Some((
                            self.attribute_names.get(attribute_id)?.as_str(),
                            self.value_names.get(value_id)?.as_str(),
                        ))
                    });
                attributes.matches_exactly(assigned)
            })
            .map(|(stock_id, row)| VariantRow {
                stock_id: *stock_id,
                level: StockLevel::new(row.quantity).unwrap_or(StockLevel::ZERO),
            })
    }

    fn resolve_attribute(&self, pair: &AttributePair) -> Option<(AttributeId, AttributeValueId)> {
        let attribute_id = *self.attributes.get(pair.name())?;
        let value_id = *self
            .attribute_values
            .get(&(attribute_id, pair.value().to_string()))?;
        Some((attribute_id, value_id))
    }

    fn stock_mut(&mut self, stock_id: StockId) -> Result<&mut StockRow, StoreError> {
        self.stock
            .get_mut(&stock_id)
            .ok_or_else(|| StoreError::Database(format!("stock row {stock_id} does not exist")))
    }

    fn delete_product(&mut self, product_id: ProductId) -> bool {
        if self.products.remove(&product_id).is_none() {
            return false;
        }
        let doomed: Vec<StockId> = self
            .stock
            .iter()
            .filter(|(_, row)| row.product_id == product_id)
            .map(|(id, _)| *id)
            .collect();
        for stock_id in doomed {
            self.stock.remove(&stock_id);
            self.stock_attributes.retain(|(sid, _), _| *sid != stock_id);
        }
        true
    }
}

/// In-memory implementation of every store trait.
///
/// Cloning shares the same tables.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Empty store seeded with the given attribute taxonomy.
    pub fn new(taxonomy: &Taxonomy) -> Result<Self, StoreError> {
        Ok(Self {
            tables: Arc::new(Mutex::new(Tables::seed(taxonomy)?)),
            fail_commits: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register a storefront and return its id.
    pub async fn add_storefront(&self) -> Result<StoreId, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_store_id += 1;
        let store_id = StoreId::new(tables.last_store_id)?;
        tables.storefronts.insert(store_id);
        Ok(store_id)
    }

    /// Make every subsequent commit fail (and roll back) until reset.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of stock rows for a product.
    pub async fn stock_rows(&self, product_id: ProductId) -> usize {
        let tables = self.tables.lock().await;
        tables
            .stock
            .values()
            .filter(|row| row.product_id == product_id)
            .count()
    }

    /// Number of attribute assignments across all stock rows.
    pub async fn assignment_rows(&self) -> usize {
        self.tables.lock().await.stock_attributes.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn store_exists(&self, store_id: StoreId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.storefronts.contains(&store_id))
    }

    async fn product_exists(&self, product_id: ProductId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.products.contains_key(&product_id))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.storefronts.contains(&product.store_id) {
            return Err(StoreError::Constraint(format!(
                "storefront {} does not exist",
                product.store_id
            )));
        }
        tables.last_product_id += 1;
        let product_id = ProductId::new(tables.last_product_id)?;
        let created = Product::from_parts(product_id, product.store_id, product.details.clone());
        tables.products.insert(product_id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.products.get_mut(&product_id).map(|existing| {
            *existing = Product::from_parts(product_id, existing.store_id, details.clone());
            existing.clone()
        }))
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.delete_product(product_id))
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.lock().await.products.get(&product_id).cloned())
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn find_variant(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError> {
        Ok(self.tables.lock().await.find_variant(product_id, attributes))
    }

    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryStockTransaction {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }
}

/// Unit of work over a private copy of the tables.
pub struct InMemoryStockTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_commit: bool,
}

#[async_trait]
impl StockTransaction for InMemoryStockTransaction {
    async fn lock_product(&mut self, _product_id: ProductId) -> Result<(), StoreError> {
        // The store-wide guard already serializes units of work.
        Ok(())
    }

    async fn find_variant(
        &mut self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError> {
        Ok(self.working.find_variant(product_id, attributes))
    }

    async fn resolve_attribute(
        &mut self,
        pair: &AttributePair,
    ) -> Result<Option<(AttributeId, AttributeValueId)>, StoreError> {
        Ok(self.working.resolve_attribute(pair))
    }

    async fn increment(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError> {
        let row = self.working.stock_mut(stock_id)?;
        let next = StockLevel::new(row.quantity)?.add(quantity)?;
        row.quantity = next.get();
        Ok(next)
    }

    async fn decrement(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError> {
        let row = self.working.stock_mut(stock_id)?;
        let next = row.quantity - quantity.get();
        if next < 0 {
            return Err(StoreError::Constraint(format!(
                "stock {stock_id}: quantity >= 0 check failed"
            )));
        }
        row.quantity = next;
        Ok(StockLevel::new(next)?)
    }

    async fn insert_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockId, StoreError> {
        if !self.working.products.contains_key(&product_id) {
            return Err(StoreError::Constraint(format!(
                "product {product_id} does not exist"
            )));
        }
        self.working.last_stock_id += 1;
        let stock_id = StockId::new(self.working.last_stock_id)?;
        self.working.stock.insert(
            stock_id,
            StockRow {
                product_id,
                quantity: quantity.get(),
            },
        );
        Ok(stock_id)
    }

    async fn assign_attribute(
        &mut self,
        stock_id: StockId,
        attribute_id: AttributeId,
        value_id: AttributeValueId,
    ) -> Result<(), StoreError> {
        if !self.working.stock.contains_key(&stock_id) {
            return Err(StoreError::Constraint(format!("stock {stock_id} does not exist")));
        }
        let key = (stock_id, attribute_id);
        if self.working.stock_attributes.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "stock {stock_id} already has attribute {attribute_id}"
            )));
        }
        self.working.stock_attributes.insert(key, value_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        if this.fail_commit {
            return Err(StoreError::Unavailable("commit failed (injected)".to_string()));
        }
        let mut guard = this.guard;
        *guard = this.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
