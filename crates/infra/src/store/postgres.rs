//! Postgres-backed stores.
//!
//! ## Thread Safety
//!
//! Both stores hold an `Arc<PgPool>` and are `Send + Sync`. The pool is
//! bounded (`InfraConfig::max_connections`); every method acquires a pooled
//! connection and returns it when the query or transaction ends.
//!
//! ## Stock Units of Work
//!
//! [`PostgresInventoryStore::begin`] opens a transaction that owns its
//! connection. Row locks taken inside it (`SELECT ... FOR UPDATE`, `UPDATE`)
//! and the per-product advisory lock are released at commit or rollback. A
//! transaction dropped without either is rolled back by sqlx.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use stockroom_core::{
    AttributeId, AttributePair, AttributeSet, AttributeValueId, ProductId, StockId, StoreId,
};
use stockroom_inventory::{Quantity, StockLevel};
use stockroom_products::{NewProduct, Product, ProductDetails};

use super::r#trait::{CatalogStore, InventoryStore, StockTransaction, VariantRow};
use crate::config::InfraConfig;
use crate::error::{map_sqlx_error, StoreError};
use crate::resolver::{variant_binds, FIND_VARIANT_SQL, RESOLVE_ATTRIBUTE_SQL};

/// Idempotent DDL for every table the service touches.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Open the bounded connection pool described by `config`.
pub async fn connect_pool(config: &InfraConfig) -> Result<PgPool, StoreError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Run [`SCHEMA`] against the pool.
#[instrument(skip(pool), err)]
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

/// Postgres-backed catalog (product records and existence tables).
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn store_exists(&self, store_id: StoreId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM storefronts WHERE store_id = $1) AS found")
            .bind(store_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("store_exists", e))?;

        row.try_get::<bool, _>("found")
            .map_err(|e| StoreError::CorruptRow(format!("failed to read found: {}", e)))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn product_exists(&self, product_id: ProductId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM products WHERE product_id = $1) AS found")
            .bind(product_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))?;

        row.try_get::<bool, _>("found")
            .map_err(|e| StoreError::CorruptRow(format!("failed to read found: {}", e)))
    }

    #[instrument(
        skip(self, product),
        fields(store_id = %product.store_id, product_id = tracing::field::Empty),
        err
    )]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let details = &product.details;
        let row = sqlx::query(
            r#"
            INSERT INTO product ("storeId", name, description, price, image, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING product_id, "storeId", name, description, price, image, category_id
            "#,
        )
        .bind(product.store_id.get())
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.price)
        .bind(&details.image)
        .bind(details.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        let created = ProductRow::from_row(&row)
            .map_err(|e| StoreError::CorruptRow(format!("failed to deserialize product row: {}", e)))?
            .into_product()?;

        sqlx::query("INSERT INTO products (product_id) VALUES ($1)")
            .bind(created.product_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("product_id", created.product_id.get());
        Ok(created)
    }

    #[instrument(skip(self, details), fields(product_id = %product_id), err)]
    async fn update_product(
        &self,
        product_id: ProductId,
        details: &ProductDetails,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE product
            SET name = $2, description = $3, price = $4, image = $5, category_id = $6
            WHERE product_id = $1
            RETURNING product_id, "storeId", name, description, price, image, category_id
            "#,
        )
        .bind(product_id.get())
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.price)
        .bind(&details.image)
        .bind(details.category_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        match row {
            Some(row) => {
                let product = ProductRow::from_row(&row)
                    .map_err(|e| StoreError::CorruptRow(format!("failed to deserialize product row: {}", e)))?
                    .into_product()?;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn delete_product(&self, product_id: ProductId) -> Result<bool, StoreError> {
        // `products` and `stock` rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM product WHERE product_id = $1")
            .bind(product_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, "storeId", name, description, price, image, category_id
            FROM product
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => {
                let product = ProductRow::from_row(&row)
                    .map_err(|e| StoreError::CorruptRow(format!("failed to deserialize product row: {}", e)))?
                    .into_product()?;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }
}

/// Postgres-backed stock tables.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, attributes), fields(product_id = %product_id, attributes = %attributes), err)]
    async fn find_variant(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError> {
        let (names, values, count) = variant_binds(attributes);
        let row = sqlx::query(FIND_VARIANT_SQL)
            .bind(product_id.get())
            .bind(names)
            .bind(values)
            .bind(count)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_variant", e))?;

        row.as_ref().map(decode_variant).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn StockTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresStockTransaction { tx }))
    }
}

/// A stock unit of work on one pooled connection.
pub struct PostgresStockTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTransaction for PostgresStockTransaction {
    async fn lock_product(&mut self, product_id: ProductId) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(product_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, attributes), fields(product_id = %product_id, attributes = %attributes), err)]
    async fn find_variant(
        &mut self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError> {
        let (names, values, count) = variant_binds(attributes);
        let row = sqlx::query(FIND_VARIANT_SQL)
            .bind(product_id.get())
            .bind(names)
            .bind(values)
            .bind(count)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_variant", e))?;

        let Some(found) = row.as_ref().map(decode_variant).transpose()? else {
            return Ok(None);
        };

        // GROUP BY cannot be combined with FOR UPDATE; lock the row and
        // re-read the quantity a concurrent writer may have committed.
        let locked = sqlx::query("SELECT quantity FROM stock WHERE stock_id = $1 FOR UPDATE")
            .bind(found.stock_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_variant", e))?;

        match locked {
            Some(row) => {
                let quantity: i64 = row
                    .try_get("quantity")
                    .map_err(|e| StoreError::CorruptRow(format!("failed to read quantity: {}", e)))?;
                Ok(Some(VariantRow {
                    stock_id: found.stock_id,
                    level: StockLevel::new(quantity)?,
                }))
            }
            // Deleted between lookup and lock (product removed concurrently).
            None => Ok(None),
        }
    }

    async fn resolve_attribute(
        &mut self,
        pair: &AttributePair,
    ) -> Result<Option<(AttributeId, AttributeValueId)>, StoreError> {
        let row = sqlx::query(RESOLVE_ATTRIBUTE_SQL)
            .bind(pair.name())
            .bind(pair.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("resolve_attribute", e))?;

        match row {
            Some(row) => {
                let attribute_id: i64 = row
                    .try_get("attribute_id")
                    .map_err(|e| StoreError::CorruptRow(format!("failed to read attribute_id: {}", e)))?;
                let value_id: i64 = row
                    .try_get("value_id")
                    .map_err(|e| StoreError::CorruptRow(format!("failed to read value_id: {}", e)))?;
                Ok(Some((AttributeId::new(attribute_id)?, AttributeValueId::new(value_id)?)))
            }
            None => Ok(None),
        }
    }

    async fn increment(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError> {
        let row = sqlx::query(
            "UPDATE stock SET quantity = quantity + $1 WHERE stock_id = $2 RETURNING quantity",
        )
        .bind(quantity.get())
        .bind(stock_id.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("increment_stock", e))?;

        read_level(&row)
    }

    async fn decrement(
        &mut self,
        stock_id: StockId,
        quantity: Quantity,
    ) -> Result<StockLevel, StoreError> {
        let row = sqlx::query(
            "UPDATE stock SET quantity = quantity - $1 WHERE stock_id = $2 RETURNING quantity",
        )
        .bind(quantity.get())
        .bind(stock_id.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        read_level(&row)
    }

    async fn insert_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockId, StoreError> {
        let row = sqlx::query(
            "INSERT INTO stock (product_id, quantity) VALUES ($1, $2) RETURNING stock_id",
        )
        .bind(product_id.get())
        .bind(quantity.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock", e))?;

        let stock_id: i64 = row
            .try_get("stock_id")
            .map_err(|e| StoreError::CorruptRow(format!("failed to read stock_id: {}", e)))?;
        Ok(StockId::new(stock_id)?)
    }

    async fn assign_attribute(
        &mut self,
        stock_id: StockId,
        attribute_id: AttributeId,
        value_id: AttributeValueId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO stock_attributes (stock_id, attribute_id, value_id) VALUES ($1, $2, $3)",
        )
        .bind(stock_id.get())
        .bind(attribute_id.get())
        .bind(value_id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("assign_attribute", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn decode_variant(row: &PgRow) -> Result<VariantRow, StoreError> {
    let stock_id: i64 = row
        .try_get("stock_id")
        .map_err(|e| StoreError::CorruptRow(format!("failed to read stock_id: {}", e)))?;
    let quantity: i64 = row
        .try_get("quantity")
        .map_err(|e| StoreError::CorruptRow(format!("failed to read quantity: {}", e)))?;
    Ok(VariantRow {
        stock_id: StockId::new(stock_id)?,
        level: StockLevel::new(quantity)?,
    })
}

fn read_level(row: &PgRow) -> Result<StockLevel, StoreError> {
    let quantity: i64 = row
        .try_get("quantity")
        .map_err(|e| StoreError::CorruptRow(format!("failed to read quantity: {}", e)))?;
    Ok(StockLevel::new(quantity)?)
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    product_id: i64,
    store_id: i64,
    name: String,
    description: String,
    price: f64,
    image: String,
    category_id: i64,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            product_id: row.try_get("product_id")?,
            store_id: row.try_get("storeId")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            image: row.try_get("image")?,
            category_id: row.try_get("category_id")?,
        })
    }
}

impl ProductRow {
    fn into_product(self) -> Result<Product, StoreError> {
        Ok(Product::from_parts(
            ProductId::new(self.product_id)?,
            StoreId::new(self.store_id)?,
            ProductDetails {
                name: self.name,
                description: self.description,
                price: self.price,
                image: self.image,
                category_id: self.category_id,
            },
        ))
    }
}
