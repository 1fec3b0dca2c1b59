//! Ledger and catalog against a real Postgres.
//!
//! Runs only when `DATABASE_URL` is set; otherwise each test returns early.
//! Reference data is created with unique names so runs do not collide.

use std::sync::Arc;

use sqlx::{PgPool, Row};
use uuid::Uuid;

use stockroom_core::{AttributeSet, ProductId, StoreId};
use stockroom_infra::store::postgres::{apply_schema, connect_pool};
use stockroom_infra::store::{PostgresCatalogStore, PostgresInventoryStore};
use stockroom_infra::{CatalogRepository, InfraConfig, ServiceError, StockLedger};
use stockroom_inventory::{Quantity, StockOutcome, StockRejection};
use stockroom_products::{NewProduct, ProductDetails};

struct Fixture {
    pool: PgPool,
    catalog: CatalogRepository,
    ledger: StockLedger,
    store_id: StoreId,
    color: String,
    size: String,
}

async fn fixture() -> Option<Fixture> {
    let config = InfraConfig::from_env().unwrap();
    if !config.uses_postgres() {
        eprintln!("DATABASE_URL not set; skipping Postgres test");
        return None;
    }

    let pool = connect_pool(&config).await.unwrap();
    apply_schema(&pool).await.unwrap();

    let suffix = Uuid::now_v7().simple().to_string();
    let color = format!("color_{suffix}");
    let size = format!("size_{suffix}");
    seed_attribute(&pool, &color, &["red", "blue"]).await;
    seed_attribute(&pool, &size, &["S", "M"]).await;

    let row = sqlx::query("INSERT INTO storefronts DEFAULT VALUES RETURNING store_id")
        .fetch_one(&pool)
        .await
        .unwrap();
    let store_id = StoreId::new(row.get::<i64, _>("store_id")).unwrap();

    Some(Fixture {
        catalog: CatalogRepository::new(Arc::new(PostgresCatalogStore::new(pool.clone()))),
        ledger: StockLedger::new(Arc::new(PostgresInventoryStore::new(pool.clone()))),
        pool,
        store_id,
        color,
        size,
    })
}

async fn seed_attribute(pool: &PgPool, name: &str, values: &[&str]) {
    let row = sqlx::query("INSERT INTO attributes (name) VALUES ($1) RETURNING attribute_id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    let attribute_id: i64 = row.get("attribute_id");
    for value in values {
        sqlx::query("INSERT INTO attribute_values (attribute_id, value_name) VALUES ($1, $2)")
            .bind(attribute_id)
            .bind(*value)
            .execute(pool)
            .await
            .unwrap();
    }
}

impl Fixture {
    async fn product(&self) -> ProductId {
        self.catalog
            .create(&NewProduct {
                store_id: self.store_id,
                details: ProductDetails {
                    name: "Hoodie".to_string(),
                    description: "Fleece".to_string(),
                    price: 49.0,
                    image: "hoodie.png".to_string(),
                    category_id: 7,
                },
            })
            .await
            .unwrap()
            .product_id
    }

    fn attrs(&self, color: &str, size: &str) -> AttributeSet {
        AttributeSet::new([(self.color.as_str(), color), (self.size.as_str(), size)]).unwrap()
    }

    async fn stock_rows(&self, product_id: ProductId) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM stock WHERE product_id = $1")
            .bind(product_id.get())
            .fetch_one(&self.pool)
            .await
            .unwrap()
            .get("n")
    }

    async fn assignment_rows(&self, product_id: ProductId) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS n FROM stock_attributes sa JOIN stock s ON s.stock_id = sa.stock_id WHERE s.product_id = $1",
        )
        .bind(product_id.get())
        .fetch_one(&self.pool)
        .await
        .unwrap()
        .get("n")
    }
}

fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

#[tokio::test]
async fn add_reduce_walkthrough() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    let attrs = fx.attrs("red", "M");

    assert_eq!(fx.ledger.check_stock(product, &attrs).await.unwrap().get(), 0);
    assert!(fx.ledger.add_stock(product, &attrs, qty(10)).await.is_applied());
    assert!(fx.ledger.reduce_stock(product, &attrs, qty(7)).await.is_applied());
    assert_eq!(
        fx.ledger.reduce_stock(product, &attrs, qty(5)).await,
        StockOutcome::Rejected(StockRejection::InsufficientStock {
            requested: 5,
            available: 3
        })
    );
    assert_eq!(fx.ledger.check_stock(product, &attrs).await.unwrap().get(), 3);
}

#[tokio::test]
async fn adds_accumulate_and_sets_match_exactly() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    let full = fx.attrs("blue", "S");
    let partial = AttributeSet::new([(fx.color.as_str(), "blue")]).unwrap();

    fx.ledger.add_stock(product, &full, qty(2)).await;
    fx.ledger.add_stock(product, &full, qty(3)).await;
    assert_eq!(fx.ledger.check_stock(product, &full).await.unwrap().get(), 5);
    assert_eq!(fx.ledger.check_stock(product, &partial).await.unwrap().get(), 0);
    assert_eq!(fx.stock_rows(product).await, 1);
}

#[tokio::test]
async fn unknown_value_leaves_no_rows() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    let attrs = fx.attrs("red", "XXXL");

    let outcome = fx.ledger.add_stock(product, &attrs, qty(1)).await;
    assert!(matches!(
        outcome,
        StockOutcome::Rejected(StockRejection::InvalidAttribute { .. })
    ));
    assert_eq!(fx.stock_rows(product).await, 0);
    assert_eq!(fx.assignment_rows(product).await, 0);
}

#[tokio::test]
async fn concurrent_reducers_never_oversell() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    let attrs = fx.attrs("red", "S");
    fx.ledger.add_stock(product, &attrs, qty(10)).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = fx.ledger.clone();
        let attrs = attrs.clone();
        handles.push(tokio::spawn(async move {
            ledger.reduce_stock(product, &attrs, qty(3)).await
        }));
    }
    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().is_applied() {
            applied += 1;
        }
    }

    assert_eq!(applied, 3);
    assert_eq!(fx.ledger.check_stock(product, &attrs).await.unwrap().get(), 1);
}

#[tokio::test]
async fn concurrent_first_adds_create_one_row() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    let attrs = fx.attrs("blue", "M");

    let mut handles = Vec::new();
    for _ in 0..6 {
        let ledger = fx.ledger.clone();
        let attrs = attrs.clone();
        handles.push(tokio::spawn(async move {
            ledger.add_stock(product, &attrs, qty(2)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_applied());
    }

    assert_eq!(fx.stock_rows(product).await, 1);
    assert_eq!(fx.ledger.check_stock(product, &attrs).await.unwrap().get(), 12);
}

#[tokio::test]
async fn catalog_crud_and_cascade() {
    let Some(fx) = fixture().await else { return };
    let product = fx.product().await;
    fx.ledger.add_stock(product, &fx.attrs("red", "M"), qty(4)).await;

    let mut details = fx.catalog.get(product).await.unwrap().details();
    details.price = 59.5;
    let updated = fx.catalog.update(product, &details).await.unwrap();
    assert_eq!(updated.price, 59.5);

    fx.catalog.delete(product).await.unwrap();
    assert_eq!(
        fx.catalog.get(product).await.unwrap_err(),
        ServiceError::ProductNotFound(product)
    );
    assert_eq!(fx.stock_rows(product).await, 0);
}
