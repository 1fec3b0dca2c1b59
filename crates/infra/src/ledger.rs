//! Stock ledger: add, reduce and check attribute-keyed stock.
//!
//! ## Unit of work
//!
//! ```text
//! add_stock                          reduce_stock
//!   begin                              begin
//!   lock product (variant creation)    find variant (row locked)
//!   find variant (row locked)            none      -> rollback, InvalidVariant
//!     found -> increment                 q > level -> rollback, InsufficientStock
//!     none  -> insert row                else      -> decrement
//!              resolve + assign each   commit
//!              pair (unknown -> rollback, InvalidAttribute)
//!   commit
//! ```
//!
//! Mutations never return `Err`. Business refusals come back as
//! `StockOutcome::Rejected`, store failures as `StockOutcome::Failed`, and in
//! both cases the unit of work has been rolled back before the call returns.
//! Existence guards are the caller's job and run before the ledger.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use stockroom_core::{AttributeSet, ProductId};
use stockroom_inventory::{Quantity, StockLevel, StockOutcome, StockRejection};

use crate::error::StoreError;
use crate::resolver::AttributeResolver;
use crate::store::{InventoryStore, StockTransaction};

/// Result of a unit-of-work body before commit/rollback.
enum Step {
    Commit(StockLevel),
    Abort(StockRejection),
}

#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn InventoryStore>,
    resolver: AttributeResolver,
}

impl StockLedger {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        let resolver = AttributeResolver::new(store.clone());
        Self { store, resolver }
    }

    /// Current quantity of a variant; zero when no row matches.
    #[instrument(skip(self, attributes), fields(product_id = %product_id, attributes = %attributes), err)]
    pub async fn check_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<StockLevel, StoreError> {
        Ok(self
            .resolver
            .resolve(product_id, attributes)
            .await?
            .map(|row| row.level)
            .unwrap_or(StockLevel::ZERO))
    }

    /// Increment a variant, creating it (with its assignments) on first use.
    #[instrument(skip(self, attributes), fields(product_id = %product_id, attributes = %attributes, quantity = quantity.get()))]
    pub async fn add_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
        quantity: Quantity,
    ) -> StockOutcome {
        let outcome = match self.store.begin().await {
            Ok(mut tx) => {
                let step = add_in(tx.as_mut(), product_id, attributes, quantity).await;
                finish(tx, step).await
            }
            Err(e) => StockOutcome::Failed(e.to_string()),
        };
        log_outcome("add_stock", &outcome);
        outcome
    }

    /// Decrement a variant if it holds at least `quantity`.
    #[instrument(skip(self, attributes), fields(product_id = %product_id, attributes = %attributes, quantity = quantity.get()))]
    pub async fn reduce_stock(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
        quantity: Quantity,
    ) -> StockOutcome {
        let outcome = match self.store.begin().await {
            Ok(mut tx) => {
                let step = reduce_in(tx.as_mut(), product_id, attributes, quantity).await;
                finish(tx, step).await
            }
            Err(e) => StockOutcome::Failed(e.to_string()),
        };
        log_outcome("reduce_stock", &outcome);
        outcome
    }
}

async fn add_in(
    tx: &mut dyn StockTransaction,
    product_id: ProductId,
    attributes: &AttributeSet,
    quantity: Quantity,
) -> Result<Step, StoreError> {
    tx.lock_product(product_id).await?;

    if let Some(row) = tx.find_variant(product_id, attributes).await? {
        let level = tx.increment(row.stock_id, quantity).await?;
        return Ok(Step::Commit(level));
    }

    let stock_id = tx.insert_stock(product_id, quantity).await?;
    for pair in attributes.iter() {
        let Some((attribute_id, value_id)) = tx.resolve_attribute(pair).await? else {
            return Ok(Step::Abort(StockRejection::InvalidAttribute {
                name: pair.name().to_string(),
                value: pair.value().to_string(),
            }));
        };
        tx.assign_attribute(stock_id, attribute_id, value_id).await?;
    }
    Ok(Step::Commit(StockLevel::new(quantity.get())?))
}

async fn reduce_in(
    tx: &mut dyn StockTransaction,
    product_id: ProductId,
    attributes: &AttributeSet,
    quantity: Quantity,
) -> Result<Step, StoreError> {
    let Some(row) = tx.find_variant(product_id, attributes).await? else {
        return Ok(Step::Abort(StockRejection::InvalidVariant));
    };
    if let Err(rejection) = row.level.reduce(quantity) {
        return Ok(Step::Abort(rejection));
    }
    let level = tx.decrement(row.stock_id, quantity).await?;
    Ok(Step::Commit(level))
}

/// Commit on `Step::Commit`, roll back on everything else.
async fn finish(tx: Box<dyn StockTransaction>, step: Result<Step, StoreError>) -> StockOutcome {
    match step {
        Ok(Step::Commit(level)) => match tx.commit().await {
            Ok(()) => StockOutcome::Applied(level),
            Err(e) => StockOutcome::Failed(e.to_string()),
        },
        Ok(Step::Abort(rejection)) => match tx.rollback().await {
            Ok(()) => StockOutcome::Rejected(rejection),
            Err(e) => StockOutcome::Failed(e.to_string()),
        },
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            StockOutcome::Failed(e.to_string())
        }
    }
}

fn log_outcome(operation: &'static str, outcome: &StockOutcome) {
    match outcome {
        StockOutcome::Applied(level) => info!(operation, level = level.get(), "stock applied"),
        StockOutcome::Rejected(reason) => warn!(operation, %reason, "stock rejected"),
        StockOutcome::Failed(reason) => error!(operation, %reason, "stock update failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogStore, InMemoryStore, Taxonomy};
    use stockroom_core::StoreId;
    use stockroom_products::{NewProduct, ProductDetails};

    async fn setup() -> (InMemoryStore, StockLedger, ProductId) {
        let store = InMemoryStore::new(&Taxonomy::demo()).unwrap();
        let store_id: StoreId = store.add_storefront().await.unwrap();
        let product = store
            .insert_product(&NewProduct {
                store_id,
                details: ProductDetails {
                    name: "Tee".into(),
                    description: "Cotton tee".into(),
                    price: 19.5,
                    image: "tee.png".into(),
                    category_id: 3,
                },
            })
            .await
            .unwrap();
        let ledger = StockLedger::new(Arc::new(store.clone()));
        (store, ledger, product.product_id)
    }

    fn red_m() -> AttributeSet {
        AttributeSet::new([("color", "red"), ("size", "M")]).unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn check_without_row_is_zero() {
        let (_, ledger, product) = setup().await;
        assert_eq!(ledger.check_stock(product, &red_m()).await.unwrap(), StockLevel::ZERO);
    }

    #[tokio::test]
    async fn add_reduce_walkthrough() {
        let (_, ledger, product) = setup().await;
        let attrs = red_m();

        let added = ledger.add_stock(product, &attrs, qty(10)).await;
        assert_eq!(added.level().map(|l| l.get()), Some(10));

        let reduced = ledger.reduce_stock(product, &attrs, qty(7)).await;
        assert!(reduced.is_applied());
        assert_eq!(ledger.check_stock(product, &attrs).await.unwrap().get(), 3);

        let refused = ledger.reduce_stock(product, &attrs, qty(5)).await;
        assert_eq!(
            refused,
            StockOutcome::Rejected(StockRejection::InsufficientStock {
                requested: 5,
                available: 3
            })
        );
        assert_eq!(ledger.check_stock(product, &attrs).await.unwrap().get(), 3);
    }

    #[tokio::test]
    async fn repeated_adds_accumulate_in_one_row() {
        let (store, ledger, product) = setup().await;
        let attrs = red_m();

        assert!(ledger.add_stock(product, &attrs, qty(4)).await.is_applied());
        assert!(ledger.add_stock(product, &attrs, qty(6)).await.is_applied());

        assert_eq!(ledger.check_stock(product, &attrs).await.unwrap().get(), 10);
        assert_eq!(store.stock_rows(product).await, 1);
        assert_eq!(store.assignment_rows().await, 2);
    }

    #[tokio::test]
    async fn variants_are_matched_as_exact_sets() {
        let (store, ledger, product) = setup().await;
        let red = AttributeSet::new([("color", "red")]).unwrap();

        assert!(ledger.add_stock(product, &red_m(), qty(5)).await.is_applied());
        assert_eq!(ledger.check_stock(product, &red).await.unwrap(), StockLevel::ZERO);

        assert!(ledger.add_stock(product, &red, qty(2)).await.is_applied());
        assert_eq!(store.stock_rows(product).await, 2);
        assert_eq!(ledger.check_stock(product, &red_m()).await.unwrap().get(), 5);
        assert_eq!(ledger.check_stock(product, &red).await.unwrap().get(), 2);
    }

    #[tokio::test]
    async fn unknown_attribute_persists_nothing() {
        let (store, ledger, product) = setup().await;
        let attrs = AttributeSet::new([("color", "red"), ("fabric", "silk")]).unwrap();

        let outcome = ledger.add_stock(product, &attrs, qty(3)).await;
        assert_eq!(
            outcome,
            StockOutcome::Rejected(StockRejection::InvalidAttribute {
                name: "fabric".into(),
                value: "silk".into()
            })
        );
        assert_eq!(store.stock_rows(product).await, 0);
        assert_eq!(store.assignment_rows().await, 0);
    }

    #[tokio::test]
    async fn unknown_value_of_known_attribute_is_rejected() {
        let (store, ledger, product) = setup().await;
        let attrs = AttributeSet::new([("color", "mauve")]).unwrap();

        let outcome = ledger.add_stock(product, &attrs, qty(1)).await;
        assert!(matches!(
            outcome,
            StockOutcome::Rejected(StockRejection::InvalidAttribute { .. })
        ));
        assert_eq!(store.stock_rows(product).await, 0);
    }

    #[tokio::test]
    async fn reduce_without_variant_is_rejected() {
        let (_, ledger, product) = setup().await;
        let outcome = ledger.reduce_stock(product, &red_m(), qty(1)).await;
        assert_eq!(outcome, StockOutcome::Rejected(StockRejection::InvalidVariant));
    }

    #[tokio::test]
    async fn reduce_to_exactly_zero_is_applied() {
        let (_, ledger, product) = setup().await;
        ledger.add_stock(product, &red_m(), qty(4)).await;
        let outcome = ledger.reduce_stock(product, &red_m(), qty(4)).await;
        assert_eq!(outcome, StockOutcome::Applied(StockLevel::ZERO));
    }

    #[tokio::test]
    async fn failed_commit_leaves_state_untouched() {
        let (store, ledger, product) = setup().await;
        ledger.add_stock(product, &red_m(), qty(4)).await;

        store.fail_commits(true);
        let outcome = ledger.add_stock(product, &red_m(), qty(6)).await;
        assert_eq!(outcome.kind(), "failed");
        store.fail_commits(false);

        assert_eq!(ledger.check_stock(product, &red_m()).await.unwrap().get(), 4);
    }

    #[tokio::test]
    async fn add_for_missing_product_fails() {
        let (store, ledger, _) = setup().await;
        let ghost = ProductId::new(999).unwrap();
        let outcome = ledger.add_stock(ghost, &red_m(), qty(1)).await;
        assert_eq!(outcome.kind(), "failed");
        assert_eq!(store.stock_rows(ghost).await, 0);
    }

    #[tokio::test]
    async fn concurrent_reducers_never_oversell() {
        let (_, ledger, product) = setup().await;
        ledger.add_stock(product, &red_m(), qty(10)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.reduce_stock(product, &red_m(), qty(3)).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_applied() {
                applied += 1;
            }
        }

        assert_eq!(applied, 3);
        assert_eq!(ledger.check_stock(product, &red_m()).await.unwrap().get(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_adds_create_one_row() {
        let (store, ledger, product) = setup().await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.add_stock(product, &red_m(), qty(2)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_applied());
        }

        assert_eq!(store.stock_rows(product).await, 1);
        assert_eq!(ledger.check_stock(product, &red_m()).await.unwrap().get(), 12);
    }
}
