//! Attribute resolution: locate the stock row whose assignment set equals a
//! requested [`AttributeSet`].
//!
//! Matching is exact-set. A row assigned `{color=red, size=M}` is found by
//! exactly that set; `{color=red}` alone or `{color=red, size=M, fit=slim}`
//! do not match it. Not finding a row is a normal answer (zero stock), not
//! an error.

use std::sync::Arc;

use stockroom_core::{AttributeSet, ProductId};

use crate::error::StoreError;
use crate::store::{InventoryStore, VariantRow};

/// Exact-set lookup of a product's variant.
///
/// `$2`/`$3` are the aligned name/value arrays and `$4` their length. Every
/// assignment of a qualifying row must match one requested pair
/// (`COUNT(wanted.name)`), and the row must have as many assignments as pairs
/// were requested (`COUNT(*)`). `stock_attributes` is keyed by
/// `(stock_id, attribute_id)` and requested names are unique, so each
/// assignment matches at most one pair.
pub(crate) const FIND_VARIANT_SQL: &str = r#"
    SELECT s.stock_id, s.quantity
    FROM stock s
    JOIN stock_attributes sa ON sa.stock_id = s.stock_id
    JOIN attributes a ON a.attribute_id = sa.attribute_id
    JOIN attribute_values av ON av.value_id = sa.value_id
    LEFT JOIN UNNEST($2::text[], $3::text[]) AS wanted(name, value_name)
        ON wanted.name = a.name AND wanted.value_name = av.value_name
    WHERE s.product_id = $1
    GROUP BY s.stock_id, s.quantity
    HAVING COUNT(*) = $4 AND COUNT(wanted.name) = $4
    ORDER BY s.stock_id
    LIMIT 1
"#;

/// Reference ids for one `(name, value)` pair.
pub(crate) const RESOLVE_ATTRIBUTE_SQL: &str = r#"
    SELECT a.attribute_id, av.value_id
    FROM attributes a
    JOIN attribute_values av ON av.attribute_id = a.attribute_id
    WHERE a.name = $1 AND av.value_name = $2
"#;

/// Bind parameters `$2..$4` of [`FIND_VARIANT_SQL`].
pub(crate) fn variant_binds(attributes: &AttributeSet) -> (Vec<String>, Vec<String>, i64) {
    (
        attributes.names(),
        attributes.values(),
        attributes.len() as i64,
    )
}

/// Read-only resolver used by stock checks.
///
/// Mutations resolve through their own unit of work
/// (`StockTransaction::find_variant`) so the row lock covers the write.
#[derive(Clone)]
pub struct AttributeResolver {
    store: Arc<dyn InventoryStore>,
}

impl AttributeResolver {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        product_id: ProductId,
        attributes: &AttributeSet,
    ) -> Result<Option<VariantRow>, StoreError> {
        self.store.find_variant(product_id, attributes).await
    }
}
