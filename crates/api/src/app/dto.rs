use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use stockroom_core::{AttributeSet, DomainError, DomainResult, ProductId, StoreId};
use stockroom_inventory::{Quantity, StockOutcome};
use stockroom_products::{NewProduct, Product, ProductDraft};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    #[serde(rename = "storeId")]
    pub store_id: Option<i64>,
    #[serde(flatten)]
    pub fields: ProductDraft,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> DomainResult<NewProduct> {
        let store_id = self
            .store_id
            .ok_or_else(|| DomainError::validation("missing required fields: storeId"))
            .and_then(StoreId::new)?;
        Ok(NewProduct {
            store_id,
            details: self.fields.into_details()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckStockRequest {
    pub attributes: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockChangeRequest {
    pub quantity: Option<i64>,
    pub attributes: Option<BTreeMap<String, Value>>,
}

impl StockChangeRequest {
    pub fn into_parts(self) -> DomainResult<(AttributeSet, Quantity)> {
        let quantity = self
            .quantity
            .ok_or_else(|| DomainError::validation("quantity is required"))
            .and_then(Quantity::new)?;
        Ok((parse_attributes(self.attributes)?, quantity))
    }
}

/// Parse a path segment into a product id (positive integer).
pub fn parse_product_id(raw: &str) -> DomainResult<ProductId> {
    raw.parse()
}

/// Attribute map from JSON. Values may be strings, numbers or booleans
/// (`{"size": 42}` reads as `size=42`).
pub fn parse_attributes(raw: Option<BTreeMap<String, Value>>) -> DomainResult<AttributeSet> {
    let raw = raw.ok_or_else(|| DomainError::validation("attributes are required"))?;
    let mut pairs = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(DomainError::validation(format!(
                    "attribute '{name}' must be a string, number or boolean, got {other}"
                )));
            }
        };
        pairs.push((name, value));
    }
    AttributeSet::new(pairs)
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(product: &Product) -> Value {
    serde_json::json!({
        "product_id": product.product_id.get(),
        "storeId": product.store_id.get(),
        "name": product.name,
        "description": product.description,
        "price": product.price,
        "image": product.image,
        "category_id": product.category_id,
    })
}

/// Body of a stock mutation response.
pub fn stock_outcome_to_json(message: &str, outcome: &StockOutcome) -> Value {
    let mut body = serde_json::json!({
        "message": message,
        "outcome": outcome.kind(),
    });
    match outcome {
        StockOutcome::Applied(level) => body["stock"] = level.get().into(),
        StockOutcome::Rejected(reason) => {
            body["reason"] = serde_json::to_value(reason).unwrap_or(Value::Null);
            body["detail"] = reason.to_string().into();
        }
        StockOutcome::Failed(reason) => body["detail"] = reason.clone().into(),
    }
    body
}
