use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ProductId, StoreId};

/// Editable product fields (everything except identity and owner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub category_id: i64,
}

/// Product creation request, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub details: ProductDetails,
}

/// Stored product record.
///
/// Serializes with the column names of the `product` table, so `store_id`
/// appears as `storeId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    #[serde(rename = "storeId")]
    pub store_id: StoreId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub category_id: i64,
}

impl Product {
    pub fn from_parts(product_id: ProductId, store_id: StoreId, details: ProductDetails) -> Self {
        Self {
            product_id,
            store_id,
            name: details.name,
            description: details.description,
            price: details.price,
            image: details.image,
            category_id: details.category_id,
        }
    }

    pub fn details(&self) -> ProductDetails {
        ProductDetails {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            image: self.image.clone(),
            category_id: self.category_id,
        }
    }
}

/// Loosely-typed product fields as they arrive over the wire.
///
/// Every field is optional so that a missing field can be reported by name
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category_id: Option<i64>,
}

impl ProductDraft {
    /// Validate into [`ProductDetails`].
    ///
    /// A field counts as missing when it is absent, a blank string, a zero or
    /// non-finite price, or a non-positive category id. All missing fields
    /// are listed in the error.
    pub fn into_details(self) -> DomainResult<ProductDetails> {
        let mut missing: Vec<&'static str> = Vec::new();

        let name = non_blank(self.name);
        if name.is_none() {
            missing.push("name");
        }
        let description = non_blank(self.description);
        if description.is_none() {
            missing.push("description");
        }
        let price = self.price.filter(|p| p.is_finite() && *p != 0.0);
        if price.is_none() {
            missing.push("price");
        }
        let image = non_blank(self.image);
        if image.is_none() {
            missing.push("image");
        }
        let category_id = self.category_id.filter(|c| *c > 0);
        if category_id.is_none() {
            missing.push("category_id");
        }

        match (name, description, price, image, category_id) {
            (Some(name), Some(description), Some(price), Some(image), Some(category_id)) => {
                if price < 0.0 {
                    return Err(DomainError::validation("price cannot be negative"));
                }
                Ok(ProductDetails {
                    name,
                    description,
                    price,
                    image,
                    category_id,
                })
            }
            _ => Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_draft() -> ProductDraft {
        ProductDraft {
            name: Some("Tee".to_string()),
            description: Some("Cotton t-shirt".to_string()),
            price: Some(19.5),
            image: Some("tee.png".to_string()),
            category_id: Some(3),
        }
    }

    #[test]
    fn complete_draft_validates() {
        let details = full_draft().into_details().unwrap();
        assert_eq!(details.name, "Tee");
        assert_eq!(details.price, 19.5);
        assert_eq!(details.category_id, 3);
    }

    #[test]
    fn missing_fields_are_all_named() {
        let draft = ProductDraft {
            name: Some("  ".to_string()),
            price: None,
            ..full_draft()
        };
        let err = draft.into_details().unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("missing required fields: name, price".to_string())
        );
    }

    #[test]
    fn zero_price_counts_as_missing() {
        let draft = ProductDraft {
            price: Some(0.0),
            ..full_draft()
        };
        assert!(draft.into_details().unwrap_err().to_string().contains("price"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let draft = ProductDraft {
            price: Some(-1.0),
            ..full_draft()
        };
        assert_eq!(
            draft.into_details().unwrap_err(),
            DomainError::validation("price cannot be negative")
        );
    }

    #[test]
    fn product_serializes_with_table_column_names() {
        let product = Product::from_parts(
            ProductId::new(42).unwrap(),
            StoreId::new(1).unwrap(),
            full_draft().into_details().unwrap(),
        );
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["product_id"], 42);
        assert_eq!(json["storeId"], 1);
        assert_eq!(json["category_id"], 3);
        assert_eq!(product.details(), full_draft().into_details().unwrap());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a draft with every field present always validates and
            /// keeps the trimmed values.
            #[test]
            fn complete_drafts_validate(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                price in 0.01f64..100_000.0,
                category in 1i64..10_000,
            ) {
                let draft = ProductDraft {
                    name: Some(name.clone()),
                    price: Some(price),
                    category_id: Some(category),
                    ..full_draft()
                };
                let details = draft.into_details().unwrap();
                prop_assert_eq!(details.name, name.trim().to_string());
                prop_assert_eq!(details.category_id, category);
            }
        }
    }
}
