//! Strongly-typed identifiers used across the domain.
//!
//! Every identifier wraps a database serial key. Keys are strictly positive;
//! zero or negative values never name a row.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a storefront (owner of products).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StoreId(i64);

/// Identifier of a product record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ProductId(i64);

/// Identifier of a stock (variant) row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StockId(i64);

/// Identifier of an attribute dimension (e.g. "color").
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AttributeId(i64);

/// Identifier of a permissible attribute value (e.g. "red").
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AttributeValueId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw key, rejecting non-positive values.
            pub fn new(raw: i64) -> Result<Self, DomainError> {
                if raw <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, raw
                    )));
                }
                Ok(Self(raw))
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl TryFrom<i64> for $t {
            type Error = DomainError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self::new(raw)
            }
        }
    };
}

impl_serial_newtype!(StoreId, "StoreId");
impl_serial_newtype!(ProductId, "ProductId");
impl_serial_newtype!(StockId, "StockId");
impl_serial_newtype!(AttributeId, "AttributeId");
impl_serial_newtype!(AttributeValueId, "AttributeValueId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_keys() {
        let id: ProductId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert!(matches!("0".parse::<ProductId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<StoreId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<StockId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn serde_is_a_plain_number() {
        let id = StoreId::new(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: StoreId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<StoreId>("0").is_err());
    }
}
