use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

use crate::outcome::StockRejection;

/// Requested change in stock: always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(raw: i64) -> DomainResult<Self> {
        if raw <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {raw}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quantity on hand for one variant. Never negative.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StockLevel(i64);

impl StockLevel {
    /// Level of a variant that has no stock row.
    pub const ZERO: StockLevel = StockLevel(0);

    /// Wrap a stored quantity. A negative value means the store broke the
    /// `quantity >= 0` invariant.
    pub fn new(raw: i64) -> DomainResult<Self> {
        if raw < 0 {
            return Err(DomainError::invariant(format!(
                "stock cannot go negative (found {raw})"
            )));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Level after receiving `quantity` units.
    pub fn add(self, quantity: Quantity) -> DomainResult<Self> {
        self.0
            .checked_add(quantity.get())
            .map(Self)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))
    }

    /// Level after removing `quantity` units, or the rejection when there is
    /// not enough on hand.
    pub fn reduce(self, quantity: Quantity) -> Result<Self, StockRejection> {
        if self.0 < quantity.get() {
            return Err(StockRejection::InsufficientStock {
                requested: quantity.get(),
                available: self.0,
            });
        }
        Ok(Self(self.0 - quantity.get()))
    }
}

impl TryFrom<i64> for StockLevel {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StockLevel> for i64 {
    fn from(value: StockLevel) -> Self {
        value.0
    }
}

impl core::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
