//! Attribute sets: the variant key of a stock row.
//!
//! Requests carry attributes as a JSON object (`{"color": "red", "size": "M"}`).
//! Inside the domain that becomes an [`AttributeSet`]: an ordered set of
//! `(attribute name, value name)` pairs, sorted by attribute name, with at
//! most one value per attribute and no blank names or values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// One `(attribute name, value name)` pair, e.g. `("color", "red")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributePair {
    name: String,
    value: String,
}

impl AttributePair {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Validated, non-empty attribute set identifying a stock variant.
///
/// Two sets are equal iff they contain the same pairs; insertion order does
/// not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct AttributeSet {
    pairs: Vec<AttributePair>,
}

impl AttributeSet {
    /// Build a set from `(name, value)` pairs.
    ///
    /// Names and values are trimmed. Fails on an empty input, a blank name or
    /// value, or the same attribute named twice.
    pub fn new<I, N, V>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut by_name: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in pairs {
            let name = name.into().trim().to_string();
            let value = value.into().trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("attribute name cannot be empty"));
            }
            if value.is_empty() {
                return Err(DomainError::validation(format!(
                    "value for attribute '{name}' cannot be empty"
                )));
            }
            if by_name.contains_key(&name) {
                return Err(DomainError::validation(format!(
                    "attribute '{name}' given more than once"
                )));
            }
            by_name.insert(name, value);
        }

        if by_name.is_empty() {
            return Err(DomainError::validation("at least one attribute is required"));
        }

        Ok(Self {
            pairs: by_name
                .into_iter()
                .map(|(name, value)| AttributePair { name, value })
                .collect(),
        })
    }

    /// Pairs in ascending attribute-name order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributePair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false: an `AttributeSet` cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value for an attribute name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.pairs[idx].value.as_str())
    }

    /// Attribute names, aligned with [`AttributeSet::values`].
    pub fn names(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.name.clone()).collect()
    }

    /// Value names, aligned with [`AttributeSet::names`].
    pub fn values(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.value.clone()).collect()
    }

    /// Exact-set comparison against another collection of pairs.
    ///
    /// True only when `other` holds exactly the same pairs: no missing pair,
    /// no extra pair.
    pub fn matches_exactly<'a, I>(&self, other: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut seen = 0usize;
        for (name, value) in other {
            if self.get(name) != Some(value) {
                return false;
            }
            seen += 1;
        }
        seen == self.pairs.len()
    }
}

impl core::fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, p) in self.pairs.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", p.name, p.value)?;
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, String>> for AttributeSet {
    type Error = DomainError;

    fn try_from(value: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttributeSet> for BTreeMap<String, String> {
    fn from(value: AttributeSet) -> Self {
        value
            .pairs
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_medium() -> AttributeSet {
        AttributeSet::new([("size", "M"), ("color", "red")]).unwrap()
    }

    #[test]
    fn pairs_are_sorted_by_name() {
        let set = red_medium();
        assert_eq!(set.names(), vec!["color", "size"]);
        assert_eq!(set.values(), vec!["red", "M"]);
        assert_eq!(set.to_string(), "color=red,size=M");
    }

    #[test]
    fn order_of_construction_does_not_matter() {
        let other = AttributeSet::new([("color", "red"), ("size", "M")]).unwrap();
        assert_eq!(red_medium(), other);
    }

    #[test]
    fn empty_set_is_rejected() {
        let pairs: Vec<(String, String)> = vec![];
        assert!(matches!(AttributeSet::new(pairs), Err(DomainError::Validation(_))));
    }

    #[test]
    fn blank_names_and_values_are_rejected() {
        assert!(AttributeSet::new([("  ", "red")]).is_err());
        assert!(AttributeSet::new([("color", " ")]).is_err());
    }

    #[test]
    fn duplicate_attribute_is_rejected() {
        let err = AttributeSet::new([("color", "red"), (" color", "blue")]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn exact_match_requires_same_pairs() {
        let set = red_medium();
        assert!(set.matches_exactly([("size", "M"), ("color", "red")]));
        assert!(!set.matches_exactly([("color", "red")]));
        assert!(!set.matches_exactly([("color", "red"), ("size", "M"), ("fit", "slim")]));
        assert!(!set.matches_exactly([("color", "blue"), ("size", "M")]));
    }

    #[test]
    fn deserializes_from_json_object() {
        let set: AttributeSet = serde_json::from_str(r#"{"color":"red","size":"M"}"#).unwrap();
        assert_eq!(set, red_medium());
        assert!(serde_json::from_str::<AttributeSet>("{}").is_err());
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!({"color": "red", "size": "M"})
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any permutation of the same pairs builds an equal set.
            #[test]
            fn permutation_invariant(
                map in prop::collection::btree_map("[a-z]{1,8}", "[A-Za-z0-9]{1,8}", 1..6)
            ) {
                let forward = AttributeSet::new(map.clone()).unwrap();
                let reversed = AttributeSet::new(map.clone().into_iter().rev()).unwrap();
                prop_assert_eq!(&forward, &reversed);
                prop_assert_eq!(forward.len(), map.len());
                prop_assert!(forward.matches_exactly(map.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
            }
        }
    }
}
