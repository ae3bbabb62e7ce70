//! Budget allocations and the key-based lookup used to attribute spending.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec::{de_amount, de_optional_amount, Amount};

/// One budget line. The label in `key` is its identity within a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    #[serde(rename = "산출내역", default)]
    pub key: String,
    #[serde(rename = "세부항목", default)]
    pub category: String,
    #[serde(rename = "원가통계비목", default)]
    pub sub_category: String,
    #[serde(rename = "예산액", default, deserialize_with = "de_amount")]
    pub authorized: Amount,
    /// Amount already consumed as reported by the backend, if it computes one.
    #[serde(
        rename = "used",
        default,
        deserialize_with = "de_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub consumed: Option<Amount>,
}

impl Allocation {
    pub fn new(key: impl Into<String>, authorized: Amount) -> Self {
        Self {
            key: key.into(),
            category: String::new(),
            sub_category: String::new(),
            authorized,
            consumed: None,
        }
    }

    pub fn with_categories(
        mut self,
        category: impl Into<String>,
        sub_category: impl Into<String>,
    ) -> Self {
        self.category = category.into();
        self.sub_category = sub_category.into();
        self
    }

    pub fn with_consumed(mut self, consumed: Amount) -> Self {
        self.consumed = Some(consumed);
        self
    }
}

/// Resolves allocation keys to allocations.
///
/// Allocations are matched by their human-readable label. Every lookup in the
/// crate goes through this type so the identity scheme can change in one place.
/// When labels collide the first allocation wins.
#[derive(Debug)]
pub struct AllocationIndex<'a> {
    by_key: HashMap<&'a str, &'a Allocation>,
}

impl<'a> AllocationIndex<'a> {
    pub fn new(allocations: &'a [Allocation]) -> Self {
        let mut by_key = HashMap::with_capacity(allocations.len());
        for allocation in allocations {
            by_key.entry(allocation.key.as_str()).or_insert(allocation);
        }
        Self { by_key }
    }

    pub fn resolve(&self, key: &str) -> Option<&'a Allocation> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}

/// Labels that appear on more than one allocation, in first-seen order.
pub fn duplicate_keys(allocations: &[Allocation]) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut duplicates = Vec::new();
    for allocation in allocations {
        let count = seen.entry(allocation.key.as_str()).or_insert(0usize);
        *count += 1;
        if *count == 2 {
            duplicates.push(allocation.key.clone());
        }
    }
    duplicates
}
