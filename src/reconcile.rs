//! Derives consumed amounts per allocation from the ledger.
//!
//! Every pass is a full recomputation over all active entries and their line
//! items. Nothing is carried between passes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    codec::Amount,
    domain::{Allocation, AllocationIndex, LedgerEntry},
};

/// Consumed amount per allocation key.
pub type ConsumedMap = BTreeMap<String, Amount>;

/// Whether backend-supplied consumed amounts are kept or replaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Keep a non-null supplied amount untouched.
    #[default]
    TrustSupplied,
    /// Recompute every allocation from the ledger.
    AlwaysRecompute,
}

/// Reconciles with [`ReconcilePolicy::TrustSupplied`].
pub fn reconcile(allocations: &[Allocation], entries: &[LedgerEntry]) -> ConsumedMap {
    reconcile_with(allocations, entries, ReconcilePolicy::TrustSupplied)
}

pub fn reconcile_with(
    allocations: &[Allocation],
    entries: &[LedgerEntry],
    policy: ReconcilePolicy,
) -> ConsumedMap {
    let recomputed = recompute(allocations, entries);
    let mut consumed = ConsumedMap::new();
    for allocation in allocations {
        if consumed.contains_key(&allocation.key) {
            continue;
        }
        let value = match (policy, allocation.consumed) {
            (ReconcilePolicy::TrustSupplied, Some(supplied)) => supplied,
            _ => recomputed
                .get(allocation.key.as_str())
                .copied()
                .unwrap_or(0),
        };
        consumed.insert(allocation.key.clone(), value);
    }
    consumed
}

/// Sums recomputed line item totals of active entries per resolvable key.
/// Items whose key matches no allocation are skipped.
fn recompute<'a>(
    allocations: &'a [Allocation],
    entries: &[LedgerEntry],
) -> HashMap<&'a str, Amount> {
    let index = AllocationIndex::new(allocations);
    let mut sums: HashMap<&'a str, Amount> = HashMap::new();
    for entry in entries.iter().filter(|entry| entry.is_active()) {
        for item in &entry.items {
            let Some(allocation) = index.resolve(&item.allocation_key) else {
                continue;
            };
            let slot = sums.entry(allocation.key.as_str()).or_insert(0);
            *slot = slot.saturating_add(item.total());
        }
    }
    sums
}

/// A backend-supplied amount that disagrees with the local recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub key: String,
    pub supplied: Amount,
    pub recomputed: Amount,
}

/// Lists allocations whose supplied consumed amount differs from the ledger.
pub fn audit(allocations: &[Allocation], entries: &[LedgerEntry]) -> Vec<Discrepancy> {
    let recomputed = recompute(allocations, entries);
    let index = AllocationIndex::new(allocations);
    allocations
        .iter()
        .filter(|allocation| {
            index
                .resolve(&allocation.key)
                .is_some_and(|first| std::ptr::eq(first, *allocation))
        })
        .filter_map(|allocation| {
            let supplied = allocation.consumed?;
            let local = recomputed
                .get(allocation.key.as_str())
                .copied()
                .unwrap_or(0);
            (supplied != local).then(|| Discrepancy {
                key: allocation.key.clone(),
                supplied,
                recomputed: local,
            })
        })
        .collect()
}
