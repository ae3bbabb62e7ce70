//! Read model handed to document exporters: an entry with every line item
//! joined to the allocation it is charged to.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    codec::Amount,
    domain::{Allocation, AllocationIndex, EntryStatus, LedgerEntry, LineItem},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationMeta {
    pub key: String,
    pub category: String,
    pub sub_category: String,
    pub authorized: Amount,
}

impl From<&Allocation> for AllocationMeta {
    fn from(allocation: &Allocation) -> Self {
        Self {
            key: allocation.key.clone(),
            category: allocation.category.clone(),
            sub_category: allocation.sub_category.clone(),
            authorized: allocation.authorized,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLineItem {
    pub allocation_key: String,
    pub name: String,
    pub spec: String,
    pub qty: Amount,
    pub price: Amount,
    pub shipping: Amount,
    pub total: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// `None` when the key no longer names an allocation.
    pub allocation: Option<AllocationMeta>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntry {
    pub id: String,
    pub doc_name: String,
    pub created_at: DateTime<Utc>,
    pub status: EntryStatus,
    pub total_amount: Amount,
    pub items: Vec<ResolvedLineItem>,
}

/// One row of the purchase request sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRow {
    pub seq: usize,
    pub name: String,
    pub spec: String,
    pub qty: Amount,
    pub price: Amount,
    pub total: Amount,
}

pub fn resolve_entry(entry: &LedgerEntry, allocations: &[Allocation]) -> ResolvedEntry {
    let index = AllocationIndex::new(allocations);
    ResolvedEntry {
        id: entry.id.clone(),
        doc_name: entry.doc_name.clone(),
        created_at: entry.created_at,
        status: entry.status,
        total_amount: entry.total(),
        items: entry
            .items
            .iter()
            .map(|item| resolve_item(item, &index))
            .collect(),
    }
}

fn resolve_item(item: &LineItem, index: &AllocationIndex<'_>) -> ResolvedLineItem {
    ResolvedLineItem {
        allocation_key: item.allocation_key.clone(),
        name: item.name.clone(),
        spec: item.spec.clone(),
        qty: item.qty,
        price: item.price,
        shipping: item.shipping,
        total: item.total(),
        vendor: item.vendor.clone(),
        allocation: index.resolve(&item.allocation_key).map(AllocationMeta::from),
    }
}

impl ResolvedEntry {
    /// Request sheet rows, numbered from 1, totals including shipping.
    pub fn request_rows(&self) -> Vec<RequestRow> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| RequestRow {
                seq: idx + 1,
                name: item.name.clone(),
                spec: item.spec.clone(),
                qty: item.qty,
                price: item.price,
                total: item.total,
            })
            .collect()
    }

    pub fn unresolved_keys(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.allocation.is_none())
            .map(|item| item.allocation_key.as_str())
            .collect()
    }
}
