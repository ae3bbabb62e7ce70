//! Expenditure requests (ledger entries) and the line items they carry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{de_amount, Amount};

/// Prefix marking ids minted on this client that no backend has confirmed.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Prefix for ids given to local rows that were stored without one.
pub const LEGACY_LOCAL_PREFIX: &str = "local-legacy-";

/// Generates a fresh client-side entry id.
pub fn local_entry_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    #[default]
    Active,
    Deleted,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryStatus::Active => "ACTIVE",
            EntryStatus::Deleted => "DELETED",
        };
        f.write_str(label)
    }
}

/// A single purchased item, charged to one allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "budgetName", default)]
    pub allocation_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub spec: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub qty: Amount,
    #[serde(default, deserialize_with = "de_amount")]
    pub price: Amount,
    #[serde(default, deserialize_with = "de_amount")]
    pub shipping: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Total as it was last written. Informational only; see [`LineItem::total`].
    #[serde(rename = "total", default, deserialize_with = "de_amount")]
    pub stored_total: Amount,
}

impl LineItem {
    pub fn new(
        allocation_key: impl Into<String>,
        name: impl Into<String>,
        qty: Amount,
        price: Amount,
        shipping: Amount,
    ) -> Self {
        let mut item = Self {
            allocation_key: allocation_key.into(),
            name: name.into(),
            spec: String::new(),
            qty,
            price,
            shipping,
            vendor: None,
            stored_total: 0,
        };
        item.stored_total = item.total();
        item
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = spec.into();
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// `qty × price`, before shipping.
    pub fn goods_total(&self) -> Amount {
        self.qty.saturating_mul(self.price)
    }

    /// `qty × price + shipping`, always derived from the raw fields.
    pub fn total(&self) -> Amount {
        self.goods_total().saturating_add(self.shipping)
    }
}

/// Wire shape that also carries the derived `itemTotal` field.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LineItemWire<'a> {
    budget_name: &'a str,
    name: &'a str,
    spec: &'a str,
    qty: Amount,
    price: Amount,
    item_total: Amount,
    shipping: Amount,
    total: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<&'a str>,
}

fn serialize_items<S>(items: &[LineItem], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(&LineItemWire {
            budget_name: &item.allocation_key,
            name: &item.name,
            spec: &item.spec,
            qty: item.qty,
            price: item.price,
            item_total: item.goods_total(),
            shipping: item.shipping,
            total: item.total(),
            vendor: item.vendor.as_deref(),
        })?;
    }
    seq.end()
}

/// One submitted expenditure request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Empty when the stored row had none; see [`assign_missing_ids`].
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub doc_name: String,
    #[serde(rename = "date", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, serialize_with = "serialize_items")]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "de_amount")]
    pub total_amount: Amount,
    #[serde(default)]
    pub status: EntryStatus,
}

impl LedgerEntry {
    pub fn new(doc_name: impl Into<String>, items: Vec<LineItem>) -> Self {
        let mut entry = Self {
            id: local_entry_id(),
            doc_name: doc_name.into(),
            created_at: Utc::now(),
            items,
            total_amount: 0,
            status: EntryStatus::Active,
        };
        entry.refresh_totals();
        entry
    }

    /// Sum of the recomputed line item totals.
    pub fn total(&self) -> Amount {
        self.items
            .iter()
            .fold(0, |acc: Amount, item| acc.saturating_add(item.total()))
    }

    /// Rewrites the stored totals from the raw quantities and prices.
    pub fn refresh_totals(&mut self) {
        for item in &mut self.items {
            item.stored_total = item.total();
        }
        self.total_amount = self.total();
    }

    pub fn is_active(&self) -> bool {
        self.status == EntryStatus::Active
    }

    /// True while the id was minted locally and never replaced by a backend id.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    /// Applies the fields present in `patch`, keeping the rest.
    pub fn merged(&self, patch: &EntryPatch) -> Self {
        let mut next = self.clone();
        if let Some(doc_name) = &patch.doc_name {
            next.doc_name = doc_name.clone();
        }
        if let Some(items) = &patch.items {
            next.items = items.clone();
        }
        next.refresh_totals();
        next
    }

    /// Minimal record naming only the entry, used for deletions.
    pub fn tombstone(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_name: String::new(),
            created_at: Utc::now(),
            items: Vec::new(),
            total_amount: 0,
            status: EntryStatus::Deleted,
        }
    }
}

/// Gives every id-less row `<prefix><position>`. Positions only change when
/// rows are removed, and stores never remove rows, so the ids are stable
/// across reads. Returns whether any row was changed.
pub fn assign_missing_ids(entries: &mut [LedgerEntry], prefix: &str) -> bool {
    let mut changed = false;
    for (idx, entry) in entries.iter_mut().enumerate() {
        if entry.id.trim().is_empty() {
            entry.id = format!("{prefix}{idx}");
            changed = true;
        }
    }
    changed
}

/// Partial replacement for an existing entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
}
