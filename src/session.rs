//! In-memory view of one session: the allocations, the cached ledger and the
//! consumed amounts derived from them.

use crate::{
    codec::Amount,
    domain::{Allocation, EntryStatus, LedgerEntry},
    export::{resolve_entry, ResolvedEntry},
    mode::Mode,
    reconcile::ConsumedMap,
};

/// How far the consumed amounts can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Produced by a full reconciliation pass.
    Reconciled,
    /// Reconciled, then patched in place after a submit.
    Optimistic,
    /// A write happened that the amounts do not reflect; refresh before use.
    Stale,
}

/// Used/remaining figures for one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationStatus {
    pub key: String,
    pub category: String,
    pub sub_category: String,
    pub authorized: Amount,
    pub consumed: Amount,
    pub remaining: Amount,
}

impl AllocationStatus {
    pub fn over_budget(&self) -> bool {
        self.consumed > self.authorized
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub authorized: Amount,
    pub consumed: Amount,
    pub remaining: Amount,
}

/// Session context owned by the caller and passed to every
/// [`Coordinator`](crate::coordinator::Coordinator) operation.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    allocations: Vec<Allocation>,
    entries: Vec<LedgerEntry>,
    consumed: ConsumedMap,
    view: ViewState,
    cursor: usize,
}

impl Session {
    pub(crate) fn new(
        mode: Mode,
        allocations: Vec<Allocation>,
        entries: Vec<LedgerEntry>,
        consumed: ConsumedMap,
    ) -> Self {
        Self {
            mode,
            allocations,
            entries,
            consumed,
            view: ViewState::Reconciled,
            cursor: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Every cached entry, deleted ones included.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|entry| entry.is_active())
    }

    pub fn entry(&self, id: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn consumed_map(&self) -> &ConsumedMap {
        &self.consumed
    }

    pub fn consumed(&self, key: &str) -> Option<Amount> {
        self.consumed.get(key).copied()
    }

    pub fn remaining(&self, key: &str) -> Option<Amount> {
        let allocation = self.allocations.iter().find(|a| a.key == key)?;
        let consumed = self.consumed(key).unwrap_or(0);
        Some(allocation.authorized.saturating_sub(consumed))
    }

    /// One row per allocation, in allocation order.
    pub fn status_rows(&self) -> Vec<AllocationStatus> {
        self.allocations
            .iter()
            .map(|allocation| self.status_for(allocation))
            .collect()
    }

    fn status_for(&self, allocation: &Allocation) -> AllocationStatus {
        let consumed = self.consumed(&allocation.key).unwrap_or(0);
        AllocationStatus {
            key: allocation.key.clone(),
            category: allocation.category.clone(),
            sub_category: allocation.sub_category.clone(),
            authorized: allocation.authorized,
            consumed,
            remaining: allocation.authorized.saturating_sub(consumed),
        }
    }

    pub fn totals(&self) -> Totals {
        self.status_rows()
            .iter()
            .fold(Totals::default(), |acc, row| Totals {
                authorized: acc.authorized.saturating_add(row.authorized),
                consumed: acc.consumed.saturating_add(row.consumed),
                remaining: acc.remaining.saturating_add(row.remaining),
            })
    }

    pub fn resolve(&self, id: &str) -> Option<ResolvedEntry> {
        self.entry(id)
            .map(|entry| resolve_entry(entry, &self.allocations))
    }

    /// The allocation under the single-item cursor.
    pub fn current(&self) -> Option<AllocationStatus> {
        self.allocations
            .get(self.cursor)
            .map(|allocation| self.status_for(allocation))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor forward, wrapping to the first allocation.
    pub fn next(&mut self) -> Option<AllocationStatus> {
        let len = self.allocations.len();
        if len == 0 {
            return None;
        }
        self.cursor = (self.cursor + 1) % len;
        self.current()
    }

    /// Moves the cursor back, wrapping to the last allocation.
    pub fn previous(&mut self) -> Option<AllocationStatus> {
        let len = self.allocations.len();
        if len == 0 {
            return None;
        }
        self.cursor = (self.cursor + len - 1) % len;
        self.current()
    }

    pub(crate) fn replace(
        &mut self,
        allocations: Vec<Allocation>,
        entries: Vec<LedgerEntry>,
        consumed: ConsumedMap,
    ) {
        self.allocations = allocations;
        self.entries = entries;
        self.consumed = consumed;
        self.view = ViewState::Reconciled;
        if self.cursor >= self.allocations.len() {
            self.cursor = 0;
        }
    }

    /// Adds a just-created entry to the view without a reconciliation pass.
    pub(crate) fn apply_created(&mut self, entry: LedgerEntry) {
        for item in &entry.items {
            if let Some(slot) = self.consumed.get_mut(&item.allocation_key) {
                *slot = slot.saturating_add(item.total());
            }
        }
        self.entries.push(entry);
        if self.view == ViewState::Reconciled {
            self.view = ViewState::Optimistic;
        }
    }

    pub(crate) fn apply_updated(&mut self, entry: LedgerEntry) {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.id == entry.id) {
            *slot = entry;
        }
        self.view = ViewState::Stale;
    }

    pub(crate) fn apply_deleted(&mut self, id: &str) {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.id == id) {
            slot.status = EntryStatus::Deleted;
        }
        self.view = ViewState::Stale;
    }

    pub(crate) fn apply_imported(&mut self, allocations: Vec<Allocation>) {
        self.consumed = allocations
            .iter()
            .map(|allocation| (allocation.key.clone(), 0))
            .collect();
        self.allocations = allocations;
        self.cursor = 0;
        self.view = ViewState::Stale;
    }
}
