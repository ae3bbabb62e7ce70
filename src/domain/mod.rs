//! Allocation and ledger models, shared by every backend.

pub mod allocation;
pub mod entry;

pub use allocation::{duplicate_keys, Allocation, AllocationIndex};
pub use entry::{
    assign_missing_ids, local_entry_id, EntryPatch, EntryStatus, LedgerEntry, LineItem,
    LEGACY_LOCAL_PREFIX, LOCAL_ID_PREFIX,
};
