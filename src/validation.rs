//! Checks run before any write reaches a backend.

use crate::{
    domain::{duplicate_keys, Allocation, AllocationIndex, EntryPatch, LedgerEntry},
    errors::{LedgerError, Result},
};

/// Rejects entries that could not be attributed to the current allocations.
/// Quantities, prices and shipping must be non-negative.
pub fn validate_entry(entry: &LedgerEntry, allocations: &[Allocation]) -> Result<()> {
    validate_doc_name(&entry.doc_name)?;
    if entry.items.is_empty() {
        return Err(LedgerError::validation(
            "a request needs at least one line item",
        ));
    }
    let index = AllocationIndex::new(allocations);
    for (idx, item) in entry.items.iter().enumerate() {
        let line = idx + 1;
        if item.name.trim().is_empty() {
            return Err(LedgerError::validation(format!(
                "line {line}: item name is required"
            )));
        }
        if item.allocation_key.trim().is_empty() {
            return Err(LedgerError::validation(format!(
                "line {line}: choose an allocation"
            )));
        }
        if !index.contains(&item.allocation_key) {
            return Err(LedgerError::validation(format!(
                "line {line}: unknown allocation `{}`",
                item.allocation_key
            )));
        }
        if item.qty < 0 || item.price < 0 || item.shipping < 0 {
            return Err(LedgerError::validation(format!(
                "line {line}: quantity, price and shipping must not be negative"
            )));
        }
    }
    Ok(())
}

/// Checks only what `patch` replaces on `merged`. Line items kept from the
/// stored entry may name allocations that no longer exist.
pub fn validate_patch(
    merged: &LedgerEntry,
    patch: &EntryPatch,
    allocations: &[Allocation],
) -> Result<()> {
    if patch.items.is_some() {
        return validate_entry(merged, allocations);
    }
    validate_doc_name(&merged.doc_name)
}

fn validate_doc_name(doc_name: &str) -> Result<()> {
    if doc_name.trim().is_empty() {
        return Err(LedgerError::validation("document name is required"));
    }
    Ok(())
}

/// Rejects unusable allocation lists and returns labels that occur twice,
/// which are accepted but only the first of them is ever charged.
pub fn validate_allocations(allocations: &[Allocation]) -> Result<Vec<String>> {
    for (idx, allocation) in allocations.iter().enumerate() {
        if allocation.key.trim().is_empty() {
            return Err(LedgerError::validation(format!(
                "allocation row {} has no label",
                idx + 1
            )));
        }
        if allocation.authorized < 0 {
            return Err(LedgerError::validation(format!(
                "allocation `{}` has a negative authorized amount",
                allocation.key
            )));
        }
    }
    Ok(duplicate_keys(allocations))
}
