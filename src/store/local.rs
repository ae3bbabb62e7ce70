//! Client-local fallback backend: two JSON records in one directory.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{
    domain::{assign_missing_ids, Allocation, EntryStatus, LedgerEntry, LEGACY_LOCAL_PREFIX},
    errors::{LedgerError, Result},
    utils::fs::write_atomic,
};

use super::{BackendKind, LedgerStore, Mutation};

pub const ALLOCATIONS_RECORD: &str = "local_budget_data";
pub const LEDGER_RECORD: &str = "local_history";
const RECORD_EXTENSION: &str = "json";

/// Stores allocations and ledger entries as JSON arrays under stable keys.
///
/// Unreadable records are treated as empty. Every read-modify-write cycle
/// holds `write_lock`, so concurrent writers cannot interleave.
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, record: &str) -> PathBuf {
        self.dir.join(format!("{record}.{RECORD_EXTENSION}"))
    }

    fn read_record<T: DeserializeOwned>(&self, record: &str) -> Vec<T> {
        match self.try_read_record(record) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(record, error = %err, "resetting unreadable local record to empty");
                Vec::new()
            }
        }
    }

    fn try_read_record<T: DeserializeOwned>(&self, record: &str) -> Result<Vec<T>> {
        let path = self.record_path(record);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(LedgerError::CorruptState {
                    record: record.to_string(),
                    message: err.to_string(),
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).map_err(|err| LedgerError::CorruptState {
            record: record.to_string(),
            message: err.to_string(),
        })
    }

    fn write_record<T: Serialize>(&self, record: &str, rows: &[T]) -> Result<()> {
        let path = self.record_path(record);
        let json = serde_json::to_string_pretty(rows)?;
        write_atomic(&path, &json)
    }

    /// Reads the ledger, persisting ids for rows stored without one.
    /// Callers hold the write lock.
    fn read_ledger(&self) -> Vec<LedgerEntry> {
        let mut ledger: Vec<LedgerEntry> = self.read_record(LEDGER_RECORD);
        if assign_missing_ids(&mut ledger, LEGACY_LOCAL_PREFIX) {
            match self.write_record(LEDGER_RECORD, &ledger) {
                Ok(()) => debug!("assigned ids to local ledger rows stored without one"),
                Err(err) => warn!(error = %err, "could not persist assigned ledger ids"),
            }
        }
        ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // A panic mid-write leaves no partial file behind, so the guard is still usable.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LedgerStore for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn fetch_allocations(&self) -> Result<Vec<Allocation>> {
        let mut allocations: Vec<Allocation> = self.read_record(ALLOCATIONS_RECORD);
        for allocation in &mut allocations {
            allocation.consumed = None;
        }
        Ok(allocations)
    }

    fn persist_allocations(&self, allocations: &[Allocation]) -> Result<()> {
        let _guard = self.lock();
        let rows: Vec<Allocation> = allocations
            .iter()
            .cloned()
            .map(|mut allocation| {
                allocation.consumed = None;
                allocation
            })
            .collect();
        self.write_record(ALLOCATIONS_RECORD, &rows)?;
        debug!(count = rows.len(), "persisted allocations locally");
        Ok(())
    }

    fn fetch_ledger(&self) -> Result<Vec<LedgerEntry>> {
        let _guard = self.lock();
        Ok(self.read_ledger())
    }

    fn append_or_mutate(&self, entry: &LedgerEntry, mutation: Mutation) -> Result<LedgerEntry> {
        let _guard = self.lock();
        let mut ledger = self.read_ledger();
        let stored = match mutation {
            Mutation::Create => {
                let mut created = entry.clone();
                created.refresh_totals();
                created.status = EntryStatus::Active;
                ledger.push(created.clone());
                created
            }
            Mutation::Update => {
                let slot = find_entry(&mut ledger, &entry.id)?;
                let mut updated = entry.clone();
                updated.refresh_totals();
                updated.status = slot.status;
                *slot = updated.clone();
                updated
            }
            Mutation::Delete => {
                let slot = find_entry(&mut ledger, &entry.id)?;
                slot.status = EntryStatus::Deleted;
                slot.clone()
            }
        };
        self.write_record(LEDGER_RECORD, &ledger)?;
        debug!(id = %stored.id, %mutation, "wrote local ledger entry");
        Ok(stored)
    }
}

fn find_entry<'a>(ledger: &'a mut [LedgerEntry], id: &str) -> Result<&'a mut LedgerEntry> {
    ledger
        .iter_mut()
        .find(|candidate| candidate.id == id)
        .ok_or_else(|| LedgerError::UnknownEntry(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineItem;
    use tempfile::TempDir;

    fn store_with_temp_dir() -> (LocalStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let store = LocalStore::new(temp.path().join("local")).expect("local store");
        (store, temp)
    }

    #[test]
    fn missing_records_read_as_empty() {
        let (store, _guard) = store_with_temp_dir();
        assert!(store.fetch_allocations().unwrap().is_empty());
        assert!(store.fetch_ledger().unwrap().is_empty());
    }

    #[test]
    fn corrupt_records_read_as_empty() {
        let (store, _guard) = store_with_temp_dir();
        fs::write(store.record_path(ALLOCATIONS_RECORD), "{not json").unwrap();
        fs::write(store.record_path(LEDGER_RECORD), "[{\"items\": 5}]").unwrap();
        assert!(store.fetch_allocations().unwrap().is_empty());
        assert!(store.fetch_ledger().unwrap().is_empty());
    }

    #[test]
    fn allocations_never_carry_consumed_amounts() {
        let (store, _guard) = store_with_temp_dir();
        store
            .persist_allocations(&[Allocation::new("A1", 100).with_consumed(40)])
            .unwrap();
        fs::write(
            store.record_path(ALLOCATIONS_RECORD),
            r#"[{"산출내역": "A1", "예산액": 100, "used": 40}]"#,
        )
        .unwrap();
        let loaded = store.fetch_allocations().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].consumed, None);
    }

    #[test]
    fn create_update_delete_cycle() {
        let (store, _guard) = store_with_temp_dir();
        let entry = LedgerEntry::new("Doc", vec![LineItem::new("A1", "Pen", 1, 100, 0)]);
        let created = store.append_or_mutate(&entry, Mutation::Create).unwrap();
        assert_eq!(created.id, entry.id);

        let mut changed = created.clone();
        changed.doc_name = "Renamed".into();
        store.append_or_mutate(&changed, Mutation::Update).unwrap();

        store
            .append_or_mutate(&LedgerEntry::tombstone(entry.id.clone()), Mutation::Delete)
            .unwrap();

        let ledger = store.fetch_ledger().unwrap();
        assert_eq!(ledger.len(), 1, "deletion keeps the entry for audit");
        assert_eq!(ledger[0].doc_name, "Renamed");
        assert_eq!(ledger[0].status, EntryStatus::Deleted);
        assert_eq!(ledger[0].items.len(), 1);
    }

    #[test]
    fn mutating_unknown_entries_fails() {
        let (store, _guard) = store_with_temp_dir();
        let err = store
            .append_or_mutate(&LedgerEntry::tombstone("local-missing"), Mutation::Delete)
            .expect_err("unknown id must fail");
        assert!(matches!(err, LedgerError::UnknownEntry(ref id) if id == "local-missing"));
        assert!(!store.record_path(LEDGER_RECORD).exists());
    }

    #[test]
    fn rows_without_ids_get_stable_ids() {
        let (store, _guard) = store_with_temp_dir();
        fs::write(
            store.record_path(LEDGER_RECORD),
            r#"[{"docName": "old", "items": [{"budgetName": "A1", "name": "Pen", "qty": 1, "price": 10}]}]"#,
        )
        .unwrap();

        let first = store.fetch_ledger().unwrap();
        let second = store.fetch_ledger().unwrap();
        assert_eq!(first[0].id, "local-legacy-0");
        assert_eq!(first[0].id, second[0].id);
        let persisted = fs::read_to_string(store.record_path(LEDGER_RECORD)).unwrap();
        assert!(persisted.contains("local-legacy-0"));

        let deleted = store
            .append_or_mutate(&LedgerEntry::tombstone(first[0].id.clone()), Mutation::Delete)
            .unwrap();
        assert_eq!(deleted.status, EntryStatus::Deleted);
        assert!(!store.fetch_ledger().unwrap()[0].is_active());
    }

    #[test]
    fn concurrent_creates_are_all_kept() {
        let (store, _guard) = store_with_temp_dir();
        let store = std::sync::Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let entry =
                        LedgerEntry::new(format!("Doc {n}"), vec![LineItem::new("A1", "x", 1, 1, 0)]);
                    store.append_or_mutate(&entry, Mutation::Create).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.fetch_ledger().unwrap().len(), 8);
    }
}
