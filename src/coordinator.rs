//! Session start-up, reconciliation passes and the write protocol.
//!
//! Writes go to the backend first. In-memory state is only touched once the
//! backend has accepted the change, so a failed write leaves the session as
//! it was. Creates patch the consumed amounts in place; updates and deletes
//! leave them stale until the next [`Coordinator::refresh`].

use std::path::Path;

use tracing::{info, warn};

use crate::{
    config::Config,
    domain::{Allocation, EntryPatch, LedgerEntry},
    errors::{LedgerError, Result},
    mode::{Mode, ModeSelector},
    reconcile::{audit, reconcile_with, ConsumedMap, ReconcilePolicy},
    session::Session,
    store::{BackendKind, HttpTransport, LedgerStore, LocalStore, Mutation, RemoteStore},
    validation::{validate_allocations, validate_entry, validate_patch},
};

struct Snapshot {
    allocations: Vec<Allocation>,
    entries: Vec<LedgerEntry>,
    consumed: ConsumedMap,
}

/// Owns the backend chosen for the session and runs every operation on it.
pub struct Coordinator {
    selector: ModeSelector,
    store: Box<dyn LedgerStore>,
    policy: ReconcilePolicy,
}

impl Coordinator {
    /// Builds the stores described by `config` and starts a session.
    pub fn from_config(config: &Config, home: &Path) -> Result<(Self, Session)> {
        let local = LocalStore::new(config.resolve_data_dir(home))?;
        let remote = match config.remote_endpoint() {
            Some(endpoint) => {
                let transport = HttpTransport::new(endpoint, config.request_timeout())?;
                Some(Box::new(RemoteStore::new(Box::new(transport))) as Box<dyn LedgerStore>)
            }
            None => None,
        };
        Self::start(remote, Box::new(local), config.reconcile_policy)
    }

    /// Performs the initial load. A failing remote backend is replaced by
    /// `local` for the rest of the session; errors from `local` propagate.
    pub fn start(
        remote: Option<Box<dyn LedgerStore>>,
        local: Box<dyn LedgerStore>,
        policy: ReconcilePolicy,
    ) -> Result<(Self, Session)> {
        let mut selector = ModeSelector::new(remote.is_some());
        let (store, snapshot) = match remote {
            Some(remote) => match load(remote.as_ref(), policy) {
                Ok(snapshot) => (remote, snapshot),
                Err(err) => {
                    selector.fall_back(&err);
                    let snapshot = load(local.as_ref(), policy)?;
                    (local, snapshot)
                }
            },
            None => {
                let snapshot = load(local.as_ref(), policy)?;
                (local, snapshot)
            }
        };
        selector.settle();
        info!(
            mode = %selector.mode(),
            allocations = snapshot.allocations.len(),
            entries = snapshot.entries.len(),
            "session started"
        );
        let session = Session::new(
            selector.mode(),
            snapshot.allocations,
            snapshot.entries,
            snapshot.consumed,
        );
        let coordinator = Self {
            selector,
            store,
            policy,
        };
        Ok((coordinator, session))
    }

    pub fn mode(&self) -> Mode {
        self.selector.mode()
    }

    pub fn selector(&self) -> &ModeSelector {
        &self.selector
    }

    pub fn writes_mocked(&self) -> bool {
        self.selector.writes_mocked()
    }

    /// Pings the active backend with the `test` action.
    pub fn test_connection(&self) -> Result<()> {
        self.store.test_connection()
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Full reconciliation pass: refetches everything and recomputes the
    /// consumed amounts. On failure the session is left untouched.
    pub fn refresh(&self, session: &mut Session) -> Result<()> {
        let snapshot = load(self.store.as_ref(), self.policy)?;
        session.replace(snapshot.allocations, snapshot.entries, snapshot.consumed);
        Ok(())
    }

    /// Validates and writes a new entry, then adds its line totals to the
    /// in-memory consumed amounts. Returns the entry as stored.
    pub fn submit(&self, session: &mut Session, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        validate_entry(&entry, session.allocations())?;
        entry.refresh_totals();
        let stored = self.store.append_or_mutate(&entry, Mutation::Create)?;
        info!(id = %stored.id, total = stored.total(), "submitted ledger entry");
        session.apply_created(stored.clone());
        Ok(stored)
    }

    /// Replaces fields of an existing entry. Consumed amounts are not
    /// adjusted; call [`Coordinator::refresh`] afterwards.
    pub fn update(&self, session: &mut Session, id: &str, patch: &EntryPatch) -> Result<LedgerEntry> {
        let current = session
            .entry(id)
            .ok_or_else(|| LedgerError::UnknownEntry(id.to_string()))?;
        let merged = current.merged(patch);
        validate_patch(&merged, patch, session.allocations())?;
        let stored = self.store.append_or_mutate(&merged, Mutation::Update)?;
        info!(id = %stored.id, "updated ledger entry");
        session.apply_updated(stored.clone());
        Ok(stored)
    }

    /// Soft-deletes an entry. Consumed amounts are not adjusted; call
    /// [`Coordinator::refresh`] afterwards.
    pub fn delete(&self, session: &mut Session, id: &str) -> Result<()> {
        if session.entry(id).is_none() {
            return Err(LedgerError::UnknownEntry(id.to_string()));
        }
        self.store
            .append_or_mutate(&LedgerEntry::tombstone(id), Mutation::Delete)?;
        info!(id, "deleted ledger entry");
        session.apply_deleted(id);
        Ok(())
    }

    /// Replaces the allocation list wholesale and reconciles against it.
    pub fn import_allocations(
        &self,
        session: &mut Session,
        allocations: Vec<Allocation>,
    ) -> Result<()> {
        for key in validate_allocations(&allocations)? {
            warn!(key = %key, "allocation label appears more than once; the first row is charged");
        }
        let allocations: Vec<Allocation> = allocations
            .into_iter()
            .map(|mut allocation| {
                allocation.consumed = None;
                allocation
            })
            .collect();
        self.store.persist_allocations(&allocations)?;
        info!(count = allocations.len(), "imported allocations");
        session.apply_imported(allocations);
        self.refresh(session)
    }

    /// Asks the backend to render the request document for an entry.
    pub fn generate_document(&self, session: &Session, id: &str) -> Result<Option<String>> {
        let resolved = session
            .resolve(id)
            .ok_or_else(|| LedgerError::UnknownEntry(id.to_string()))?;
        self.store.generate_document(&resolved)
    }
}

fn load(store: &dyn LedgerStore, policy: ReconcilePolicy) -> Result<Snapshot> {
    let allocations = store.fetch_allocations()?;
    let entries = store.fetch_ledger()?;
    if store.kind() == BackendKind::Remote {
        for discrepancy in audit(&allocations, &entries) {
            warn!(
                key = %discrepancy.key,
                supplied = discrepancy.supplied,
                recomputed = discrepancy.recomputed,
                "backend consumed amount differs from the ledger"
            );
        }
    }
    let consumed = reconcile_with(&allocations, &entries, policy);
    Ok(Snapshot {
        allocations,
        entries,
        consumed,
    })
}
