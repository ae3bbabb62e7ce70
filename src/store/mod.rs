//! Persistence of allocations and ledger entries behind one interface.
//!
//! Two implementations exist: [`RemoteStore`] talks to the authoritative
//! backend through a [`Transport`], [`LocalStore`] keeps two JSON records on
//! the local disk. The session picks one per run and never inspects which.

pub mod local;
pub mod remote;
pub mod transport;

use std::fmt;

use crate::{
    domain::{Allocation, LedgerEntry},
    errors::{LedgerError, Result},
    export::ResolvedEntry,
};

pub use local::{LocalStore, ALLOCATIONS_RECORD, LEDGER_RECORD};
pub use remote::{RemoteAction, RemoteStore, LEGACY_REMOTE_PREFIX};
pub use transport::{HttpTransport, RemoteRequest, Transport};

/// Kind of change applied to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mutation::Create => "CREATE",
            Mutation::Update => "UPDATE",
            Mutation::Delete => "DELETE",
        };
        f.write_str(label)
    }
}

/// Which family of backend a store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

/// Abstraction over the backends that own allocations and the ledger.
pub trait LedgerStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Checks that the backend answers. Local stores always do.
    fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn fetch_allocations(&self) -> Result<Vec<Allocation>>;

    /// Replaces the stored allocations wholesale.
    fn persist_allocations(&self, allocations: &[Allocation]) -> Result<()>;

    fn fetch_ledger(&self) -> Result<Vec<LedgerEntry>>;

    /// Writes one ledger change and returns the entry as the backend now
    /// knows it (a create may come back with a backend-assigned id).
    fn append_or_mutate(&self, entry: &LedgerEntry, mutation: Mutation) -> Result<LedgerEntry>;

    /// Asks the backend to render a request document; returns its location.
    fn generate_document(&self, entry: &ResolvedEntry) -> Result<Option<String>> {
        let _ = entry;
        Err(LedgerError::Unsupported(
            "document generation needs the remote backend".into(),
        ))
    }
}
