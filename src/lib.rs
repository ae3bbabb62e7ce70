#![doc(test(attr(deny(warnings))))]

//! Allotment tracks spending against a fixed set of budget allocations.
//!
//! Allocations and the expenditure ledger live either in a remote backend or
//! in a local JSON store. A [`coordinator::Coordinator`] picks the backend,
//! loads a [`session::Session`] and runs every write through the backend
//! before touching in-memory state.

pub mod cli;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod errors;
pub mod export;
pub mod mode;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod utils;
pub mod validation;

use std::sync::Once;

pub use coordinator::Coordinator;
pub use errors::{LedgerError, Result};
pub use session::{Session, ViewState};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing once per process.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!("allotment tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
    }
}
