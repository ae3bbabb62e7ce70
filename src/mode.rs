//! Chooses between the remote and the local backend for a session.

use std::fmt;

use tracing::{info, warn};

use crate::{config::Config, errors::LedgerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Remote,
    Local,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mode::Remote => "REMOTE",
            Mode::Local => "LOCAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InitialLoad,
    Settled,
}

/// Two-state machine: starts REMOTE when an endpoint is configured, may drop
/// to LOCAL once while the session is loading, and never goes back.
#[derive(Debug, Clone)]
pub struct ModeSelector {
    mode: Mode,
    phase: Phase,
    fallback_cause: Option<String>,
}

impl ModeSelector {
    pub fn new(remote_configured: bool) -> Self {
        let mode = if remote_configured {
            Mode::Remote
        } else {
            Mode::Local
        };
        info!(%mode, "selected initial backend mode");
        Self {
            mode,
            phase: Phase::InitialLoad,
            fallback_cause: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.remote_endpoint().is_some())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Writes land in the client-local store instead of the authoritative one.
    pub fn writes_mocked(&self) -> bool {
        self.mode == Mode::Local
    }

    pub fn fell_back(&self) -> bool {
        self.fallback_cause.is_some()
    }

    pub fn fallback_cause(&self) -> Option<&str> {
        self.fallback_cause.as_deref()
    }

    /// Switches REMOTE to LOCAL after a failed initial load. Returns whether
    /// the switch happened; outside the initial load this is a no-op.
    pub fn fall_back(&mut self, cause: &LedgerError) -> bool {
        if self.phase != Phase::InitialLoad || self.mode != Mode::Remote {
            return false;
        }
        warn!(error = %cause, "remote load failed, falling back to local store");
        self.mode = Mode::Local;
        self.fallback_cause = Some(cause.to_string());
        true
    }

    /// Ends the initial load; the mode is fixed from here on.
    pub fn settle(&mut self) {
        self.phase = Phase::Settled;
    }
}
