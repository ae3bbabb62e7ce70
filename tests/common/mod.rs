#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use allotment_core::{
    domain::{Allocation, LedgerEntry, LineItem},
    errors::{LedgerError, Result},
    store::{LedgerStore, LocalStore, RemoteAction, RemoteRequest, RemoteStore, Transport},
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Keeps TempDir guards alive until the test binary exits.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn local_store() -> LocalStore {
    LocalStore::new(temp_dir().join("local")).expect("create local store")
}

pub fn office_allocations() -> Vec<Allocation> {
    vec![
        Allocation::new("A1", 1_000_000).with_categories("운영비", "사무용품비"),
        Allocation::new("B2", 300_000).with_categories("운영비", "인쇄비"),
    ]
}

pub fn paper_request() -> LedgerEntry {
    LedgerEntry::new(
        "4월 사무용품",
        vec![LineItem::new("A1", "Paper", 2, 1000, 500).with_spec("A4")],
    )
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub allocations: Vec<Value>,
    pub history: Vec<Value>,
    pub calls: Vec<RemoteRequest>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    next_row: usize,
}

/// In-memory stand-in for the remote backend, speaking its JSON shapes.
/// Clones share state so a test can inspect what the store sent.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocations(self, rows: Vec<Value>) -> Self {
        self.state().allocations = rows;
        self
    }

    pub fn with_history(self, rows: Vec<Value>) -> Self {
        self.state().history = rows;
        self
    }

    pub fn unreachable(self) -> Self {
        self.state().fail_reads = true;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend lock")
    }

    pub fn actions(&self) -> Vec<RemoteAction> {
        self.state().calls.iter().map(|call| call.action).collect()
    }

    pub fn store(&self) -> Box<dyn LedgerStore> {
        Box::new(RemoteStore::new(Box::new(self.clone())))
    }
}

impl Transport for FakeBackend {
    fn call(&self, request: &RemoteRequest) -> Result<Value> {
        let mut state = self.state();
        state.calls.push(request.clone());
        let action = request.action;
        let failing = if action.is_read() {
            state.fail_reads
        } else {
            state.fail_writes
        };
        if failing {
            return Err(LedgerError::transport(action.as_str(), "connection refused"));
        }
        let payload = request.payload.clone().unwrap_or(Value::Null);
        let reply = match action {
            RemoteAction::Test => json!({ "success": true }),
            // Legacy shape: a bare array without the envelope.
            RemoteAction::GetBudget => Value::Array(state.allocations.clone()),
            RemoteAction::GetHistory => json!({ "success": true, "data": state.history }),
            RemoteAction::SaveBudget => {
                state.allocations = payload.as_array().cloned().unwrap_or_default();
                json!({ "success": true })
            }
            RemoteAction::SubmitExpenditure => {
                state.next_row += 1;
                let id = format!("row-{}", state.next_row);
                let mut row = payload;
                row["id"] = json!(id);
                state.history.push(row);
                json!({ "success": true, "id": id })
            }
            RemoteAction::UpdateHistory => {
                let id = payload["id"].clone();
                match state.history.iter_mut().find(|row| row["id"] == id) {
                    Some(row) => {
                        *row = payload;
                        json!({ "success": true })
                    }
                    None => json!({ "success": false, "error": "no such row" }),
                }
            }
            RemoteAction::DeleteHistory => {
                let id = payload["id"].clone();
                for row in state.history.iter_mut().filter(|row| row["id"] == id) {
                    row["status"] = json!("DELETED");
                }
                json!({ "success": true })
            }
            RemoteAction::GeneratePdf => {
                json!({ "success": true, "url": format!("https://docs.example/{}.pdf", payload["id"].as_str().unwrap_or("x")) })
            }
        };
        Ok(reply)
    }
}
