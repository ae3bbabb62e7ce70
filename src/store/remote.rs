//! Authoritative backend reached through a [`Transport`].

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    domain::{assign_missing_ids, Allocation, EntryStatus, LedgerEntry},
    errors::{LedgerError, Result},
    export::ResolvedEntry,
};

use super::{transport::RemoteRequest, BackendKind, LedgerStore, Mutation, Transport};

/// Prefix for positional ids given to history rows the backend sent without one.
pub const LEGACY_REMOTE_PREFIX: &str = "legacy-";

/// Action discriminators understood by the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Test,
    GetBudget,
    SaveBudget,
    SubmitExpenditure,
    UpdateHistory,
    DeleteHistory,
    GetHistory,
    GeneratePdf,
}

impl RemoteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteAction::Test => "test",
            RemoteAction::GetBudget => "getBudget",
            RemoteAction::SaveBudget => "saveBudget",
            RemoteAction::SubmitExpenditure => "submitExpenditure",
            RemoteAction::UpdateHistory => "updateHistory",
            RemoteAction::DeleteHistory => "deleteHistory",
            RemoteAction::GetHistory => "getHistory",
            RemoteAction::GeneratePdf => "generatePDF",
        }
    }

    pub fn is_read(self) -> bool {
        matches!(
            self,
            RemoteAction::Test | RemoteAction::GetBudget | RemoteAction::GetHistory
        )
    }

    fn for_mutation(mutation: Mutation) -> Self {
        match mutation {
            Mutation::Create => RemoteAction::SubmitExpenditure,
            Mutation::Update => RemoteAction::UpdateHistory,
            Mutation::Delete => RemoteAction::DeleteHistory,
        }
    }
}

/// Remote backend adapter. Each operation is exactly one round trip.
///
/// Allocations may arrive with consumed amounts already filled in by the
/// backend.
pub struct RemoteStore {
    transport: Box<dyn Transport>,
}

impl RemoteStore {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    fn call(&self, request: RemoteRequest) -> Result<Value> {
        let action = request.action;
        let body = self.transport.call(&request)?;
        debug!(action = action.as_str(), "remote call completed");
        unwrap_envelope(action, body)
    }

    fn fetch<T: DeserializeOwned>(&self, action: RemoteAction) -> Result<Vec<T>> {
        let payload = self.call(RemoteRequest::new(action))?;
        if payload.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(payload).map_err(|err| LedgerError::transport(action.as_str(), err))
    }
}

/// Strips the `{success, error, data}` envelope.
///
/// `success: false` is a failure carrying `error`. An object with `data`
/// yields that field. Anything else, including the bare arrays older
/// backends return for `getBudget`, is the payload itself.
fn unwrap_envelope(action: RemoteAction, body: Value) -> Result<Value> {
    let Value::Object(mut fields) = body else {
        return Ok(body);
    };
    if fields.get("success").and_then(Value::as_bool) == Some(false) {
        let message = fields
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("backend reported failure")
            .to_string();
        return Err(LedgerError::transport(action.as_str(), message));
    }
    if let Some(data) = fields.remove("data") {
        return Ok(data);
    }
    Ok(Value::Object(fields))
}

fn encode<T: serde::Serialize>(action: RemoteAction, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| LedgerError::transport(action.as_str(), err))
}

impl LedgerStore for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn test_connection(&self) -> Result<()> {
        self.call(RemoteRequest::new(RemoteAction::Test)).map(|_| ())
    }

    fn fetch_allocations(&self) -> Result<Vec<Allocation>> {
        self.fetch(RemoteAction::GetBudget)
    }

    fn persist_allocations(&self, allocations: &[Allocation]) -> Result<()> {
        let action = RemoteAction::SaveBudget;
        let payload = encode(action, &allocations)?;
        self.call(RemoteRequest::with_payload(action, payload))?;
        Ok(())
    }

    fn fetch_ledger(&self) -> Result<Vec<LedgerEntry>> {
        let mut ledger: Vec<LedgerEntry> = self.fetch(RemoteAction::GetHistory)?;
        if assign_missing_ids(&mut ledger, LEGACY_REMOTE_PREFIX) {
            warn!("backend history has rows without ids; they cannot be changed remotely");
        }
        Ok(ledger)
    }

    fn append_or_mutate(&self, entry: &LedgerEntry, mutation: Mutation) -> Result<LedgerEntry> {
        let action = RemoteAction::for_mutation(mutation);
        if mutation != Mutation::Create && entry.id.starts_with(LEGACY_REMOTE_PREFIX) {
            return Err(LedgerError::Unsupported(format!(
                "entry {} has no backend id and cannot be changed remotely",
                entry.id
            )));
        }
        let payload = match mutation {
            Mutation::Delete => json!({ "id": entry.id }),
            Mutation::Create | Mutation::Update => encode(action, entry)?,
        };
        let reply = self.call(RemoteRequest::with_payload(action, payload))?;
        let mut stored = entry.clone();
        match mutation {
            Mutation::Create => {
                if let Some(id) = reply.get("id").and_then(Value::as_str) {
                    stored.id = id.to_string();
                }
            }
            Mutation::Update => {}
            Mutation::Delete => stored.status = EntryStatus::Deleted,
        }
        Ok(stored)
    }

    fn generate_document(&self, entry: &ResolvedEntry) -> Result<Option<String>> {
        let action = RemoteAction::GeneratePdf;
        let payload = encode(action, entry)?;
        let reply = self.call(RemoteRequest::with_payload(action, payload))?;
        Ok(reply
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failures_become_transport_errors() {
        let err = unwrap_envelope(
            RemoteAction::GetBudget,
            json!({"success": false, "error": "sheet missing"}),
        )
        .expect_err("failure envelope");
        assert!(err.is_transport());
        assert!(err.to_string().contains("sheet missing"));
    }

    #[test]
    fn envelope_yields_data_or_the_body() {
        let data = unwrap_envelope(RemoteAction::GetHistory, json!({"success": true, "data": [1]}))
            .unwrap();
        assert_eq!(data, json!([1]));

        let bare = unwrap_envelope(RemoteAction::GetBudget, json!([{"산출내역": "A1"}])).unwrap();
        assert!(bare.is_array());

        let ack = unwrap_envelope(RemoteAction::SubmitExpenditure, json!({"success": true, "id": "r7"}))
            .unwrap();
        assert_eq!(ack["id"], "r7");
    }

    struct CannedHistory;

    impl Transport for CannedHistory {
        fn call(&self, request: &RemoteRequest) -> Result<Value> {
            match request.action {
                RemoteAction::GetHistory => Ok(json!({"success": true, "data": [
                    {"docName": "no id"},
                    {"id": "row-3", "docName": "has id"}
                ]})),
                action => panic!("unexpected {action:?}"),
            }
        }
    }

    #[test]
    fn id_less_history_rows_are_readable_but_not_mutable() {
        let store = RemoteStore::new(Box::new(CannedHistory));
        let first = store.fetch_ledger().unwrap();
        let second = store.fetch_ledger().unwrap();
        assert_eq!(first[0].id, "legacy-0");
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[1].id, "row-3");

        let err = store
            .append_or_mutate(&LedgerEntry::tombstone("legacy-0"), Mutation::Delete)
            .expect_err("no backend id to send");
        assert!(matches!(err, LedgerError::Unsupported(_)));
    }

    #[test]
    fn only_fetches_are_reads() {
        assert!(RemoteAction::GetBudget.is_read());
        assert!(RemoteAction::GetHistory.is_read());
        assert!(!RemoteAction::SaveBudget.is_read());
        assert!(!RemoteAction::DeleteHistory.is_read());
        assert_eq!(RemoteAction::GeneratePdf.as_str(), "generatePDF");
    }
}
