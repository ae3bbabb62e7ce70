//! Request/response plumbing between [`RemoteStore`](super::RemoteStore) and
//! the remote backend.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::errors::{LedgerError, Result};

use super::remote::RemoteAction;

/// One call to the remote backend: an action name plus an optional JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub action: RemoteAction,
    pub payload: Option<Value>,
}

impl RemoteRequest {
    pub fn new(action: RemoteAction) -> Self {
        Self {
            action,
            payload: None,
        }
    }

    pub fn with_payload(action: RemoteAction, payload: Value) -> Self {
        Self {
            action,
            payload: Some(payload),
        }
    }
}

/// Delivers requests to the remote backend and returns the decoded JSON body.
///
/// Implementations report every failure (connection, HTTP status, undecodable
/// body) as [`LedgerError::Transport`].
pub trait Transport: Send + Sync {
    fn call(&self, request: &RemoteRequest) -> Result<Value>;
}

/// HTTP transport: reads are `GET ?action=…`, writes are form posts carrying
/// `action` and a JSON-encoded `data` field.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    http: Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(LedgerError::Config("remote endpoint is empty".into()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LedgerError::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: &RemoteRequest) -> Result<Value> {
        let action = request.action.as_str();
        debug!(action, endpoint = %self.endpoint, "calling remote backend");
        let builder = if request.action.is_read() {
            self.http.get(&self.endpoint).query(&[("action", action)])
        } else {
            let data = request
                .payload
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "null".to_string());
            self.http
                .post(&self.endpoint)
                .form(&[("action", action), ("data", data.as_str())])
        };
        let response = builder
            .send()
            .map_err(|err| LedgerError::transport(action, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::transport(action, format!("HTTP {status}")));
        }
        response
            .json::<Value>()
            .map_err(|err| LedgerError::transport(action, err))
    }
}
