use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type shared by the stores, the reconciliation session and the CLI.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Remote `{action}` failed: {message}")]
    Transport { action: String, message: String },
    #[error("Stored `{record}` is unreadable: {message}")]
    CorruptState { record: String, message: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Ledger entry not found: {0}")]
    UnknownEntry(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl LedgerError {
    pub fn transport(action: impl Into<String>, message: impl ToString) -> Self {
        LedgerError::Transport {
            action: action.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LedgerError::Transport { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}
