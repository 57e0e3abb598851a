//! Crate-wide error taxonomy (spec §7).
//!
//! The boundary behaviors are fixed by the classification, not by the call site:
//! `Validation`/`Conflict` are never retried, `ProviderError`/`Transient` get the
//! worker's retry policy, `Cancelled` never logs as an error, `Internal` aborts the
//! current run but never the worker's ticker.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("provider error: {status} {body}")]
    ProviderError { status: u16, body: String },

    #[error("transient: {0}")]
    Transient(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal: {0}")]
    Internal(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl EngineError {
    /// Whether the taxonomy classifies this as retryable by the caller's policy
    /// (spec §7: ProviderError and Transient share a retry policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ProviderError { .. } | EngineError::Transient(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            EngineError::Transient(e.to_string())
        } else {
            EngineError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => EngineError::NotFound(e.to_string()),
            other => EngineError::Database(other.to_string()),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
