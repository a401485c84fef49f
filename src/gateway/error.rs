//! Backend Error Types

use thiserror::Error;

/// Failure reported by, or while talking to, the database.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered but the body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Any other failure (used by alternate backends)
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Classify this error by its message text.
    pub fn class(&self) -> BackendErrorClass {
        classify_backend_error(&self.to_string())
    }
}

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorClass {
    /// The referenced table does not exist
    NotFound,
    /// Anything else
    Backend,
}

/// Decide whether a backend error text means "no such table".
///
/// ClickHouse does not return a structured not-found status over HTTP, so
/// this matches on its message wording (`Code: 60`, `UNKNOWN_TABLE`,
/// "doesn't exist"). All sniffing of backend text lives here.
pub fn classify_backend_error(text: &str) -> BackendErrorClass {
    let message = text.to_ascii_lowercase();
    if message.contains("doesn't exist")
        || message.contains("does not exist")
        || message.contains("unknown table")
        || message.contains("unknown_table")
        || message.contains("code: 60,")
    {
        BackendErrorClass::NotFound
    } else {
        BackendErrorClass::Backend
    }
}
