//! Error types for calbridge.

use thiserror::Error;

/// Errors that can occur in calbridge operations.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("'{operation}' is not supported by the {variant} accessor")]
    Unsupported {
        operation: &'static str,
        variant: &'static str,
    },

    #[error("Store refused the write: {0}")]
    WriteDenied(String),

    #[error("Malformed record at row {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("No pending interactive create matches tag '{0}'")]
    UnknownCorrelation(String),

    #[error("External editor error: {0}")]
    Editor(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalendarError {
    /// Stable label for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            CalendarError::Unsupported { .. } => "unsupported",
            CalendarError::WriteDenied(_) => "write_denied",
            CalendarError::MalformedRecord { .. } => "malformed_record",
            CalendarError::Store(_) => "store",
            CalendarError::UnknownCorrelation(_) => "unknown_correlation",
            CalendarError::Editor(_) => "editor",
            CalendarError::InvalidRequest(_) => "invalid_request",
            CalendarError::Config(_) => "config",
            CalendarError::Io(_) => "io",
            CalendarError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for CalendarError {
    fn from(err: serde_json::Error) -> Self {
        CalendarError::Serialization(err.to_string())
    }
}

/// Result type alias for calbridge operations.
pub type CalendarResult<T> = Result<T, CalendarError>;
