//! Tabular Errors
//!
//! Failure taxonomy of the per-conversation table store and the analysis
//! coordinator.

use thiserror::Error;

/// Maximum number of underlying parse errors kept for diagnostics.
pub const MAX_PARSE_DIAGNOSTICS: usize = 5;

/// Errors raised while locating, loading or analyzing tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabularError {
    /// No physical file could be found for the record
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Every parse attempt failed
    #[error("Could not parse '{name}': {}", .errors.join(" | "))]
    UnparsableTable { name: String, errors: Vec<String> },

    /// The declared file kind is not tabular
    #[error("Unsupported file type '{kind}' for '{name}'")]
    UnsupportedFileKind { name: String, kind: String },

    /// The query names a file that was evicted from the conversation
    #[error(
        "The file '{0}' was mentioned in your query but is no longer available. \
         Please re-upload the file as it may have been removed due to the file limit per conversation."
    )]
    FileNoLongerAvailable(String),

    /// The reasoning agent could not be constructed
    #[error("Failed to create analysis agent: {0}")]
    AgentUnavailable(String),

    /// The reasoning agent failed under every invocation style
    #[error("Reasoning agent failed: {0}")]
    AgentExecutionFailed(String),

    /// Transport failure talking to the hosted platform or the model
    #[error("Remote platform error: {0}")]
    RemotePlatformError(String),
}

/// Result type alias for tabular operations
pub type TabularResult<T> = Result<T, TabularError>;

impl TabularError {
    pub fn file_not_found(name: impl Into<String>) -> Self {
        Self::FileNotFound(name.into())
    }

    /// Build an `UnparsableTable`, keeping at most five diagnostics.
    pub fn unparsable(name: impl Into<String>, mut errors: Vec<String>) -> Self {
        errors.truncate(MAX_PARSE_DIAGNOSTICS);
        Self::UnparsableTable {
            name: name.into(),
            errors,
        }
    }

    pub fn unsupported(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedFileKind {
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn no_longer_available(name: impl Into<String>) -> Self {
        Self::FileNoLongerAvailable(name.into())
    }

    pub fn agent_unavailable(msg: impl Into<String>) -> Self {
        Self::AgentUnavailable(msg.into())
    }

    pub fn agent_failed(msg: impl Into<String>) -> Self {
        Self::AgentExecutionFailed(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemotePlatformError(msg.into())
    }

    /// Whether the failure text points at a missing file on disk.
    pub fn mentions_missing_file(&self) -> bool {
        let text = self.to_string();
        text.contains("FileNotFoundError") || text.contains("No such file")
    }
}
