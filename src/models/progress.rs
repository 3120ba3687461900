//! Progress Models
//!
//! Status snapshots for long-running operations, polled by clients.

use serde::{Deserialize, Serialize};

/// Phase of a `pandas_agent` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationPhase {
    Started,
    Files,
    Analyzing,
    Executing,
    Formatting,
    Responding,
    Completed,
    Error,
}

impl OperationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationPhase::Started => "started",
            OperationPhase::Files => "files",
            OperationPhase::Analyzing => "analyzing",
            OperationPhase::Executing => "executing",
            OperationPhase::Formatting => "formatting",
            OperationPhase::Responding => "responding",
            OperationPhase::Completed => "completed",
            OperationPhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationPhase::Completed | OperationPhase::Error)
    }
}

/// Latest known state of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub status: OperationPhase,
    /// Percentage in `0..=100`
    pub progress: f64,
    pub message: String,
    /// Unix time in fractional seconds
    pub updated_at: f64,
}
