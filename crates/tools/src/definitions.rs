//! Tool Definitions
//!
//! Definitions of the function tools registered with the hosted assistant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use analyst_core::{CoreError, CoreResult};

/// Name of the tabular analysis tool.
pub const PANDAS_AGENT_TOOL_NAME: &str = "pandas_agent";

/// Description shown to the assistant when it decides which tool to call.
pub const PANDAS_AGENT_DESCRIPTION: &str = "Analyzes CSV and Excel files uploaded to this conversation. \
Use it for any question about the data in those files: counts, totals, averages, filtering, \
grouping, trends or comparisons. The files are already loaded in memory; pass the user's \
question as `query` and optionally the file it concerns as `filename`.";

/// Arguments accepted by `pandas_agent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PandasAgentArgs {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl PandasAgentArgs {
    /// Parse tool-call arguments, rejecting a missing or blank query.
    pub fn from_value(args: Value) -> CoreResult<Self> {
        let mut parsed: Self = serde_json::from_value(args)
            .map_err(|e| CoreError::validation(format!("Invalid pandas_agent arguments: {}", e)))?;
        if parsed.query.trim().is_empty() {
            return Err(CoreError::validation("query is required"));
        }
        parsed.filename = parsed
            .filename
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        Ok(parsed)
    }
}

/// JSON schema for `{query: string (required), filename: string (optional)}`.
pub fn pandas_agent_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The question to answer about the uploaded data files"
            },
            "filename": {
                "type": "string",
                "description": "Optional name of the file to analyze"
            }
        },
        "required": ["query"]
    })
}
