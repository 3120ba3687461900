//! Analyst Tools
//!
//! Portable types for the tools the hosted assistant can call:
//! - `ToolResult` - execution result type
//! - `definitions` - names, descriptions and JSON schemas of the exposed tools
//!
//! Tool implementations that need the conversation table store live in the
//! main crate's `services::tools` module.

pub mod definitions;
pub mod executor;

// Re-export core types
pub use definitions::{
    pandas_agent_schema, PandasAgentArgs, PANDAS_AGENT_DESCRIPTION, PANDAS_AGENT_TOOL_NAME,
};
pub use executor::ToolResult;
