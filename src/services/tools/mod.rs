//! Tool Implementations
//!
//! Tools exposed to the hosted assistant and the upload staging they rely on.

pub mod pandas_agent;
pub mod staging;

pub use pandas_agent::PandasAgentTool;
pub use staging::stage_upload;
