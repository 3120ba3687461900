//! Tabular Analysis
//!
//! Per-conversation tabular data: locating uploaded files, loading them into
//! tables, retaining a bounded set per conversation and answering questions
//! over them through a reasoning agent with a deterministic fallback.

pub mod agent;
pub mod coordinator;
pub mod error;
pub mod loader;
pub mod locator;
pub mod query;
pub mod session;
pub mod store;
pub mod summary;

pub use agent::{
    AgentBuilder, AgentInput, AgentOutput, InvocationStyle, LlmAgentBuilder, LlmTableAgent,
    ReasoningAgent,
};
pub use coordinator::{AnalysisCoordinator, AnalysisOutcome, AnalysisResult, AnswerSource};
pub use error::{TabularError, TabularResult};
pub use loader::{sheet_table_key, LoadedFile, TableLoader};
pub use locator::FileLocator;
pub use session::ConversationSession;
pub use store::{AddFileOutcome, ConversationTableStore, DEFAULT_MAX_FILES};
pub use summary::{fallback_summary, table_overview};
