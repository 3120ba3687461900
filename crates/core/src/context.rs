//! Tool Execution Context
//!
//! Two pieces:
//!
//! 1. `ExecutionContext` trait - Base immutable context shared across all scopes
//! 2. `ToolContext` - Concrete struct handed to a tool for one call
//!
//! Tools only see `ToolContext`; they cannot mutate conversation state
//! through it. Conversation-scoped state lives in the application crate.

// ============================================================================
// ExecutionContext Trait
// ============================================================================

/// Base execution context trait providing immutable information about the
/// conversation a call belongs to.
pub trait ExecutionContext: Send + Sync {
    /// Returns the conversation (hosted thread) identifier, if the caller
    /// supplied one.
    fn conversation_id(&self) -> Option<&str>;

    /// Returns the name of the agent or surface issuing the call.
    fn agent_name(&self) -> &str;
}

// ============================================================================
// ToolContext
// ============================================================================

/// Context for a single tool call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    conversation_id: Option<String>,
    agent_name: String,
    /// Unique identifier for this specific tool call.
    tool_call_id: String,
}

impl ToolContext {
    /// Create a new ToolContext. A blank conversation id counts as missing.
    pub fn new(
        conversation_id: Option<String>,
        agent_name: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.filter(|id| !id.trim().is_empty()),
            agent_name: agent_name.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Returns the unique tool call identifier.
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }
}

impl ExecutionContext for ToolContext {
    fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }
}
