//! Reasoning Agent
//!
//! The analysis itself is delegated to an agent primed with the in-memory
//! tables. Agents expose two calling conventions (`run` and `invoke`); the
//! coordinator tries them in the order given by `InvocationStyle`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use analyst_llm::{
    provider::missing_api_key_error, LlmError, LlmProvider, LlmRequestOptions, Message,
};

use super::error::{TabularError, TabularResult};
use super::summary::table_profile;
use crate::models::Table;

// ============================================================================
// Agent traits
// ============================================================================

/// Structured input for `invoke`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub input: String,
}

/// Structured output of `invoke`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: String,
}

/// Answers natural-language questions over a fixed set of tables.
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    /// Plain text in, plain text out.
    async fn run(&self, query: &str) -> TabularResult<String>;

    /// Structured `{input}` in, `{output}` out.
    async fn invoke(&self, input: AgentInput) -> TabularResult<AgentOutput>;
}

/// Constructs an agent scoped to a conversation's current tables.
pub trait AgentBuilder: Send + Sync {
    fn build(&self, tables: &BTreeMap<String, Table>) -> TabularResult<Arc<dyn ReasoningAgent>>;
}

/// Calling convention used to dispatch a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStyle {
    Run,
    Invoke,
}

impl InvocationStyle {
    /// `run` first, `invoke` as the fallback.
    pub const DEFAULT_ORDER: [InvocationStyle; 2] = [InvocationStyle::Run, InvocationStyle::Invoke];

    pub fn name(&self) -> &'static str {
        match self {
            InvocationStyle::Run => "run",
            InvocationStyle::Invoke => "invoke",
        }
    }

    pub async fn call(&self, agent: &dyn ReasoningAgent, query: &str) -> TabularResult<String> {
        match self {
            InvocationStyle::Run => agent.run(query).await,
            InvocationStyle::Invoke => agent
                .invoke(AgentInput {
                    input: query.to_string(),
                })
                .await
                .map(|out| out.output),
        }
    }
}

// ============================================================================
// LLM-backed agent
// ============================================================================

fn map_llm_error(err: LlmError) -> TabularError {
    match err {
        LlmError::NetworkError { .. } | LlmError::ServerError { .. } | LlmError::RateLimited { .. } => {
            TabularError::remote(err.to_string())
        }
        other => TabularError::agent_failed(other.to_string()),
    }
}

/// Builds the system context describing every table.
fn build_context(tables: &BTreeMap<String, Table>, sample_rows: usize) -> String {
    let mut context = String::from(
        "You are a data analyst. The tables below are ALREADY LOADED in memory; \
         never try to read files from disk. Answer using only this data, show the \
         figures you rely on, and say so when the answer depends on rows not shown.\n",
    );

    for (name, table) in tables {
        context.push_str(&format!("\n## Table '{}'\n", name));
        context.push_str(&table_profile(table));
        if table.row_count() > sample_rows {
            context.push_str(&format!(
                "\nFirst {} of {} rows (CSV):\n",
                sample_rows,
                table.row_count()
            ));
        } else {
            context.push_str("\nAll rows (CSV):\n");
        }
        context.push_str(&table.to_csv_text(sample_rows));
    }

    context
}

/// Reasoning agent that answers through a chat-completion model.
pub struct LlmTableAgent {
    provider: Arc<dyn LlmProvider>,
    context: String,
}

impl LlmTableAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, tables: &BTreeMap<String, Table>, sample_rows: usize) -> Self {
        Self {
            provider,
            context: build_context(tables, sample_rows),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    async fn ask(&self, content: String) -> TabularResult<String> {
        let response = self
            .provider
            .send_message(
                vec![Message::user(content)],
                Some(self.context.clone()),
                LlmRequestOptions::default(),
            )
            .await
            .map_err(map_llm_error)?;
        Ok(response.text().to_string())
    }
}

#[async_trait]
impl ReasoningAgent for LlmTableAgent {
    async fn run(&self, query: &str) -> TabularResult<String> {
        self.ask(query.to_string()).await
    }

    async fn invoke(&self, input: AgentInput) -> TabularResult<AgentOutput> {
        let content = serde_json::to_string(&input)
            .map_err(|e| TabularError::agent_failed(e.to_string()))?;
        let output = self.ask(content).await?;
        Ok(AgentOutput { output })
    }
}

/// Builds `LlmTableAgent`s from a shared provider.
pub struct LlmAgentBuilder {
    provider: Arc<dyn LlmProvider>,
    sample_rows: usize,
}

impl LlmAgentBuilder {
    pub fn new(provider: Arc<dyn LlmProvider>, sample_rows: usize) -> Self {
        Self {
            provider,
            sample_rows,
        }
    }
}

impl AgentBuilder for LlmAgentBuilder {
    fn build(&self, tables: &BTreeMap<String, Table>) -> TabularResult<Arc<dyn ReasoningAgent>> {
        if tables.is_empty() {
            return Err(TabularError::agent_unavailable("No dataframes available for analysis"));
        }
        let has_key = self
            .provider
            .config()
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if !has_key {
            return Err(TabularError::agent_unavailable(
                missing_api_key_error(self.provider.name()).to_string(),
            ));
        }

        tracing::info!(
            "[Agent] Creating {} agent over {} table(s)",
            self.provider.model(),
            tables.len()
        );
        Ok(Arc::new(LlmTableAgent::new(
            Arc::clone(&self.provider),
            tables,
            self.sample_rows,
        )))
    }
}
