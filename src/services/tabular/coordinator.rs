//! Analysis Coordinator
//!
//! Runs one query against a conversation's tables:
//!
//! `Registering -> AvailabilityCheck -> {Fail | AgentDispatch} -> {Success | FallbackSummary | Fail}`
//!
//! The session lock is held for the whole call, so adds and analyses of one
//! conversation never interleave.

use std::sync::Arc;

use super::agent::{AgentBuilder, InvocationStyle, ReasoningAgent};
use super::error::{TabularError, TabularResult};
use super::query::{find_unavailable_file, needs_fallback, rewrite_query};
use super::session::ConversationSession;
use super::store::ConversationTableStore;
use super::summary::fallback_summary;
use crate::models::FileRecord;

/// Where an answer came from.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerSource {
    Agent,
    /// Deterministic summary; `cause` says why the agent was bypassed
    FallbackSummary { cause: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub text: String,
    pub source: AnswerSource,
}

/// Answer (or failure) of one `analyze` call plus its eviction side effects.
#[derive(Debug)]
pub struct AnalysisResult {
    pub outcome: TabularResult<AnalysisOutcome>,
    /// Files evicted while registering, deduplicated, in eviction order
    pub evicted_files: Vec<String>,
    /// Files that could not be registered, with the reason
    pub failed_files: Vec<(String, TabularError)>,
}

impl AnalysisResult {
    /// User-visible note listing evicted files, if any.
    pub fn eviction_note(&self, max_files: usize) -> Option<String> {
        if self.evicted_files.is_empty() {
            return None;
        }
        let names: Vec<String> = self.evicted_files.iter().map(|n| format!("'{}'", n)).collect();
        Some(format!(
            "Note: The following file(s) were removed due to the {}-file limit: {}",
            max_files,
            names.join(", ")
        ))
    }
}

pub struct AnalysisCoordinator {
    store: Arc<ConversationTableStore>,
    builder: Arc<dyn AgentBuilder>,
    invocation_order: Vec<InvocationStyle>,
}

impl AnalysisCoordinator {
    pub fn new(store: Arc<ConversationTableStore>, builder: Arc<dyn AgentBuilder>) -> Self {
        Self {
            store,
            builder,
            invocation_order: InvocationStyle::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Replace the order in which calling conventions are tried.
    pub fn with_invocation_order(mut self, order: Vec<InvocationStyle>) -> Self {
        self.invocation_order = order;
        self
    }

    pub fn store(&self) -> &Arc<ConversationTableStore> {
        &self.store
    }

    /// Register `new_files`, then answer `query` over the conversation's tables.
    pub async fn analyze(&self, conversation_id: &str, query: &str, new_files: Vec<FileRecord>) -> AnalysisResult {
        let session = self.store.session(conversation_id);
        let mut session = session.lock().await;

        let mut evicted_files: Vec<String> = Vec::new();
        let mut failed_files = Vec::new();
        for record in new_files {
            let name = record.name.clone();
            let outcome = self.store.add_file_to_session(conversation_id, &mut session, record);
            for evicted in outcome.evicted {
                if !evicted_files.contains(&evicted) {
                    evicted_files.push(evicted);
                }
            }
            if let Some(err) = outcome.error {
                tracing::warn!("[Coordinator] Could not register '{}': {}", name, err);
                failed_files.push((name, err));
            }
        }

        let outcome = self.answer(conversation_id, &mut session, query).await;

        AnalysisResult {
            outcome,
            evicted_files,
            failed_files,
        }
    }

    async fn answer(
        &self,
        conversation_id: &str,
        session: &mut ConversationSession,
        query: &str,
    ) -> TabularResult<AnalysisOutcome> {
        let keys = session.table_keys();

        if let Some(missing) = find_unavailable_file(query, &keys, session.upload_history()) {
            tracing::warn!(
                "[Coordinator] Query for conversation {} mentions evicted file '{}'",
                conversation_id,
                missing
            );
            return Err(TabularError::no_longer_available(missing));
        }

        if keys.is_empty() {
            return Err(TabularError::agent_unavailable("No dataframes available for analysis"));
        }

        let agent = match self.agent_for(session) {
            Ok(agent) => agent,
            Err(e) => return Ok(self.fallback(session, e.to_string())),
        };

        let rewritten = rewrite_query(query, &keys);
        tracing::info!("[Coordinator] Dispatching query for conversation {}", conversation_id);

        let mut failures = Vec::new();
        for style in &self.invocation_order {
            match style.call(agent.as_ref(), &rewritten).await {
                Ok(answer) if needs_fallback(&answer) => {
                    tracing::warn!(
                        "[Coordinator] Agent answer via {}() is unusable, using fallback summary",
                        style.name()
                    );
                    return Ok(self.fallback(session, "agent returned no usable answer".to_string()));
                }
                Ok(answer) => {
                    return Ok(AnalysisOutcome {
                        text: answer,
                        source: AnswerSource::Agent,
                    })
                }
                Err(e) => {
                    tracing::warn!("[Coordinator] Agent {}() failed: {}", style.name(), e);
                    failures.push(format!("{}(): {}", style.name(), e));
                }
            }
        }

        let error = TabularError::agent_failed(failures.join("; "));
        if error.mentions_missing_file() {
            tracing::info!("[Coordinator] Agent tried to read files from disk, using fallback summary");
        }
        Ok(self.fallback(session, error.to_string()))
    }

    fn agent_for(&self, session: &mut ConversationSession) -> TabularResult<Arc<dyn ReasoningAgent>> {
        if let Some(agent) = session.agent() {
            return Ok(agent);
        }
        let agent = self.builder.build(session.tables())?;
        session.set_agent(Arc::clone(&agent));
        Ok(agent)
    }

    fn fallback(&self, session: &ConversationSession, cause: String) -> AnalysisOutcome {
        tracing::info!("[Coordinator] Generating fallback summary: {}", cause);
        AnalysisOutcome {
            text: fallback_summary(session.tables()),
            source: AnswerSource::FallbackSummary { cause },
        }
    }
}
