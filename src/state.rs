//! Application State
//!
//! Wires configuration into the services shared by every request handler.

use std::sync::Arc;
use std::time::Duration;

use analyst_core::{ToolContext, UnifiedToolRegistry};
use analyst_llm::{LlmProvider, OpenAIProvider};

use crate::models::AppConfig;
use crate::services::platform::{platform_from_settings, AssistantPlatform};
use crate::services::progress::ProgressStore;
use crate::services::tabular::{AgentBuilder, AnalysisCoordinator, ConversationTableStore, LlmAgentBuilder};
use crate::services::tools::PandasAgentTool;
use crate::utils::error::AppResult;
use crate::utils::paths::ensure_dir;

/// Services shared by the HTTP handlers.
pub struct AppState {
    config: AppConfig,
    store: Arc<ConversationTableStore>,
    coordinator: Arc<AnalysisCoordinator>,
    progress: Arc<ProgressStore>,
    platform: Arc<dyn AssistantPlatform>,
    pandas_agent: Arc<PandasAgentTool>,
    tools: UnifiedToolRegistry,
}

impl AppState {
    /// Build the production services: OpenAI-compatible reasoning model and
    /// the hosted platform client (disabled without an API key).
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAIProvider::new(config.llm.provider_config()));
        let builder: Arc<dyn AgentBuilder> = Arc::new(LlmAgentBuilder::new(provider, config.agent_sample_rows));
        let platform = platform_from_settings(&config.platform)?;
        Self::with_components(config, builder, platform)
    }

    /// Build the services around an explicit agent builder and platform.
    pub fn with_components(
        config: AppConfig,
        builder: Arc<dyn AgentBuilder>,
        platform: Arc<dyn AssistantPlatform>,
    ) -> AppResult<Self> {
        ensure_dir(&config.scratch_dir)?;

        let store = Arc::new(ConversationTableStore::new(
            config.scratch_dir.clone(),
            config.max_files_per_conversation,
        ));
        let coordinator = Arc::new(AnalysisCoordinator::new(Arc::clone(&store), builder));
        let progress = Arc::new(ProgressStore::new());
        let pandas_agent = Arc::new(PandasAgentTool::new(
            Arc::clone(&coordinator),
            Arc::clone(&progress),
            Arc::clone(&platform),
            Duration::from_millis(config.progress_tick_ms),
        ));

        let mut tools = UnifiedToolRegistry::new();
        tools.register(pandas_agent.clone());

        tracing::info!(
            "[AppState] Initialized (scratch: {}, max files: {}, platform: {}, tools: {})",
            config.scratch_dir.display(),
            store.max_files(),
            if platform.is_enabled() { "enabled" } else { "disabled" },
            tools.names().join(", ")
        );

        Ok(Self {
            config,
            store,
            coordinator,
            progress,
            platform,
            pandas_agent,
            tools,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConversationTableStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<AnalysisCoordinator> {
        &self.coordinator
    }

    pub fn progress(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    pub fn platform(&self) -> &Arc<dyn AssistantPlatform> {
        &self.platform
    }

    pub fn pandas_agent(&self) -> &Arc<PandasAgentTool> {
        &self.pandas_agent
    }

    pub fn tools(&self) -> &UnifiedToolRegistry {
        &self.tools
    }

    /// Context for a tool call made on behalf of `conversation_id`.
    pub fn tool_context(&self, conversation_id: Option<String>, tool_call_id: impl Into<String>) -> ToolContext {
        ToolContext::new(conversation_id, "analyst-gateway", tool_call_id)
    }
}
