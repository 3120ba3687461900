//! pandas_agent Tool
//!
//! The tool the hosted assistant calls to analyze a conversation's tabular
//! files. Wraps the analysis coordinator with progress reporting, the thread
//! file registry and posting the answer back to the thread.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use analyst_core::{CoreResult, ExecutionContext, ToolContext, ToolDefinitionTrait, ToolExecutable};
use analyst_tools::{
    pandas_agent_schema, PandasAgentArgs, ToolResult, PANDAS_AGENT_DESCRIPTION, PANDAS_AGENT_TOOL_NAME,
};

use crate::models::{FileRecord, OperationPhase};
use crate::services::platform::{load_registry, post_analysis_response, unregister_files, AssistantPlatform};
use crate::services::progress::{new_operation_id, ProgressStore, ProgressTicker, TICKER_START};
use crate::services::tabular::{table_overview, AnalysisCoordinator, TabularError};

const NO_RESULTS_MESSAGE: &str = "No results were returned from the analysis. Try reformulating your query.";

/// Keep records matching `filename`; all records when none match.
fn select_files(files: Vec<FileRecord>, filename: Option<&str>) -> Vec<FileRecord> {
    let Some(wanted) = filename.map(str::to_lowercase) else {
        return files;
    };
    let matching: Vec<FileRecord> = files
        .iter()
        .filter(|f| {
            let name = f.name.to_lowercase();
            name == wanted || name.contains(&wanted) || wanted.contains(&name)
        })
        .cloned()
        .collect();
    if matching.is_empty() {
        tracing::warn!(
            "[PandasAgent] No registered file matches '{}', analyzing all files",
            wanted
        );
        files
    } else {
        matching
    }
}

fn describe_files(files: &[FileRecord], loaded: &[String]) -> String {
    if files.is_empty() {
        return loaded.join(", ");
    }
    files
        .iter()
        .map(|f| format!("{} ({})", f.name, f.kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tabular analysis tool for the hosted assistant.
pub struct PandasAgentTool {
    coordinator: Arc<AnalysisCoordinator>,
    progress: Arc<ProgressStore>,
    platform: Arc<dyn AssistantPlatform>,
    tick_interval: Duration,
}

impl PandasAgentTool {
    pub fn new(
        coordinator: Arc<AnalysisCoordinator>,
        progress: Arc<ProgressStore>,
        platform: Arc<dyn AssistantPlatform>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            progress,
            platform,
            tick_interval,
        }
    }

    /// Run one analysis, reporting progress under a fresh operation id.
    pub async fn run_analysis(&self, conversation_id: Option<&str>, args: &PandasAgentArgs) -> ToolResult {
        let operation_id = new_operation_id();
        let progress = &self.progress;
        progress.update(&operation_id, OperationPhase::Started, 0.0, "Starting data analysis");

        let Some(conversation_id) = conversation_id else {
            progress.update(&operation_id, OperationPhase::Error, 100.0, "Thread ID is required");
            return ToolResult::err("Thread ID is required for pandas agent").with_operation_id(operation_id);
        };

        let registered = load_registry(self.platform.as_ref(), conversation_id).await;
        let files = select_files(registered, args.filename.as_deref());
        let loaded = self.coordinator.store().table_keys(conversation_id).await;

        if files.is_empty() && loaded.is_empty() {
            let message = "Could not find any valid files to analyze. Please verify the uploaded files and try again.";
            progress.update(&operation_id, OperationPhase::Error, 100.0, message);
            return ToolResult::err_with_output(
                message,
                format!("Error: {}\n\nOperation ID: {}", message, operation_id),
            )
            .with_operation_id(operation_id);
        }

        progress.update(
            &operation_id,
            OperationPhase::Files,
            20.0,
            format!("Processing files: {}", describe_files(&files, &loaded)),
        );
        progress.update(
            &operation_id,
            OperationPhase::Analyzing,
            TICKER_START,
            format!("Analyzing data with query: {}", args.query),
        );

        let ticker = ProgressTicker::start(Arc::clone(progress), &operation_id, self.tick_interval);
        let result = self.coordinator.analyze(conversation_id, &args.query, files).await;
        ticker.finish().await;

        if let Err(e) =
            unregister_files(self.platform.as_ref(), conversation_id, &result.evicted_files).await
        {
            tracing::warn!("[PandasAgent] Could not prune file registry of thread {}: {}", conversation_id, e);
        }

        progress.update(&operation_id, OperationPhase::Formatting, 90.0, "Formatting response");

        let note = result.eviction_note(self.coordinator.store().max_files());
        let (mut response, failure) = match result.outcome {
            Ok(outcome) if outcome.text.trim().is_empty() => (NO_RESULTS_MESSAGE.to_string(), None),
            Ok(outcome) => (outcome.text, None),
            Err(e) => {
                tracing::error!("[PandasAgent] Analysis failed for thread {}: {}", conversation_id, e);
                progress.update(&operation_id, OperationPhase::Error, 95.0, format!("Error: {}", e));
                (self.error_response(conversation_id, &e).await, Some(e))
            }
        };
        if let Some(note) = note {
            response.push_str("\n\n");
            response.push_str(&note);
        }

        progress.update(&operation_id, OperationPhase::Responding, 95.0, "Adding response to thread");
        if let Err(e) =
            post_analysis_response(self.platform.as_ref(), conversation_id, &operation_id, &response).await
        {
            tracing::warn!("[PandasAgent] Could not add response to thread {}: {}", conversation_id, e);
        }

        match failure {
            None => {
                progress.update(
                    &operation_id,
                    OperationPhase::Completed,
                    100.0,
                    "Analysis completed successfully",
                );
                ToolResult::ok(response).with_operation_id(operation_id)
            }
            Some(e) => {
                progress.update(&operation_id, OperationPhase::Error, 100.0, format!("Error: {}", e));
                ToolResult::err_with_output(e.to_string(), response).with_operation_id(operation_id)
            }
        }
    }

    /// Descriptive text for a failed analysis, with a table overview when
    /// tables are loaded.
    async fn error_response(&self, conversation_id: &str, error: &TabularError) -> String {
        if matches!(error, TabularError::FileNoLongerAvailable(_)) {
            return error.to_string();
        }

        let session = self.coordinator.store().session(conversation_id);
        let session = session.lock().await;
        if session.tables().is_empty() {
            return format!("Error analyzing data: {}", error);
        }
        format!(
            "I encountered an issue while analyzing your data files but can provide basic information about them:\n\n\
             {}\n\nError details: {}",
            table_overview(session.tables()),
            error
        )
    }
}

impl ToolDefinitionTrait for PandasAgentTool {
    fn name(&self) -> &str {
        PANDAS_AGENT_TOOL_NAME
    }

    fn description(&self) -> &str {
        PANDAS_AGENT_DESCRIPTION
    }

    fn parameters_schema(&self) -> Value {
        pandas_agent_schema()
    }

    fn is_long_running(&self) -> bool {
        true
    }
}

#[async_trait]
impl ToolExecutable for PandasAgentTool {
    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<Value> {
        let args = PandasAgentArgs::from_value(args)?;
        tracing::info!(
            "[PandasAgent] Tool call {} from {} (thread: {:?})",
            ctx.tool_call_id(),
            ctx.agent_name(),
            ctx.conversation_id()
        );
        let result = self.run_analysis(ctx.conversation_id(), &args).await;
        Ok(Value::String(result.to_content()))
    }
}
