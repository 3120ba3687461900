//! pandas_agent Tool Integration Tests
//!
//! The registry-driven tool flow: files recorded in the thread, progress
//! reporting under the operation id and the response posted back.

use serde_json::json;

use analyst_gateway::models::OperationPhase;
use analyst_gateway::services::platform::registry::{ANALYSIS_RESPONSE_TYPE, REGISTRY_MESSAGE_TYPE};
use analyst_gateway::services::platform::{load_registry, register_file};
use analyst_tools::PandasAgentArgs;

use crate::common::{staged_csv, test_state, MemoryPlatform, Script, ScriptedBuilder};

fn args(query: &str, filename: Option<&str>) -> PandasAgentArgs {
    PandasAgentArgs {
        query: query.to_string(),
        filename: filename.map(str::to_string),
    }
}

#[tokio::test]
async fn test_registered_files_are_analyzed_and_answer_posted() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let builder = ScriptedBuilder::answering("Revenue grew 10%.");
    let state = test_state(temp.path(), builder.clone(), platform.clone());

    let record = staged_csv(temp.path(), "sales.csv", "month,revenue\njan,100\nfeb,110\n");
    register_file(platform.as_ref(), "thread_1", &record).await.unwrap();

    let result = state
        .pandas_agent()
        .run_analysis(Some("thread_1"), &args("how did revenue change?", None))
        .await;

    assert!(result.success);
    assert_eq!(result.output.as_deref(), Some("Revenue grew 10%."));

    let operation_id = result.operation_id.clone().unwrap();
    assert!(operation_id.starts_with("pandas_agent_"));
    let status = state.progress().get(&operation_id).unwrap();
    assert_eq!(status.status, OperationPhase::Completed);
    assert_eq!(status.progress, 100.0);

    let responses = platform.messages_of_type("thread_1", ANALYSIS_RESPONSE_TYPE);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].content, "[PANDAS AGENT RESPONSE]: Revenue grew 10%.");
    assert_eq!(responses[0].metadata["operation_id"], operation_id);

    assert_eq!(state.store().file_names("thread_1").await, vec!["sales.csv"]);
}

#[tokio::test]
async fn test_missing_thread_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let state = test_state(temp.path(), ScriptedBuilder::answering("x"), MemoryPlatform::new());

    let result = state.pandas_agent().run_analysis(None, &args("anything", None)).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Thread ID is required for pandas agent"));
    let status = state.progress().get(result.operation_id.as_deref().unwrap()).unwrap();
    assert_eq!(status.status, OperationPhase::Error);
}

#[tokio::test]
async fn test_no_files_reports_operation_id() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let state = test_state(temp.path(), ScriptedBuilder::answering("x"), platform.clone());

    let result = state
        .pandas_agent()
        .run_analysis(Some("empty_thread"), &args("what is in my file?", None))
        .await;

    assert!(!result.success);
    let operation_id = result.operation_id.clone().unwrap();
    let content = result.to_content();
    assert!(content.starts_with("Error: Could not find any valid files to analyze."));
    assert!(content.ends_with(&format!("Operation ID: {}", operation_id)));
    assert!(platform.messages("empty_thread").is_empty());
}

#[tokio::test]
async fn test_eviction_note_and_registry_pruning() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let state = test_state(temp.path(), ScriptedBuilder::answering("done"), platform.clone());

    for name in ["a.csv", "b.csv", "c.csv", "d.csv"] {
        let record = staged_csv(temp.path(), name, "x,y\n1,2\n");
        register_file(platform.as_ref(), "t", &record).await.unwrap();
    }

    let result = state
        .pandas_agent()
        .run_analysis(Some("t"), &args("describe the data", None))
        .await;

    assert!(result.success);
    assert_eq!(
        result.output.as_deref(),
        Some("done\n\nNote: The following file(s) were removed due to the 3-file limit: 'a.csv'")
    );

    let registered: Vec<String> = load_registry(platform.as_ref(), "t")
        .await
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(registered, vec!["b.csv", "c.csv", "d.csv"]);
    assert_eq!(platform.messages_of_type("t", REGISTRY_MESSAGE_TYPE).len(), 1);
}

#[tokio::test]
async fn test_query_for_evicted_file_returns_availability_error() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let state = test_state(temp.path(), ScriptedBuilder::answering("done"), platform.clone());

    for name in ["a.csv", "b.csv", "c.csv", "d.csv"] {
        let record = staged_csv(temp.path(), name, "x,y\n1,2\n");
        state.store().add_file("t", record).await;
    }

    let result = state
        .pandas_agent()
        .run_analysis(Some("t"), &args("sum y in a.csv", None))
        .await;

    assert!(!result.success);
    let content = result.to_content();
    assert!(content.starts_with("The file 'a.csv' was mentioned in your query but is no longer available."));
    let status = state.progress().get(result.operation_id.as_deref().unwrap()).unwrap();
    assert_eq!(status.status, OperationPhase::Error);
    assert_eq!(platform.messages_of_type("t", ANALYSIS_RESPONSE_TYPE).len(), 1);
}

#[tokio::test]
async fn test_failing_agent_still_succeeds_with_summary() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let builder = ScriptedBuilder::new(Script::Fail("boom".to_string()));
    let state = test_state(temp.path(), builder, platform.clone());

    let record = staged_csv(temp.path(), "m.csv", "k,v\na,1\nb,2\n");
    register_file(platform.as_ref(), "t", &record).await.unwrap();

    let result = state
        .pandas_agent()
        .run_analysis(Some("t"), &args("what is the mean of v?", Some("m.csv")))
        .await;

    assert!(result.success);
    let output = result.output.unwrap();
    assert!(output.starts_with("## Summary of m.csv"));
    assert!(output.contains("* Columns: k, v"));
}

#[tokio::test]
async fn test_tool_registry_dispatches_pandas_agent() {
    let temp = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let state = test_state(temp.path(), ScriptedBuilder::answering("42"), platform.clone());

    let record = staged_csv(temp.path(), "n.csv", "n\n40\n2\n");
    register_file(platform.as_ref(), "t", &record).await.unwrap();

    let definitions = state.tools().function_definitions();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0]["function"]["name"], "pandas_agent");

    let ctx = state.tool_context(Some("t".to_string()), "call_1");
    let value = state
        .tools()
        .execute("pandas_agent", &ctx, json!({"query": "total of n"}))
        .await
        .unwrap();
    assert_eq!(value, json!("42"));

    let err = state
        .tools()
        .execute("pandas_agent", &ctx, json!({"query": "  ", "filename": "n.csv"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Validation error: query is required");
}
