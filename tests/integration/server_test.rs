//! HTTP Surface Integration Tests
//!
//! Runs the router on an ephemeral port and talks to it over HTTP.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use analyst_gateway::server::serve_on;
use analyst_gateway::services::platform::registry::FILE_AWARENESS_TYPE;

use crate::common::{dir_entries, test_state, MemoryPlatform, ScriptedBuilder};

struct TestServer {
    base: String,
    client: reqwest::Client,
    platform: Arc<MemoryPlatform>,
    scratch: tempfile::TempDir,
}

async fn start(answer: &str) -> TestServer {
    let scratch = tempfile::tempdir().unwrap();
    let platform = MemoryPlatform::new();
    let state = Arc::new(test_state(scratch.path(), ScriptedBuilder::answering(answer), platform.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve_on(listener, state).await;
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        platform,
        scratch,
    }
}

impl TestServer {
    async fn upload(&self, thread: &str, name: &str, body: &'static [u8]) -> Value {
        self.client
            .post(format!("{}/conversations/{}/files", self.base, thread))
            .query(&[("filename", name)])
            .body(body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn analyze(&self, thread: &str, body: Value) -> Value {
        self.client
            .post(format!("{}/conversations/{}/analyze", self.base, thread))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_and_tools() {
    let server = start("ok").await;

    let health = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    let tools: Value = server
        .client
        .get(format!("{}/tools", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools[0]["function"]["name"], "pandas_agent");
    assert_eq!(tools[0]["function"]["parameters"]["required"], json!(["query"]));
}

#[tokio::test]
async fn test_unknown_operation_is_404() {
    let server = start("ok").await;

    let response = server
        .client
        .get(format!("{}/operation-status/pandas_agent_0_dead", server.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No operation found with ID pandas_agent_0_dead");
}

#[tokio::test]
async fn test_upload_then_analyze_then_poll_status() {
    let server = start("Total revenue is 210.").await;

    let uploaded = server
        .upload("thread_9", "sales.csv", b"month,revenue\njan,100\nfeb,110\n")
        .await;
    assert_eq!(uploaded["file"], "sales.csv");
    assert_eq!(uploaded["category"], "delimited_text");
    assert_eq!(uploaded["tables"][0]["name"], "sales.csv");
    assert_eq!(uploaded["tables"][0]["rows"], 2);
    assert_eq!(uploaded["tables"][0]["columns"], 2);
    assert_eq!(uploaded["error"], Value::Null);
    assert_eq!(
        server.platform.messages_of_type("thread_9", FILE_AWARENESS_TYPE).len(),
        1
    );

    let answer = server
        .analyze("thread_9", json!({"query": "total revenue in sales.csv"}))
        .await;
    assert_eq!(answer["success"], true);
    assert_eq!(answer["response"], "Total revenue is 210.");
    let operation_id = answer["operation_id"].as_str().unwrap().to_string();

    let status: Value = server
        .client
        .get(format!("{}/operation-status/{}", server.base, operation_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress"], 100.0);
}

#[tokio::test]
async fn test_fourth_upload_reports_eviction() {
    let server = start("ok").await;

    server.upload("t", "a.csv", b"x,y\n1,2\n").await;
    server.upload("t", "b.csv", b"x,y\n1,2\n").await;
    server.upload("t", "c.csv", b"x,y\n1,2\n").await;
    let fourth = server.upload("t", "d.csv", b"x,y\n1,2\n").await;

    assert_eq!(fourth["evicted"], json!(["a.csv"]));
}

#[tokio::test]
async fn test_non_tabular_upload_is_not_staged() {
    let server = start("ok").await;

    let uploaded = server.upload("t", "photo.png", b"\x89PNG").await;

    assert_eq!(uploaded["category"], "image");
    assert_eq!(uploaded["tables"], json!([]));
    assert!(uploaded["note"].is_string());
    assert!(dir_entries(server.scratch.path()).is_empty());
    assert!(server.platform.messages("t").is_empty());
}

#[tokio::test]
async fn test_analyze_requires_query() {
    let server = start("ok").await;

    let response = server
        .client
        .post(format!("{}/conversations/t/analyze", server.base))
        .json(&json!({"filename": "a.csv"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tool_call_runs_registered_tool() {
    let server = start("Mean revenue is 105.").await;
    server
        .upload("thread_3", "sales.csv", b"month,revenue\njan,100\nfeb,110\n")
        .await;

    let response: Value = server
        .client
        .post(format!("{}/conversations/thread_3/tool-calls", server.base))
        .json(&json!({
            "tool_call_id": "call_abc",
            "name": "pandas_agent",
            "arguments": "{\"query\": \"mean revenue in sales.csv\"}",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(response["tool_call_id"], "call_abc");
    assert_eq!(response["output"], "Mean revenue is 105.");
}

#[tokio::test]
async fn test_tool_call_errors_map_to_status() {
    let server = start("ok").await;
    let url = format!("{}/conversations/t/tool-calls", server.base);

    let unknown = server
        .client
        .post(&url)
        .json(&json!({"tool_call_id": "call_1", "name": "sql_agent", "arguments": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body["error"], "Not found: Tool not found: sql_agent");

    let malformed = server
        .client
        .post(&url)
        .json(&json!({"tool_call_id": "call_2", "name": "pandas_agent", "arguments": "{not json"}))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

    let blank = server
        .client
        .post(&url)
        .json(&json!({"tool_call_id": "call_3", "name": "pandas_agent", "arguments": {"query": " "}}))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), reqwest::StatusCode::BAD_REQUEST);
}
