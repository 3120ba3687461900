//! Hosted Assistant Platform Client
//!
//! Thread-message operations against an OpenAI-compatible assistants API.
//! Messages carry a string-valued metadata bag, which is how the file
//! registry and context markers are persisted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use analyst_llm::build_http_client;

use crate::models::PlatformSettings;
use crate::utils::error::{AppError, AppResult};

/// Metadata bag of a thread message.
pub type MessageMetadata = BTreeMap<String, String>;

/// A thread message as seen by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub id: String,
    pub role: String,
    /// Concatenated text parts
    pub content: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl PlatformMessage {
    pub fn metadata_type(&self) -> Option<&str> {
        self.metadata.get("type").map(String::as_str)
    }
}

/// A message to append to a thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: MessageMetadata,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            metadata: MessageMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Thread-message operations of the hosted platform.
#[async_trait]
pub trait AssistantPlatform: Send + Sync {
    /// Whether calls reach a real platform.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Messages of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<PlatformMessage>>;

    async fn create_message(&self, thread_id: &str, message: NewMessage) -> AppResult<PlatformMessage>;

    async fn delete_message(&self, thread_id: &str, message_id: &str) -> AppResult<()>;
}

/// Stand-in used when no platform is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPlatform;

#[async_trait]
impl AssistantPlatform for DisabledPlatform {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn list_messages(&self, _thread_id: &str) -> AppResult<Vec<PlatformMessage>> {
        Ok(Vec::new())
    }

    async fn create_message(&self, _thread_id: &str, _message: NewMessage) -> AppResult<PlatformMessage> {
        Err(AppError::platform("Assistant platform is not configured"))
    }

    async fn delete_message(&self, _thread_id: &str, _message_id: &str) -> AppResult<()> {
        Err(AppError::platform("Assistant platform is not configured"))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    role: String,
    #[serde(default)]
    content: Vec<WireContent>,
    #[serde(default)]
    metadata: Option<MessageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    value: String,
}

impl From<WireMessage> for PlatformMessage {
    fn from(wire: WireMessage) -> Self {
        let content = wire
            .content
            .into_iter()
            .filter_map(|part| part.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            id: wire.id,
            role: wire.role,
            content,
            metadata: wire.metadata.unwrap_or_default(),
        }
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// Client for an OpenAI-compatible assistants API (v2).
pub struct HostedPlatformClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_version: Option<String>,
}

impl HostedPlatformClient {
    pub fn new(settings: &PlatformSettings) -> AppResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::config("Assistant platform API key not configured"))?;

        Ok(Self {
            client: build_http_client(Some(settings.timeout_secs)),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_version: settings.api_version.clone(),
        })
    }

    fn is_azure(&self) -> bool {
        self.base_url.contains(".openai.azure.com")
    }

    fn messages_url(&self, thread_id: &str) -> String {
        format!("{}/threads/{}/messages", self.base_url, thread_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = if self.is_azure() {
            request.header("api-key", &self.api_key)
        } else {
            request.header("Authorization", format!("Bearer {}", self.api_key))
        };
        let request = request.header("OpenAI-Beta", "assistants=v2");
        match &self.api_version {
            Some(version) => request.query(&[("api-version", version.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> AppResult<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AppError::platform(format!("{} failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::platform(format!(
                "{} failed with HTTP {}: {}",
                action,
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl AssistantPlatform for HostedPlatformClient {
    async fn list_messages(&self, thread_id: &str) -> AppResult<Vec<PlatformMessage>> {
        let request = self
            .client
            .get(self.messages_url(thread_id))
            .query(&[("order", "desc"), ("limit", "100")]);
        let response = self.send(request, "List messages").await?;
        let list: MessageList = response
            .json()
            .await
            .map_err(|e| AppError::platform(format!("Invalid message list: {}", e)))?;
        Ok(list.data.into_iter().map(PlatformMessage::from).collect())
    }

    async fn create_message(&self, thread_id: &str, message: NewMessage) -> AppResult<PlatformMessage> {
        let request = self.client.post(self.messages_url(thread_id)).json(&message);
        let response = self.send(request, "Create message").await?;
        let wire: WireMessage = response
            .json()
            .await
            .map_err(|e| AppError::platform(format!("Invalid message: {}", e)))?;
        Ok(wire.into())
    }

    async fn delete_message(&self, thread_id: &str, message_id: &str) -> AppResult<()> {
        let url = format!("{}/{}", self.messages_url(thread_id), message_id);
        self.send(self.client.delete(url), "Delete message").await?;
        Ok(())
    }
}
