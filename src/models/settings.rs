//! Settings Models
//!
//! Application configuration and settings data structures.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use analyst_llm::ProviderConfig;

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Shared directory uploads are staged in and searched by the file locator
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Retention bound per conversation
    #[serde(default = "default_max_files")]
    pub max_files_per_conversation: usize,
    /// Cadence of the cosmetic progress ticker in milliseconds
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
    /// Rows of each table included in the reasoning agent's context
    #[serde(default = "default_agent_sample_rows")]
    pub agent_sample_rows: usize,
    /// Reasoning model settings
    #[serde(default)]
    pub llm: LlmSettings,
    /// Hosted assistant platform settings
    #[serde(default)]
    pub platform: PlatformSettings,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_max_files() -> usize {
    3
}

fn default_progress_tick_ms() -> u64 {
    1500
}

fn default_agent_sample_rows() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            scratch_dir: default_scratch_dir(),
            max_files_per_conversation: default_max_files(),
            progress_tick_ms: default_progress_tick_ms(),
            agent_sample_rows: default_agent_sample_rows(),
            llm: LlmSettings::default(),
            platform: PlatformSettings::default(),
        }
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.bind_addr));
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err("scratch_dir must not be empty".to_string());
        }

        if self.max_files_per_conversation == 0 {
            return Err("max_files_per_conversation must be at least 1".to_string());
        }

        if self.progress_tick_ms == 0 {
            return Err("progress_tick_ms must be greater than 0".to_string());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.llm.temperature
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".to_string());
        }

        Ok(())
    }
}

/// Reasoning model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    /// Full chat-completions URL (OpenAI-compatible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = ProviderConfig::default();
        Self {
            model: provider.model,
            base_url: None,
            api_key: None,
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
            timeout_secs: provider.timeout_secs,
        }
    }
}

impl LlmSettings {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Hosted assistant platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Appended as `api-version` query parameter when set (Azure deployments)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            api_version: None,
            timeout_secs: 60,
        }
    }
}

impl PlatformSettings {
    /// The platform is only used when an API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}
