//! Analyst LLM
//!
//! Provides a unified interface for the chat-completion models that back the
//! tabular reasoning agent:
//! - OpenAI and OpenAI-compatible endpoints (Azure deployments, local gateways)
//!
//! Also includes the HTTP client factory shared with the hosted platform client.

pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;
