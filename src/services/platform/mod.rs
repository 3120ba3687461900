//! Hosted Assistant Platform
//!
//! Client for the thread-message API plus the bookkeeping this service keeps
//! in threads (file registry, awareness and response messages).

pub mod client;
pub mod registry;

use std::sync::Arc;

pub use client::{AssistantPlatform, DisabledPlatform, HostedPlatformClient, MessageMetadata, NewMessage, PlatformMessage};
pub use registry::{
    file_awareness_text, load_registry, post_analysis_response, post_file_awareness, register_file, save_registry,
    unregister_files,
};

use crate::models::PlatformSettings;
use crate::utils::error::AppResult;

/// Platform for `settings`: the HTTP client when a key is configured,
/// otherwise `DisabledPlatform`.
pub fn platform_from_settings(settings: &PlatformSettings) -> AppResult<Arc<dyn AssistantPlatform>> {
    if !settings.is_enabled() {
        tracing::info!("[Platform] No platform API key configured, thread bookkeeping disabled");
        return Ok(Arc::new(DisabledPlatform));
    }
    Ok(Arc::new(HostedPlatformClient::new(settings)?))
}
