//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with a request timeout.

use std::time::Duration;

/// Build a `reqwest::Client` with the given request timeout.
///
/// Falls back to a default client if the builder rejects the configuration.
pub fn build_http_client(timeout_secs: Option<u64>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs.filter(|s| *s > 0) {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("[HttpClient] Failed to build configured client, using default: {}", e);
        reqwest::Client::new()
    })
}
