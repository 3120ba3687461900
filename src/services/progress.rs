//! Progress Reporter
//!
//! Process-wide map of operation id to latest status, polled through
//! `GET /operation-status/{id}`, plus the cosmetic ticker that advances an
//! operation's percentage while the analysis runs.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{OperationPhase, OperationStatus};
use crate::utils::paths::{unix_timestamp, unix_timestamp_f64};

/// Percentage the ticker starts from.
pub const TICKER_START: f64 = 50.0;

/// Percentage the ticker never exceeds.
pub const TICKER_CEILING: f64 = 85.0;

/// Increment per tick.
pub const TICKER_STEP: f64 = 2.0;

/// `pandas_agent_<ts>_<4 hex>`
pub fn new_operation_id() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("pandas_agent_{}_{:04x}", unix_timestamp(), suffix)
}

/// Latest status of every operation.
#[derive(Debug, Default)]
pub struct ProgressStore {
    operations: DashMap<String, OperationStatus>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new status for `operation_id`.
    pub fn update(&self, operation_id: &str, status: OperationPhase, progress: f64, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(
            "[Progress] Operation {}: {} - {:.0}% - {}",
            operation_id,
            status.as_str(),
            progress,
            message
        );
        self.operations.insert(
            operation_id.to_string(),
            OperationStatus {
                status,
                progress: progress.clamp(0.0, 100.0),
                message,
                updated_at: unix_timestamp_f64(),
            },
        );
    }

    pub fn get(&self, operation_id: &str) -> Option<OperationStatus> {
        self.operations.get(operation_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Background task advancing an operation from 50% towards 85%.
///
/// Stops on `finish` or when dropped. The ticker never fails the operation
/// it decorates: without a runtime it simply does not start.
pub struct ProgressTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(store: Arc<ProgressStore>, operation_id: &str, interval: Duration) -> Self {
        let cancel = CancellationToken::new();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("[Progress] Could not start progress ticker for {}: {}", operation_id, e);
                return Self { cancel, handle: None };
            }
        };

        let token = cancel.clone();
        let operation_id = operation_id.to_string();
        let handle = runtime.spawn(async move {
            let mut progress = TICKER_START;
            while progress < TICKER_CEILING {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = token.cancelled() => break,
                }
                progress += TICKER_STEP;
                store.update(
                    &operation_id,
                    OperationPhase::Executing,
                    progress.min(TICKER_CEILING),
                    "Analysis in progress...",
                );
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop ticking and wait for the task to exit.
    pub async fn finish(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("[Progress] Progress ticker ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
