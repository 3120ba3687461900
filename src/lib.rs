//! Analyst Gateway - Library
//!
//! Conversation broker between a hosted assistant platform and per-thread
//! tabular analysis. It includes:
//! - Tabular core (file locator, table loader, retention, analysis coordinator)
//! - Progress reporting for long-running analyses
//! - Hosted assistant platform client and thread bookkeeping
//! - The `pandas_agent` tool and a thin HTTP surface
//! - Configuration storage, data models and utilities

pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::AppConfig;
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
