//! Storage Layer
//!
//! Configuration persistence. Conversation state is held in memory only.

pub mod config;

pub use config::*;
