//! Integration Tests Module
//!
//! End-to-end tests for Analyst Gateway: file loading from the scratch
//! directory, per-conversation retention, the analysis coordinator, the
//! `pandas_agent` tool flow and the HTTP surface.

// Fixtures shared by every test module
mod common;


// Retention bound, eviction and supersession
mod retention_test;


// Registry-driven tool flow with progress reporting
mod pandas_agent_test;

// HTTP surface against a live listener
mod server_test;
