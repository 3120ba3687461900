//! Services
//!
//! Business logic behind the HTTP surface and the assistant's tool calls.

pub mod platform;
pub mod progress;
pub mod tabular;
pub mod tools;
