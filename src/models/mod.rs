//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod file_record;
pub mod progress;
pub mod settings;
pub mod table;

pub use file_record::*;
pub use progress::*;
pub use settings::*;
pub use table::*;
