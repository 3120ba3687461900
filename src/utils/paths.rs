//! Scratch Path Utilities
//!
//! Naming conventions for files staged in the shared scratch directory, plus
//! the configuration directory lookup.
//!
//! Uploaded files pass through several names during their lifetime:
//! - `pandas_agent_<ts>_<name>` - the staged upload
//! - `safe_<ts>_<sanitized>` - the loader's private copy
//! - `<path>.bak` - the backup taken before a superseded file is deleted

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::utils::error::{AppError, AppResult};

/// Prefix of staged uploads.
pub const STAGED_PREFIX: &str = "pandas_agent_";

/// Prefix of the loader's scratch copies.
pub const SAFE_COPY_PREFIX: &str = "safe_";

const APP_DIR_NAME: &str = "analyst-gateway";

/// Get the configuration directory (<config_dir>/analyst-gateway/)
pub fn app_config_dir() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| AppError::config("Could not determine configuration directory"))
}

/// Get the default config file path (<config_dir>/analyst-gateway/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_config_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Current Unix time in whole seconds.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current Unix time in fractional seconds.
pub fn unix_timestamp_f64() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9.]").unwrap())
}

/// Replace every character outside `[A-Za-z0-9.]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "_").into_owned()
}

/// `pandas_agent_<ts>_<name>`
pub fn staged_file_name(timestamp: i64, name: &str) -> String {
    format!("{}{}_{}", STAGED_PREFIX, timestamp, name)
}

/// `safe_<ts>_<sanitized name>`
pub fn safe_copy_name(timestamp: i64, name: &str) -> String {
    format!("{}{}_{}", SAFE_COPY_PREFIX, timestamp, sanitize_file_name(name))
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}
