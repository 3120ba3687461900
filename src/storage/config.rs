//! JSON Configuration Management
//!
//! Loads the application configuration file and layers environment
//! overrides on top of it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::config_path;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ANALYST_GATEWAY_CONFIG";

/// Configuration service for app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load the configuration from `$ANALYST_GATEWAY_CONFIG` or the default
    /// location, then apply environment overrides.
    pub fn new() -> AppResult<Self> {
        let config_path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => config_path()?,
        };
        Self::load(config_path, |key| std::env::var(key).ok())
    }

    /// Load from `config_path` (defaults when absent) with overrides read
    /// through `env`.
    pub fn load<F>(config_path: PathBuf, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            tracing::info!(
                "[Config] No config file at {}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        };

        apply_env_overrides(&mut config, env);
        config.validate().map_err(AppError::validation)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    pub fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> AppConfig {
        self.config.clone()
    }

    /// Path the configuration was read from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(bind) = var("ANALYST_GATEWAY_BIND") {
        config.bind_addr = bind;
    }
    if let Some(dir) = var("ANALYST_GATEWAY_SCRATCH_DIR") {
        config.scratch_dir = PathBuf::from(dir);
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = var("OPENAI_BASE_URL") {
        config.llm.base_url = Some(url);
    }
    if let Some(url) = var("ASSISTANT_PLATFORM_URL") {
        config.platform.base_url = url;
    }
    if let Some(key) = var("ASSISTANT_PLATFORM_KEY") {
        config.platform.api_key = Some(key);
    }
}
