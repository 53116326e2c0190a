//! Configuration loading and management.
//!
//! ## Resolution
//! 1. Explicit path (`--config`), else `TASK_TREE_CONFIG_PATH`
//! 2. `./task-tree.yaml` when present
//! 3. Built-in defaults
//!
//! Environment variables are applied on top of whichever file was used:
//! - `TASK_TREE_DB_PATH` - Database path
//! - `TASK_TREE_AI_API_KEY` - Advice provider key
//! - `TASK_TREE_AI_MODEL` - Advice provider model

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "TASK_TREE_CONFIG_PATH";
pub const DB_PATH_ENV: &str = "TASK_TREE_DB_PATH";
pub const API_KEY_ENV: &str = "TASK_TREE_AI_API_KEY";
pub const MODEL_ENV: &str = "TASK_TREE_AI_MODEL";

const PROJECT_CONFIG_FILE: &str = "task-tree.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub advice: AdviceConfig,
}

/// Where task nodes live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("task-tree").join("tasks.db"))
        .unwrap_or_else(|| PathBuf::from("tasks.db"))
}

/// Advice provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceConfig {
    /// API key. Settings saved through the CLI take priority.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (default: gemini-2.5-flash-lite).
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_tokens() -> u32 {
    1024
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the config file, load it, then apply environment overrides.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = explicit.map(Path::to_path_buf).or(env_path).or_else(|| {
            let local = PathBuf::from(PROJECT_CONFIG_FILE);
            local.exists().then_some(local)
        });

        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(db_path) = get(DB_PATH_ENV) {
            self.store.db_path = PathBuf::from(db_path);
        }
        if let Some(key) = get(API_KEY_ENV) {
            self.advice.api_key = Some(key);
        }
        if let Some(model) = get(MODEL_ENV) {
            self.advice.model = model;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.advice.model, "gemini-2.5-flash-lite");
        assert_eq!(config.advice.timeout_secs, 30);
        assert_eq!(config.advice.max_output_tokens, 1024);
        assert!(config.advice.api_key.is_none());
        assert!(config.store.db_path.ends_with("tasks.db"));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store:\n  db_path: /tmp/tree.db\nadvice:\n  model: other-model").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.store.db_path, PathBuf::from("/tmp/tree.db"));
        assert_eq!(config.advice.model, "other-model");
        assert_eq!(config.advice.base_url, default_base_url());
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store: [not, a, map").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn env_overrides_apply_and_skip_empty() {
        let env: HashMap<&str, &str> = [
            (DB_PATH_ENV, "/data/t.db"),
            (API_KEY_ENV, "k-123"),
            (MODEL_ENV, ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.db_path, PathBuf::from("/data/t.db"));
        assert_eq!(config.advice.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.advice.model, "gemini-2.5-flash-lite");
    }
}
