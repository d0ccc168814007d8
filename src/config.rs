//! Skillflow Configuration Module
//!
//! Config is stored in `~/.config/skillflow/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`SKILLFLOW_INVOKER`, `SKILLFLOW_COMMAND`,
//!    `SKILLFLOW_ENDPOINT`, `SKILLFLOW_WORKFLOWS_DIR`)
//! 3. Config file
//! 4. Defaults
//!
//! ```toml
//! [invoker]
//! kind = "command"
//! command = "skill-runner"
//! args = ["--json"]
//! timeout_secs = 120
//!
//! [batch]
//! concurrency = 3
//! delay_ms = 500
//!
//! [catalog]
//! workflows_dir = "~/skillflow/workflows"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillflowError};

/// Default number of batch items in flight
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default spacing between batch admissions
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkillflowConfig {
    #[serde(default)]
    pub invoker: InvokerConfig,

    #[serde(default)]
    pub batch: BatchDefaults,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Which skill invoker backs a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokerKind {
    #[default]
    Mock,
    Command,
    Http,
}

impl fmt::Display for InvokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mock => "mock",
            Self::Command => "command",
            Self::Http => "http",
        })
    }
}

impl FromStr for InvokerKind {
    type Err = SkillflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "command" => Ok(Self::Command),
            "http" => Ok(Self::Http),
            other => Err(SkillflowError::ConfigError {
                reason: format!("unknown invoker '{}' (expected mock, command or http)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvokerConfig {
    #[serde(default)]
    pub kind: InvokerKind,

    /// Program spawned per skill call (`command` kind)
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// URL receiving one POST per skill call (`http` kind)
    pub endpoint: Option<String>,

    /// Per-call timeout; none means wait indefinitely
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchDefaults {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    /// Extra workflow YAML files, loaded after the built-ins
    pub workflows_dir: Option<PathBuf>,
}

impl SkillflowConfig {
    /// Returns `~/.config/skillflow/` on Unix, `%APPDATA%/skillflow/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skillflow")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error if the file exists but is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SkillflowError::ConfigError {
            reason: format!("Failed to read config file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| SkillflowError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Empty variables are ignored.
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(kind) = non_empty_env("SKILLFLOW_INVOKER") {
            self.invoker.kind = kind.parse()?;
        }
        if let Some(command) = non_empty_env("SKILLFLOW_COMMAND") {
            self.invoker.command = Some(command);
        }
        if let Some(endpoint) = non_empty_env("SKILLFLOW_ENDPOINT") {
            self.invoker.endpoint = Some(endpoint);
        }
        if let Some(dir) = non_empty_env("SKILLFLOW_WORKFLOWS_DIR") {
            self.catalog.workflows_dir = Some(PathBuf::from(dir));
        }
        Ok(self)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_contains_skillflow() {
        let path = SkillflowConfig::config_path();
        assert!(path.to_string_lossy().contains("skillflow"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = SkillflowConfig::default();
        assert_eq!(config.invoker.kind, InvokerKind::Mock);
        assert_eq!(config.batch.concurrency, 3);
        assert_eq!(config.batch.delay_ms, 500);
        assert!(config.catalog.workflows_dir.is_none());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = SkillflowConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SkillflowConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[invoker]\nkind = \"command\"\ncommand = \"runner\"\nargs = [\"--json\"]\n\n[batch]\nconcurrency = 8\n",
        )
        .unwrap();

        let config = SkillflowConfig::load_from(&path).unwrap();
        assert_eq!(config.invoker.kind, InvokerKind::Command);
        assert_eq!(config.invoker.command.as_deref(), Some("runner"));
        assert_eq!(config.invoker.args, vec!["--json"]);
        assert_eq!(config.batch.concurrency, 8);
        assert_eq!(config.batch.delay_ms, 500);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[batch\nconcurrency = ").unwrap();

        let err = SkillflowConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "SKF-050");
    }

    #[test]
    fn test_env_overrides_config() {
        env::set_var("SKILLFLOW_ENDPOINT", "http://localhost:9000/skills");
        env::set_var("SKILLFLOW_COMMAND", "");

        let config = SkillflowConfig {
            invoker: InvokerConfig {
                command: Some("from-config".into()),
                endpoint: Some("http://config".into()),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_env()
        .unwrap();

        assert_eq!(config.invoker.endpoint.as_deref(), Some("http://localhost:9000/skills"));
        assert_eq!(config.invoker.command.as_deref(), Some("from-config"));

        env::remove_var("SKILLFLOW_ENDPOINT");
        env::remove_var("SKILLFLOW_COMMAND");
    }

    #[test]
    fn test_invoker_kind_parse() {
        assert_eq!("HTTP".parse::<InvokerKind>().unwrap(), InvokerKind::Http);
        assert!("carrier-pigeon".parse::<InvokerKind>().is_err());
    }
}
