//! Configuration management for the governance ledger
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (ledger.toml)
//! - Environment variables (LEDGER_*)
//!
//! ## Example config file (ledger.toml):
//! ```toml
//! [data]
//! dir = "data"
//! registry = "frameworks/schema_registry.json"
//!
//! [sprint]
//! file = ".sprint"
//!
//! [workflow]
//! reports_dir = "reports"
//! archive_batches = true
//!
//! [validation]
//! collect_all = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the ledger tooling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Dataset locations
    #[serde(default)]
    pub data: DataConfig,

    /// Current-sprint resolution
    #[serde(default)]
    pub sprint: SprintConfig,

    /// Workflow run settings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Dataset locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding sprints.jsonl, issues.jsonl, tasks.jsonl
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    /// Path to the schema registry document
    #[serde(default = "default_registry_path")]
    pub registry: PathBuf,
}

/// Current-sprint resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintConfig {
    /// Explicit sprint id; takes precedence over the sprint file
    #[serde(default)]
    pub id: Option<String>,

    /// File whose trimmed contents name the current sprint
    #[serde(default = "default_sprint_file")]
    pub file: PathBuf,
}

/// Workflow run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Root directory for per-sprint run artifacts
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Archive consumed batch files into the transactions directory
    #[serde(default = "default_true")]
    pub archive_batches: bool,
}

/// Validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Collect every violation instead of stopping at the first
    #[serde(default)]
    pub collect_all: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("frameworks/schema_registry.json")
}

fn default_sprint_file() -> PathBuf {
    PathBuf::from(".sprint")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_true() -> bool {
    true
}

const FALLBACK_SPRINT: &str = "sprint-04";

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            registry: default_registry_path(),
        }
    }
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            id: None,
            file: default_sprint_file(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            archive_batches: true,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { collect_all: false }
    }
}

impl LedgerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["ledger.toml", ".ledger.toml", "config/ledger.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "govledger", "ledger") {
            let xdg_config = config_dir.config_dir().join("ledger.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (LEDGER_*)
        builder = builder.add_source(
            Environment::with_prefix("LEDGER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Resolve the current sprint id: explicit config, then the sprint
    /// file, then the fallback
    pub fn current_sprint(&self) -> String {
        if let Some(id) = &self.sprint.id {
            return id.clone();
        }
        std::fs::read_to_string(&self.sprint.file)
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_SPRINT.to_string())
    }

    /// Per-sprint transactions directory for archived batches and audits
    pub fn transactions_dir(&self) -> PathBuf {
        self.workflow
            .reports_dir
            .join(self.current_sprint())
            .join("transactions")
    }

    /// Per-sprint minutes directory
    pub fn minutes_dir(&self) -> PathBuf {
        self.workflow
            .reports_dir
            .join(self.current_sprint())
            .join("minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.data.dir, PathBuf::from("data"));
        assert!(config.workflow.archive_batches);
        assert!(!config.validation.collect_all);
    }

    #[test]
    fn test_serialize_config() {
        let config = LedgerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[workflow]"));
    }

    #[test]
    fn test_current_sprint_prefers_explicit_id() {
        let mut config = LedgerConfig::default();
        config.sprint.id = Some("sprint-07".to_string());
        assert_eq!(config.current_sprint(), "sprint-07");
    }

    #[test]
    fn test_current_sprint_reads_sprint_file() {
        let dir = tempfile::tempdir().unwrap();
        let sprint_file = dir.path().join(".sprint");
        std::fs::write(&sprint_file, "sprint-05\n").unwrap();

        let mut config = LedgerConfig::default();
        config.sprint.file = sprint_file;
        assert_eq!(config.current_sprint(), "sprint-05");
    }

    #[test]
    fn test_current_sprint_falls_back() {
        let mut config = LedgerConfig::default();
        config.sprint.file = PathBuf::from("/nonexistent/.sprint");
        assert_eq!(config.current_sprint(), "sprint-04");
    }
}
