//! Configuration types.

use crate::engine::{SortKey, SortOrder};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port for the REST API.
pub const DEFAULT_PORT: u16 = 31995;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tree: TreeConfig,
}

/// Storage and HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the REST API binds to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-tree/tasks.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Logging defaults. `RUST_LOG` and `--verbose` take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `task_tree=debug`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Presentation defaults for tree responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Sibling sort key applied when a request names none
    /// (`created_at`, `priority`, `due_date`, `title`). Unset keeps row order.
    #[serde(default)]
    pub default_sort: Option<String>,

    /// `asc` or `desc`.
    #[serde(default)]
    pub default_order: Option<String>,
}

impl TreeConfig {
    /// Sort to apply given the request's choices, falling back to the
    /// configured defaults. `None` keeps row order.
    pub fn resolve_sort(
        &self,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Option<(SortKey, SortOrder)> {
        let sort = sort.or(self.default_sort.as_deref())?;
        let key = SortKey::parse(Some(sort));
        let order = order.or(self.default_order.as_deref());
        Some((key, SortOrder::parse(order, key)))
    }
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_sort_prefers_request_over_defaults() {
        let tree = TreeConfig {
            default_sort: Some("title".to_string()),
            default_order: Some("desc".to_string()),
        };
        assert_eq!(
            tree.resolve_sort(None, None),
            Some((SortKey::Title, SortOrder::Desc))
        );
        assert_eq!(
            tree.resolve_sort(Some("priority"), Some("asc")),
            Some((SortKey::Priority, SortOrder::Asc))
        );
        assert_eq!(TreeConfig::default().resolve_sort(None, Some("desc")), None);
    }

    #[test]
    fn ensure_db_dir_creates_parent() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.db_path = temp.path().join("nested/dir/tasks.db");
        config.ensure_db_dir().unwrap();
        assert!(temp.path().join("nested/dir").is_dir());
    }
}
