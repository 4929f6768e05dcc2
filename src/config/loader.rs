//! Configuration loader with tier-based merging.

use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// Objects merge key by key; any other overlay value replaces the base.
/// A null overlay means "not specified" and keeps the base.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TASK_TREE_USER_DIR or ~/.task-tree
        let user_dir = std::env::var("TASK_TREE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-tree")));

        // Project dir: TASK_TREE_PROJECT_DIR or $CWD/task-tree
        let project_dir = std::env::var("TASK_TREE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-tree")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Read a YAML file as a JSON value. Missing files are skipped silently;
/// unreadable or malformed ones are skipped with a warning.
fn read_tier(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| serde_yaml::from_str::<Value>(&content).map_err(Into::into));
    match parsed {
        Ok(value) => {
            debug!(path = %path.display(), "loaded config tier");
            Some(value)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any.
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var("TASK_TREE_CONFIG_PATH") {
            return Self::load_file(PathBuf::from(explicit), ConfigPaths::discover());
        }
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load a single explicit config file on top of the defaults.
    pub fn load_file(path: PathBuf, paths: ConfigPaths) -> Result<Self> {
        let mut config = Config::load(&path)
            .with_context(|| format!("loading config file {}", path.display()))?;
        Self::apply_env_overrides(&mut config);
        Ok(Self {
            paths,
            config,
            config_path: Some(path),
        })
    }

    /// Load configuration with explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;
        let mut config_path = None;

        for dir in [&paths.project_dir, &paths.user_dir].into_iter().flatten() {
            let file = dir.join("config.yaml");
            if let Some(value) = read_tier(&file) {
                merged = deep_merge(merged, value);
                config_path = Some(file);
            }
        }

        let mut config: Config = serde_json::from_value(merged)?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(db_path) = std::env::var("TASK_TREE_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(host) = std::env::var("TASK_TREE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("TASK_TREE_PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!(value = %port, "ignoring invalid TASK_TREE_PORT"),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PORT;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn merge_overrides_nested_keys_only() {
        let base = json!({"server": {"host": "localhost", "port": 8080}, "debug": true});
        let overlay = json!({"server": {"port": 9000}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"server": {"host": "localhost", "port": 9000}, "debug": true})
        );
    }

    #[test]
    fn merge_null_keeps_base() {
        assert_eq!(deep_merge(json!({"a": 1}), Value::Null), json!({"a": 1}));
        assert_eq!(
            deep_merge(json!({"a": 1}), json!({"a": null})),
            json!({"a": 1})
        );
    }

    #[test]
    fn defaults_when_no_files() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();

        assert_eq!(loader.config().server.port, DEFAULT_PORT);
        assert_eq!(loader.config().server.host, "127.0.0.1");
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn user_tier_overrides_project_tier() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-tree");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "server:\n  port: 4000\n  host: 0.0.0.0\ntree:\n  default_sort: priority\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "server:\n  port: 5000\n").unwrap();

        let loader =
            ConfigLoader::load_with_paths(ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone())))
                .unwrap();
        let config = loader.config();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.tree.default_sort.as_deref(), Some("priority"));
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn malformed_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-tree");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server: [not, a, map").unwrap();

        let loader =
            ConfigLoader::load_with_paths(ConfigPaths::with_dirs(Some(project_dir), None)).unwrap();

        assert_eq!(loader.config().server.port, DEFAULT_PORT);
    }

    #[test]
    fn explicit_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("custom.yaml");
        std::fs::write(&file, "server:\n  db_path: /tmp/x.db\nlogging:\n  filter: debug\n").unwrap();

        let loader = ConfigLoader::load_file(file.clone(), ConfigPaths::with_dirs(None, None)).unwrap();

        assert_eq!(loader.config().server.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(loader.config().logging.filter, "debug");
        assert_eq!(loader.config().server.port, DEFAULT_PORT);
    }
}
