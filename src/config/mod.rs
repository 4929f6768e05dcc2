//! Configuration system.
//!
//! Configuration is merged field-by-field from three tiers, later tiers
//! winning:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/task-tree/config.yaml`
//! 3. **User** - `~/.task-tree/config.yaml`
//!
//! Environment variables are applied last:
//! - `TASK_TREE_CONFIG_PATH` - Explicit config file (replaces tiers 2 and 3)
//! - `TASK_TREE_DB_PATH` - Database path
//! - `TASK_TREE_HOST` - HTTP bind host
//! - `TASK_TREE_PORT` - HTTP bind port
//! - `TASK_TREE_USER_DIR` - User config dir (default: `~/.task-tree`)
//! - `TASK_TREE_PROJECT_DIR` - Project config dir (default: `./task-tree`)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, deep_merge};
pub use types::*;
