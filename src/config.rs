//! Catalog location configuration.
//!
//! Paths are always passed explicitly; nothing here is process-wide state.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of table definitions, relative to the project root
pub const DEFAULT_TABLES_DIR: &str = "data/tables";

/// Default location of bucket contents, relative to the project root
pub const DEFAULT_BUCKETS_DIR: &str = "data/buckets";

/// Where the data catalog lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the table tree (`<schema>/<table>/create.sql`, `seed.csv`)
    pub tables_dir: PathBuf,
    /// Root of the bucket tree
    pub buckets_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::from_project_root(Path::new("."))
    }
}

impl CatalogConfig {
    /// Default layout under a project root
    pub fn from_project_root(root: &Path) -> Self {
        Self {
            tables_dir: root.join(DEFAULT_TABLES_DIR),
            buckets_dir: root.join(DEFAULT_BUCKETS_DIR),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// Relative paths are resolved against the directory holding the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: CatalogConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.tables_dir = resolve(base, &config.tables_dir);
            config.buckets_dir = resolve(base, &config.buckets_dir);
        }

        Ok(config)
    }

    /// Replace the tables directory when an override is given
    pub fn with_tables_dir(mut self, tables_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = tables_dir {
            self.tables_dir = dir;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.tables_dir.is_dir() {
            anyhow::bail!(
                "tables directory does not exist: {}",
                self.tables_dir.display()
            );
        }
        Ok(())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
