//! Vault configuration
//!
//! Loaded once from a JSON file and passed by reference into every
//! component. Nothing reads configuration from global state.
//!
//! ```json
//! {
//!   "pages_dir": "./pages",
//!   "required_pages_dir": "./required-pages",
//!   "data_dir": "./data",
//!   "versioning": {
//!     "delta_storage": true,
//!     "compression": "gzip",
//!     "checkpoint_interval": 10,
//!     "cache_size": 50
//!   },
//!   "migration": { "max_parallel_pages": 4 }
//! }
//! ```
//!
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::observability::{emit, Event, Severity};
use crate::store::StoreLayout;

/// Upper bound on concurrent page migrations
pub const MAX_PARALLEL_PAGES: usize = 64;

/// Payload compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// Version storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Store versions after v1 as deltas against their predecessor
    #[serde(default = "default_delta_storage")]
    pub delta_storage: bool,

    #[serde(default)]
    pub compression: Compression,

    /// Every Nth version is a full snapshot (default 10)
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,

    /// Reconstructed versions kept in memory, 0 disables (default 50)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Migration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Pages migrated concurrently, 1 is sequential (default 1)
    #[serde(default = "default_max_parallel_pages")]
    pub max_parallel_pages: usize,
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    #[serde(default = "default_required_pages_dir")]
    pub required_pages_dir: PathBuf,

    /// Holds `page-index.json` and migration reports
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub versioning: VersioningConfig,

    #[serde(default)]
    pub migration: MigrationConfig,
}

fn default_delta_storage() -> bool {
    true
}
fn default_checkpoint_interval() -> u64 {
    10
}
fn default_cache_size() -> usize {
    50
}
fn default_max_parallel_pages() -> usize {
    1
}
fn default_pages_dir() -> PathBuf {
    PathBuf::from("./pages")
}
fn default_required_pages_dir() -> PathBuf {
    PathBuf::from("./required-pages")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            delta_storage: default_delta_storage(),
            compression: Compression::default(),
            checkpoint_interval: default_checkpoint_interval(),
            cache_size: default_cache_size(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_parallel_pages: default_max_parallel_pages(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            required_pages_dir: default_required_pages_dir(),
            data_dir: default_data_dir(),
            versioning: VersioningConfig::default(),
            migration: MigrationConfig::default(),
        }
    }
}

impl VersioningConfig {
    /// Whether version `n` is written as full content
    pub fn is_full_snapshot(&self, version: u64) -> bool {
        version <= 1 || !self.delta_storage || version % self.checkpoint_interval == 0
    }

    pub fn compress(&self) -> bool {
        self.compression == Compression::Gzip
    }
}

impl VaultConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> VaultResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| VaultError::io(path, e))?;

        let config = Self::from_json(&content)?;

        let path_str = path.display().to_string();
        emit(Severity::Info, Event::ConfigLoaded, &[("path", &path_str)]);

        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(json: &str) -> VaultResult<Self> {
        let config: VaultConfig = serde_json::from_str(json)
            .map_err(|e| VaultError::InvalidArgument(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Configuration with every directory inside `root`
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            pages_dir: root.to_path_buf(),
            required_pages_dir: root.join("required-pages"),
            data_dir: root.to_path_buf(),
            ..Self::default()
        }
    }

    /// Validate value ranges
    pub fn validate(&self) -> VaultResult<()> {
        if self.versioning.checkpoint_interval < 2 {
            return Err(VaultError::InvalidArgument(format!(
                "checkpoint_interval must be >= 2, got {}",
                self.versioning.checkpoint_interval
            )));
        }

        let parallel = self.migration.max_parallel_pages;
        if parallel == 0 || parallel > MAX_PARALLEL_PAGES {
            return Err(VaultError::InvalidArgument(format!(
                "max_parallel_pages must be between 1 and {}, got {}",
                MAX_PARALLEL_PAGES, parallel
            )));
        }

        for (name, dir) in [
            ("pages_dir", &self.pages_dir),
            ("required_pages_dir", &self.required_pages_dir),
            ("data_dir", &self.data_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(VaultError::InvalidArgument(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    /// Resolved directory layout
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.pages_dir, &self.required_pages_dir, &self.data_dir)
    }
}
