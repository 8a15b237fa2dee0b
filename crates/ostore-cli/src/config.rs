//! Configuration file support for the ostore CLI.
//!
//! Stored at `~/.config/ostore/config.toml` (XDG) unless `--config` or
//! `OSTORE_CONFIG` names another file. Every key is optional:
//!
//! ```toml
//! root = "/srv/ostore_images"
//!
//! [store]
//! block_size = 10737418240
//! max_object_bytes = 1073741824
//!
//! [engine]
//! cache_capacity_bytes = 268435456
//! flush_on_commit = true
//! fsck_on_mount = false
//! debug = false
//!
//! [bench]
//! block_size = 4294967296
//! sizes = [4096, 65536, 1048576]
//! iterations = 100
//! payload = "random:42"
//! ```
//!
//! Precedence: built-in defaults, then this file, then environment, then flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ostore_bench::PayloadPattern;
use ostore_bench::config::BENCH_BLOCK_SIZE;
use ostore_core::StoreConfig;
use ostore_core::engine::EngineConfig;
use serde::Deserialize;

/// Directory under the home directory used when no root is configured.
pub const DEFAULT_ROOT_DIR: &str = "ostore_images";

/// Contents of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one subdirectory per named store.
    pub root: Option<PathBuf>,
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub bench: BenchDefaults,
}

/// `[bench]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchDefaults {
    /// Block region of the benchmark store.
    pub block_size: u64,
    pub sizes: Option<Vec<usize>>,
    pub iterations: Option<usize>,
    pub payload: Option<PayloadPattern>,
}

impl Default for BenchDefaults {
    fn default() -> Self {
        Self {
            block_size: BENCH_BLOCK_SIZE,
            sizes: None,
            iterations: None,
            payload: None,
        }
    }
}

impl Config {
    /// Load `explicit` (must exist) or the default file (optional).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Store root: flag or environment first, then the file, then `~/ostore_images`.
    pub fn resolve_root(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(root) = flag.or(self.root.as_deref()) {
            return Ok(root.to_path_buf());
        }
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory; pass --root"))?;
        Ok(base_dirs.home_dir().join(DEFAULT_ROOT_DIR))
    }
}

/// Default configuration file path, if a config directory exists.
pub fn config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("ostore").join("config.toml"))
}
