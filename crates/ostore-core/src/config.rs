//! Store configuration.

use serde::{Deserialize, Serialize};

/// 10 GiB block region for stores created through the CLI.
pub const DEFAULT_BLOCK_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Read bound used when an object's length is not known up front.
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 1024 * 1024 * 1024;

/// Settings for one [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Size of the block region allocated by `create()`. Sparse on most filesystems.
    pub block_size: u64,
    /// Upper bound for whole-object reads.
    pub max_object_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub fn with_max_object_bytes(mut self, max_object_bytes: u64) -> Self {
        self.max_object_bytes = max_object_bytes;
        self
    }
}
