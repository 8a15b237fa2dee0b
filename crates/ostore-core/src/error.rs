//! Error taxonomy for store lifecycle and object operations.

use crate::engine::EngineError;
use std::path::PathBuf;

/// Errors surfaced by [`ObjectStore`](crate::ObjectStore) and
/// [`ObjectClient`](crate::ObjectClient).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store path is already populated.
    #[error("store already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// A store's backing files or an object are missing.
    #[error("{what} not found")]
    NotFound {
        what: String,
        #[source]
        source: Option<EngineError>,
    },

    /// The block region could not be created.
    #[error("failed to allocate block region at {}: {source}", path.display())]
    AllocationFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine initialisation failed: {0}")]
    EngineInitFailure(#[source] EngineError),

    #[error("mount failed: {0}")]
    MountFailure(#[source] EngineError),

    #[error("unmount failed: {0}")]
    UnmountFailure(#[source] EngineError),

    #[error("write of {object} failed: {source}")]
    WriteFailure {
        object: String,
        #[source]
        source: EngineError,
    },

    #[error("read of {object} failed: {source}")]
    ReadFailure {
        object: String,
        #[source]
        source: EngineError,
    },

    #[error("delete of {object} failed: {source}")]
    DeleteFailure {
        object: String,
        #[source]
        source: EngineError,
    },
}

impl StoreError {
    /// Engine error code (negative errno) where the failure came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::NotFound { source, .. } => Some(source.as_ref().map_or(-libc::ENOENT, EngineError::code)),
            Self::AllocationFailure { source, .. } => {
                Some(source.raw_os_error().map_or(-libc::EIO, |code| -code))
            }
            Self::EngineInitFailure(e) | Self::MountFailure(e) | Self::UnmountFailure(e) => Some(e.code()),
            Self::WriteFailure { source, .. }
            | Self::ReadFailure { source, .. }
            | Self::DeleteFailure { source, .. } => Some(source.code()),
            Self::AlreadyExists { .. } => Some(-libc::EEXIST),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ObjectId;

    #[test]
    fn test_codes_carry_engine_errno() {
        let err = StoreError::DeleteFailure {
            object: "x".to_string(),
            source: EngineError::ObjectNotFound(ObjectId::new("x")),
        };
        assert_eq!(err.code(), Some(-libc::ENOENT));

        let err = StoreError::AlreadyExists { path: PathBuf::from("/tmp/s") };
        assert_eq!(err.code(), Some(-libc::EEXIST));
    }

    #[test]
    fn test_messages_name_the_object() {
        let err = StoreError::WriteFailure {
            object: "obj_4096_0".to_string(),
            source: EngineError::NoSpace { needed: 10, available: 1 },
        };
        let msg = err.to_string();
        assert!(msg.contains("obj_4096_0"));
        assert!(msg.contains("no space"));
    }
}
