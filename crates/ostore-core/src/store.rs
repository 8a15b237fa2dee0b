//! Store lifecycle: create, mount, teardown.
//!
//! [`ObjectStore`] owns one store directory and, while mounted, the engine
//! session plus the single collection handle every object operation uses.
//!
//! ```text
//! Fresh --create()--> Mounted --teardown()--> UnmountedAfterUse
//!                        ^                          |
//! CreatedUnmounted --mount_existing()---------------+
//! ```
//!
//! Teardown releases the collection handle, then unmounts the engine (which
//! consumes and frees the engine handle). It runs at most once per mount and
//! is also run by `Drop`, so every exit path releases the store.

use crate::config::StoreConfig;
use crate::engine::{BLOCK_FILE, CollectionHandle, CollectionId, EngineError, EngineHandle, StorageEngine, Transaction};
use crate::error::{Result, StoreError};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lifecycle state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No backing files at the path.
    Fresh,
    /// Backing files exist; not mounted by this handle.
    CreatedUnmounted,
    /// Engine session open and collection handle valid.
    Mounted,
    /// Was mounted by this handle and has been torn down.
    UnmountedAfterUse,
}

impl std::fmt::Display for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fresh => "fresh",
            Self::CreatedUnmounted => "created-unmounted",
            Self::Mounted => "mounted",
            Self::UnmountedAfterUse => "unmounted-after-use",
        };
        f.write_str(name)
    }
}

/// Open engine session together with its collection handle.
struct Session {
    handle: Box<dyn EngineHandle>,
    collection: Option<CollectionHandle>,
}

/// One store instance bound to a directory.
pub struct ObjectStore {
    path: PathBuf,
    config: StoreConfig,
    engine: Arc<dyn StorageEngine>,
    cid: CollectionId,
    state: StoreState,
    session: Option<Session>,
}

impl ObjectStore {
    /// Bind to `path`. Nothing is created or mounted yet.
    pub fn new(path: impl Into<PathBuf>, config: StoreConfig, engine: Arc<dyn StorageEngine>) -> Self {
        let path = path.into();
        let state = if path.join(BLOCK_FILE).exists() {
            StoreState::CreatedUnmounted
        } else {
            StoreState::Fresh
        };

        Self {
            path,
            config,
            engine,
            cid: CollectionId::default(),
            state,
            session: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.cid
    }

    /// Create a new store: allocate the block region, initialise the engine,
    /// mount it and create the collection.
    pub fn create(&mut self) -> Result<()> {
        if is_populated(&self.path) {
            return Err(StoreError::AlreadyExists { path: self.path.clone() });
        }

        let block_size = self.config.block_size;
        allocate_block_region(&self.path, block_size).map_err(|source| StoreError::AllocationFailure {
            path: self.path.join(BLOCK_FILE),
            source,
        })?;
        self.state = StoreState::CreatedUnmounted;

        let mut handle = self
            .engine
            .create_store(&self.path, block_size)
            .map_err(StoreError::EngineInitFailure)?;

        match create_collection(handle.as_mut(), &self.cid) {
            Ok(collection) => {
                self.attach(handle, collection);
                tracing::info!(
                    path = %self.path.display(),
                    block_size,
                    engine = self.engine.name(),
                    "Store created"
                );
                Ok(())
            }
            Err(e) => {
                release_failed_session(handle, &self.path);
                Err(StoreError::EngineInitFailure(e))
            }
        }
    }

    /// Mount a store created earlier. A no-op when already mounted.
    pub fn mount_existing(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        if !self.path.join(BLOCK_FILE).exists() {
            return Err(StoreError::NotFound {
                what: format!("store at {}", self.path.display()),
                source: None,
            });
        }

        let mut handle = self
            .engine
            .mount_store(&self.path)
            .map_err(StoreError::MountFailure)?;

        match handle.open_collection(&self.cid) {
            Ok(collection) => {
                self.attach(handle, collection);
                tracing::debug!(path = %self.path.display(), "Store mounted");
                Ok(())
            }
            Err(e) => {
                release_failed_session(handle, &self.path);
                Err(StoreError::MountFailure(e))
            }
        }
    }

    /// Mount lazily and hand out the engine session and collection handle.
    pub fn ensure_mounted(&mut self) -> Result<(&dyn EngineHandle, &CollectionHandle)> {
        self.mount_existing()?;

        match &self.session {
            Some(Session {
                handle,
                collection: Some(collection),
            }) => Ok((&**handle, collection)),
            _ => Err(StoreError::MountFailure(EngineError::CollectionNotFound(self.cid.clone()))),
        }
    }

    /// Release the collection handle, unmount, release the engine handle.
    ///
    /// Idempotent: returns `Ok` when nothing is mounted.
    pub fn teardown(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        self.state = StoreState::UnmountedAfterUse;

        drop(session.collection.take());
        session.handle.unmount().map_err(StoreError::UnmountFailure)?;

        tracing::debug!(path = %self.path.display(), "Store torn down");
        Ok(())
    }

    /// Remove a store directory and everything in it. Must not be mounted.
    pub fn destroy(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)?;
            tracing::debug!(path = %path.display(), "Store removed");
        }
        Ok(())
    }

    fn attach(&mut self, handle: Box<dyn EngineHandle>, collection: CollectionHandle) {
        self.session = Some(Session {
            handle,
            collection: Some(collection),
        });
        self.state = StoreState::Mounted;
    }
}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Tearing down {} on drop", self.path.display());
            if let Err(e) = self.teardown() {
                tracing::warn!("Failed to tear down store at {}: {}", self.path.display(), e);
            }
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("path", &self.path)
            .field("engine", &self.engine.name())
            .field("collection", &self.cid)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Existing file, or directory with at least one entry.
fn is_populated(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => path.exists(),
    }
}

fn allocate_block_region(dir: &Path, size: u64) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let block = File::create(dir.join(BLOCK_FILE))?;
    block.set_len(size)?;
    block.sync_all()
}

fn create_collection(handle: &mut dyn EngineHandle, cid: &CollectionId) -> std::result::Result<CollectionHandle, EngineError> {
    let collection = handle.create_collection(cid)?;
    handle.submit_transaction(&collection, Transaction::new().create_collection(cid.clone()))?;
    Ok(collection)
}

/// Unmount a session that never became usable. The original error wins.
fn release_failed_session(handle: Box<dyn EngineHandle>, path: &Path) {
    if let Err(e) = handle.unmount() {
        tracing::warn!("Failed to unmount half-initialised store at {}: {}", path.display(), e);
    }
}
