//! Shared harness for ostore-core integration tests.
//!
//! [`TestEngine`] wraps the sled engine, records lifecycle calls and can
//! inject failures into specific operations.

#![allow(dead_code)]

use ostore_core::engine::{
    CollectionHandle, CollectionId, EngineConfig, EngineError, EngineHandle, ObjectId, Op, SledEngine, StorageEngine,
    Transaction,
};
use ostore_core::{ObjectClient, ObjectStore, StoreConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Block region used by tests; small enough to allocate quickly.
pub const TEST_BLOCK_SIZE: u64 = 64 * 1024 * 1024;

/// Engine calls observed by [`TestEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    CreateStore,
    MountStore,
    CreateCollection,
    OpenCollection,
    Unmount,
}

/// Failures to inject.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail writes to objects whose name starts with this prefix.
    pub write_prefix: Option<String>,
    /// Fail reads of objects whose name starts with this prefix.
    pub read_prefix: Option<String>,
    pub mount_store: bool,
    pub create_collection: bool,
    pub open_collection: bool,
    pub unmount: bool,
}

pub struct TestEngine {
    inner: SledEngine,
    faults: Faults,
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestEngine {
    pub fn new(faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner: SledEngine::new(EngineConfig::default()),
            faults,
            events: Arc::default(),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::new(Faults::default())
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &EngineEvent) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    fn record(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn wrap(&self, inner: Box<dyn EngineHandle>) -> Box<dyn EngineHandle> {
        Box::new(TestHandle {
            inner,
            faults: self.faults.clone(),
            events: Arc::clone(&self.events),
        })
    }
}

impl StorageEngine for TestEngine {
    fn name(&self) -> &'static str {
        "test"
    }

    fn create_store(&self, path: &Path, block_size: u64) -> Result<Box<dyn EngineHandle>, EngineError> {
        self.record(EngineEvent::CreateStore);
        let inner = self.inner.create_store(path, block_size)?;
        Ok(self.wrap(inner))
    }

    fn mount_store(&self, path: &Path) -> Result<Box<dyn EngineHandle>, EngineError> {
        self.record(EngineEvent::MountStore);
        if self.faults.mount_store {
            return Err(injected());
        }
        let inner = self.inner.mount_store(path)?;
        Ok(self.wrap(inner))
    }
}

struct TestHandle {
    inner: Box<dyn EngineHandle>,
    faults: Faults,
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

fn injected() -> EngineError {
    EngineError::Io(std::io::Error::other("injected fault"))
}

fn matches_prefix(prefix: Option<&String>, oid: &ObjectId) -> bool {
    prefix.is_some_and(|p| oid.name().starts_with(p.as_str()))
}

impl EngineHandle for TestHandle {
    fn create_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        self.events.lock().unwrap().push(EngineEvent::CreateCollection);
        if self.faults.create_collection {
            return Err(injected());
        }
        self.inner.create_collection(cid)
    }

    fn open_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        self.events.lock().unwrap().push(EngineEvent::OpenCollection);
        if self.faults.open_collection {
            return Err(injected());
        }
        self.inner.open_collection(cid)
    }

    fn submit_transaction(&self, ch: &CollectionHandle, txn: Transaction) -> Result<(), EngineError> {
        let blocked = txn.ops().iter().any(|op| match op {
            Op::WriteAt { oid, .. } => matches_prefix(self.faults.write_prefix.as_ref(), oid),
            _ => false,
        });
        if blocked {
            return Err(injected());
        }
        self.inner.submit_transaction(ch, txn)
    }

    fn read_object(
        &self,
        ch: &CollectionHandle,
        oid: &ObjectId,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, EngineError> {
        if matches_prefix(self.faults.read_prefix.as_ref(), oid) {
            return Err(injected());
        }
        self.inner.read_object(ch, oid, offset, length)
    }

    fn list_objects(&self, ch: &CollectionHandle) -> Result<Vec<ObjectId>, EngineError> {
        self.inner.list_objects(ch)
    }

    fn unmount(self: Box<Self>) -> Result<(), EngineError> {
        self.events.lock().unwrap().push(EngineEvent::Unmount);
        let fail = self.faults.unmount;
        self.inner.unmount()?;
        if fail { Err(injected()) } else { Ok(()) }
    }
}

/// Temporary directory plus the store path inside it.
pub struct TestDir {
    pub dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    pub fn store(&self, engine: Arc<dyn StorageEngine>) -> ObjectStore {
        ObjectStore::new(self.store_path(), test_config(), engine)
    }

    /// Create a store and wrap it in a client.
    pub fn client(&self, engine: Arc<dyn StorageEngine>) -> ObjectClient {
        let mut store = self.store(engine);
        store.create().expect("Failed to create store");
        ObjectClient::new(store)
    }
}

pub fn test_config() -> StoreConfig {
    StoreConfig::default()
        .with_block_size(TEST_BLOCK_SIZE)
        .with_max_object_bytes(16 * 1024 * 1024)
}
