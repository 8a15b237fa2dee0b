//! Shared harness for benchmark driver tests.

#![allow(dead_code)]

use ostore_core::engine::{
    CollectionHandle, CollectionId, EngineConfig, EngineError, EngineHandle, ObjectId, Op, SledEngine, StorageEngine,
    Transaction,
};
use ostore_core::{ObjectClient, ObjectStore, StoreConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Object-name prefixes whose operations misbehave.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_write: Vec<String>,
    pub fail_read: Vec<String>,
    /// Reads of these objects return flipped bytes.
    pub corrupt_read: Vec<String>,
}

fn hit(prefixes: &[String], oid: &ObjectId) -> bool {
    prefixes.iter().any(|p| oid.name().starts_with(p.as_str()))
}

pub struct FaultyEngine {
    inner: SledEngine,
    faults: Faults,
}

impl FaultyEngine {
    pub fn new(faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner: SledEngine::new(EngineConfig::default()),
            faults,
        })
    }

    fn wrap(&self, inner: Box<dyn EngineHandle>) -> Box<dyn EngineHandle> {
        Box::new(FaultyHandle {
            inner,
            faults: self.faults.clone(),
        })
    }
}

impl StorageEngine for FaultyEngine {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn create_store(&self, path: &Path, block_size: u64) -> Result<Box<dyn EngineHandle>, EngineError> {
        Ok(self.wrap(self.inner.create_store(path, block_size)?))
    }

    fn mount_store(&self, path: &Path) -> Result<Box<dyn EngineHandle>, EngineError> {
        Ok(self.wrap(self.inner.mount_store(path)?))
    }
}

struct FaultyHandle {
    inner: Box<dyn EngineHandle>,
    faults: Faults,
}

fn injected() -> EngineError {
    EngineError::Io(std::io::Error::other("injected fault"))
}

impl EngineHandle for FaultyHandle {
    fn create_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        self.inner.create_collection(cid)
    }

    fn open_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        self.inner.open_collection(cid)
    }

    fn submit_transaction(&self, ch: &CollectionHandle, txn: Transaction) -> Result<(), EngineError> {
        let blocked = txn
            .ops()
            .iter()
            .any(|op| matches!(op, Op::WriteAt { oid, .. } if hit(&self.faults.fail_write, oid)));
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
        if hit(&self.faults.fail_read, oid) {
            return Err(injected());
        }
        let mut data = self.inner.read_object(ch, oid, offset, length)?;
        if hit(&self.faults.corrupt_read, oid) {
            for byte in &mut data {
                *byte = !*byte;
            }
        }
        Ok(data)
    }

    fn list_objects(&self, ch: &CollectionHandle) -> Result<Vec<ObjectId>, EngineError> {
        self.inner.list_objects(ch)
    }

    fn unmount(self: Box<Self>) -> Result<(), EngineError> {
        self.inner.unmount()
    }
}

/// Create a fresh store in `dir` backed by `engine`.
pub fn new_client(dir: &TempDir, engine: Arc<dyn StorageEngine>) -> ObjectClient {
    let config = StoreConfig::default().with_block_size(256 * 1024 * 1024);
    let mut store = ObjectStore::new(dir.path().join("bench_test"), config, engine);
    store.create().expect("Failed to create store");
    ObjectClient::new(store)
}
