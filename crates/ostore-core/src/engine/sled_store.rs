//! Reference storage engine backed by sled.
//!
//! Layout of a store directory:
//!
//! ```text
//! <store>/block   fixed-size block region (allocated by the lifecycle manager)
//! <store>/db/     sled database
//! ```
//!
//! The `meta` tree holds the superblock and the collection registry. Each
//! collection lives in its own tree. A transaction runs as one sled
//! transaction over `meta` and the collection tree, so every op in it commits
//! or none does.

// Object offsets and lengths are u64 on the wire and usize in memory.
#![allow(clippy::cast_possible_truncation)]

use super::{
    BLOCK_FILE, CollectionHandle, CollectionId, EngineError, EngineHandle, ObjectId, Op,
    StorageEngine, Transaction,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError, TransactionalTree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const DB_DIR: &str = "db";
const META_TREE: &str = "meta";
const SUPERBLOCK_KEY: &[u8] = b"superblock";
const MAGIC: &str = "ostore";
const FORMAT_VERSION: u32 = 1;

/// Mount generations are unique per process so handles never outlive a session.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Tuning knobs for [`SledEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validate superblock and block region when mounting.
    pub fsck_on_mount: bool,
    /// Validate superblock and block region before unmounting.
    pub fsck_on_unmount: bool,
    /// sled page cache size.
    pub cache_capacity_bytes: u64,
    /// Flush sled to disk after every committed transaction.
    pub flush_on_commit: bool,
    /// Let the engine's internal crates log at debug level.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fsck_on_mount: false,
            fsck_on_unmount: false,
            cache_capacity_bytes: 256 * 1024 * 1024,
            flush_on_commit: true,
            debug: false,
        }
    }
}

/// Persistent store header kept in the `meta` tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub magic: String,
    pub version: u32,
    /// Size of the block region; upper bound for stored bytes.
    pub block_size: u64,
    /// Logical bytes currently stored across all collections.
    pub used_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl Superblock {
    fn new(block_size: u64) -> Self {
        Self {
            magic: MAGIC.to_string(),
            version: FORMAT_VERSION,
            block_size,
            used_bytes: 0,
            created_at: Utc::now(),
        }
    }

    fn available(&self) -> u64 {
        self.block_size.saturating_sub(self.used_bytes)
    }
}

/// sled-backed [`StorageEngine`].
#[derive(Debug, Clone, Default)]
pub struct SledEngine {
    config: EngineConfig,
}

impl SledEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn open_db(&self, path: &Path) -> Result<sled::Db, EngineError> {
        let flush_every_ms = if self.config.flush_on_commit { None } else { Some(500) };
        let db = sled::Config::new()
            .path(path.join(DB_DIR))
            .cache_capacity(self.config.cache_capacity_bytes)
            .flush_every_ms(flush_every_ms)
            .open()?;
        Ok(db)
    }

    fn session(&self, path: &Path, db: sled::Db) -> Result<SledSession, EngineError> {
        let meta = db.open_tree(META_TREE)?;
        Ok(SledSession {
            path: path.to_path_buf(),
            db,
            meta,
            collections: HashMap::new(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            config: self.config.clone(),
        })
    }
}

impl StorageEngine for SledEngine {
    fn name(&self) -> &'static str {
        "sled"
    }

    fn create_store(&self, path: &Path, block_size: u64) -> Result<Box<dyn EngineHandle>, EngineError> {
        let block_len = std::fs::metadata(path.join(BLOCK_FILE))?.len();
        if block_len < block_size {
            return Err(invalid(path, format!("block region is {block_len} bytes, expected {block_size}")));
        }
        if path.join(DB_DIR).exists() {
            return Err(invalid(path, "store is already initialised"));
        }

        let db = self.open_db(path)?;
        let session = self.session(path, db)?;
        let superblock = Superblock::new(block_size);
        session.meta.insert(SUPERBLOCK_KEY, encode_superblock(&superblock)?)?;
        session.db.flush()?;

        tracing::info!(path = %path.display(), block_size, "Created store");
        Ok(Box::new(session))
    }

    fn mount_store(&self, path: &Path) -> Result<Box<dyn EngineHandle>, EngineError> {
        if !path.join(DB_DIR).is_dir() {
            return Err(invalid(path, "store was never initialised"));
        }

        let db = self.open_db(path)?;
        let session = self.session(path, db)?;
        let superblock = session.superblock()?;
        if self.config.fsck_on_mount {
            session.fsck(&superblock)?;
        }

        tracing::info!(
            path = %path.display(),
            used_bytes = superblock.used_bytes,
            generation = session.generation,
            "Mounted store"
        );
        Ok(Box::new(session))
    }
}

/// One mounted sled store.
struct SledSession {
    path: PathBuf,
    db: sled::Db,
    meta: sled::Tree,
    collections: HashMap<CollectionId, sled::Tree>,
    generation: u64,
    config: EngineConfig,
}

impl SledSession {
    fn superblock(&self) -> Result<Superblock, EngineError> {
        let bytes = self
            .meta
            .get(SUPERBLOCK_KEY)?
            .ok_or_else(|| invalid(&self.path, "missing superblock"))?;
        decode_superblock(&bytes)
    }

    fn fsck(&self, superblock: &Superblock) -> Result<(), EngineError> {
        if superblock.magic != MAGIC || superblock.version != FORMAT_VERSION {
            return Err(invalid(
                &self.path,
                format!("unsupported format {} v{}", superblock.magic, superblock.version),
            ));
        }

        let block_len = std::fs::metadata(self.path.join(BLOCK_FILE))?.len();
        if block_len < superblock.block_size {
            return Err(invalid(
                &self.path,
                format!("block region shrank to {block_len} bytes (superblock says {})", superblock.block_size),
            ));
        }

        let trees = self.db.tree_names();
        for entry in self.meta.scan_prefix(COLLECTION_PREFIX) {
            let (key, _) = entry?;
            if !trees.iter().any(|name| *name == key) {
                let name = String::from_utf8_lossy(&key).into_owned();
                return Err(invalid(&self.path, format!("registered collection {name} has no tree")));
            }
        }

        tracing::debug!(path = %self.path.display(), "fsck passed");
        Ok(())
    }

    fn tree(&self, ch: &CollectionHandle) -> Result<&sled::Tree, EngineError> {
        if ch.generation() != self.generation {
            return Err(EngineError::StaleHandle(ch.cid().clone()));
        }
        self.collections
            .get(ch.cid())
            .ok_or_else(|| EngineError::CollectionNotFound(ch.cid().clone()))
    }

    fn attach(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        let tree = self.db.open_tree(collection_key(cid))?;
        self.collections.insert(cid.clone(), tree);
        Ok(CollectionHandle::new(cid.clone(), self.generation))
    }
}

impl EngineHandle for SledSession {
    fn create_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        if self.meta.contains_key(collection_key(cid))? {
            return Err(EngineError::CollectionExists(cid.clone()));
        }
        self.attach(cid)
    }

    fn open_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError> {
        if !self.meta.contains_key(collection_key(cid))? {
            return Err(EngineError::CollectionNotFound(cid.clone()));
        }
        self.attach(cid)
    }

    fn submit_transaction(&self, ch: &CollectionHandle, txn: Transaction) -> Result<(), EngineError> {
        if txn.is_empty() {
            return Err(EngineError::EmptyTransaction);
        }
        let objects = self.tree(ch)?;

        (&self.meta, objects)
            .transaction(|(meta, objects)| apply_ops(meta, objects, &txn))
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => EngineError::Storage(e),
            })?;

        if self.config.flush_on_commit {
            self.db.flush()?;
        }

        tracing::trace!(collection = %ch.cid(), ops = txn.ops().len(), bytes = txn.payload_len(), "Committed transaction");
        Ok(())
    }

    fn read_object(
        &self,
        ch: &CollectionHandle,
        oid: &ObjectId,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, EngineError> {
        let content = self
            .tree(ch)?
            .get(oid.to_key())?
            .ok_or_else(|| EngineError::ObjectNotFound(oid.clone()))?;

        let len = content.len() as u64;
        let start = offset.min(len) as usize;
        let end = offset.saturating_add(length).min(len) as usize;
        Ok(content[start..end].to_vec())
    }

    fn list_objects(&self, ch: &CollectionHandle) -> Result<Vec<ObjectId>, EngineError> {
        let mut objects = Vec::new();
        for key in self.tree(ch)?.iter().keys() {
            if let Some(oid) = ObjectId::from_key(&key?) {
                objects.push(oid);
            }
        }
        Ok(objects)
    }

    fn unmount(self: Box<Self>) -> Result<(), EngineError> {
        if self.config.fsck_on_unmount {
            let superblock = self.superblock()?;
            self.fsck(&superblock)?;
        }
        self.db.flush()?;
        tracing::info!(path = %self.path.display(), generation = self.generation, "Unmounted store");
        Ok(())
    }
}

const COLLECTION_PREFIX: &str = "coll:";

fn collection_key(cid: &CollectionId) -> Vec<u8> {
    format!("{COLLECTION_PREFIX}{cid}").into_bytes()
}

fn invalid(path: &Path, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidStore {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn encode_superblock(superblock: &Superblock) -> Result<Vec<u8>, EngineError> {
    serde_json::to_vec(superblock).map_err(|e| EngineError::InvalidStore {
        path: String::new(),
        reason: format!("cannot encode superblock: {e}"),
    })
}

fn decode_superblock(bytes: &[u8]) -> Result<Superblock, EngineError> {
    serde_json::from_slice(bytes).map_err(|e| EngineError::InvalidStore {
        path: String::new(),
        reason: format!("corrupt superblock: {e}"),
    })
}

/// Body of a transaction; any `Err` aborts the whole sled transaction.
fn apply_ops(
    meta: &TransactionalTree,
    objects: &TransactionalTree,
    txn: &Transaction,
) -> ConflictableTransactionResult<(), EngineError> {
    let bytes = meta
        .get(SUPERBLOCK_KEY)?
        .ok_or_else(|| abort(EngineError::InvalidStore {
            path: String::new(),
            reason: "missing superblock".to_string(),
        }))?;
    let mut superblock = decode_superblock(&bytes).map_err(abort)?;

    for op in txn.ops() {
        match op {
            Op::CreateCollection(cid) => {
                let key = collection_key(cid);
                if meta.get(&key)?.is_some() {
                    return Err(abort(EngineError::CollectionExists(cid.clone())));
                }
                meta.insert(key, Vec::new())?;
            }
            Op::WriteAt { oid, offset, data } => {
                let key = oid.to_key();
                let mut content = objects.get(&key)?.map(|v| v.to_vec()).unwrap_or_default();
                let before = content.len() as u64;

                let no_space = |needed: u64| {
                    abort(EngineError::NoSpace {
                        needed,
                        available: superblock.available(),
                    })
                };
                let end = offset
                    .checked_add(data.len() as u64)
                    .ok_or_else(|| no_space(u64::MAX))?;
                let grown = end.saturating_sub(before);
                if grown > superblock.available() {
                    return Err(no_space(grown));
                }
                let (Ok(start), Ok(end)) = (usize::try_from(*offset), usize::try_from(end)) else {
                    return Err(no_space(grown));
                };

                if content.len() < end {
                    content.resize(end, 0);
                }
                content[start..end].copy_from_slice(data);

                superblock.used_bytes += grown;
                objects.insert(key, content)?;
            }
            Op::RemoveObject(oid) => match objects.remove(oid.to_key())? {
                Some(old) => {
                    superblock.used_bytes = superblock.used_bytes.saturating_sub(old.len() as u64);
                }
                None => return Err(abort(EngineError::ObjectNotFound(oid.clone()))),
            },
        }
    }

    meta.insert(SUPERBLOCK_KEY, encode_superblock(&superblock).map_err(abort)?)?;
    Ok(())
}

fn abort(e: EngineError) -> ConflictableTransactionError<EngineError> {
    ConflictableTransactionError::Abort(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const BLOCK: u64 = 1024 * 1024;

    fn allocate(dir: &Path, size: u64) {
        File::create(dir.join(BLOCK_FILE)).unwrap().set_len(size).unwrap();
    }

    fn created_store() -> (TempDir, Box<dyn EngineHandle>, CollectionHandle) {
        let temp = TempDir::new().unwrap();
        allocate(temp.path(), BLOCK);
        let engine = SledEngine::default();
        let mut handle = engine.create_store(temp.path(), BLOCK).unwrap();
        let cid = CollectionId::default();
        let ch = handle.create_collection(&cid).unwrap();
        handle
            .submit_transaction(&ch, Transaction::new().create_collection(cid))
            .unwrap();
        (temp, handle, ch)
    }

    #[test]
    fn test_create_requires_block_region() {
        let temp = TempDir::new().unwrap();
        let err = SledEngine::default().create_store(temp.path(), BLOCK).err().unwrap();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_create_rejects_short_block_region() {
        let temp = TempDir::new().unwrap();
        allocate(temp.path(), 10);
        let err = SledEngine::default().create_store(temp.path(), BLOCK).err().unwrap();
        assert!(matches!(err, EngineError::InvalidStore { .. }));
    }

    #[test]
    fn test_write_overwrites_range_and_keeps_tail() {
        let (_temp, handle, ch) = created_store();
        let oid = ObjectId::new("obj");

        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 0, b"hello world".to_vec()))
            .unwrap();
        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 0, b"HELLO".to_vec()))
            .unwrap();

        let data = handle.read_object(&ch, &oid, 0, 1024).unwrap();
        assert_eq!(data, b"HELLO world");
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let (_temp, handle, ch) = created_store();
        let oid = ObjectId::new("sparse");

        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 4, b"ab".to_vec()))
            .unwrap();

        assert_eq!(handle.read_object(&ch, &oid, 0, 100).unwrap(), vec![0, 0, 0, 0, b'a', b'b']);
        assert_eq!(handle.read_object(&ch, &oid, 5, 100).unwrap(), b"b");
        assert!(handle.read_object(&ch, &oid, 50, 100).unwrap().is_empty());
    }

    #[test]
    fn test_failed_op_aborts_whole_transaction() {
        let (_temp, handle, ch) = created_store();
        let kept = ObjectId::new("kept");

        let txn = Transaction::new()
            .write(kept.clone(), 0, b"data".to_vec())
            .remove(ObjectId::new("missing"));
        let err = handle.submit_transaction(&ch, txn).unwrap_err();
        assert!(matches!(err, EngineError::ObjectNotFound(_)));

        let err = handle.read_object(&ch, &kept, 0, 10).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (_temp, handle, ch) = created_store();
        let big = vec![7u8; BLOCK as usize + 1];

        let err = handle
            .submit_transaction(&ch, Transaction::new().write(ObjectId::new("big"), 0, big))
            .unwrap_err();
        assert!(matches!(err, EngineError::NoSpace { .. }));
        assert_eq!(err.code(), -libc::ENOSPC);
    }

    #[test]
    fn test_empty_transaction_is_rejected() {
        let (_temp, handle, ch) = created_store();
        let err = handle.submit_transaction(&ch, Transaction::new()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyTransaction));
        assert_eq!(err.code(), -libc::EINVAL);
    }

    #[test]
    fn test_write_far_past_end_is_rejected() {
        let (_temp, handle, ch) = created_store();
        let oid = ObjectId::new("o");

        for offset in [u64::MAX - 1, BLOCK, u64::from(u32::MAX) * 4] {
            let err = handle
                .submit_transaction(&ch, Transaction::new().write(oid.clone(), offset, b"abcd".to_vec()))
                .unwrap_err();
            assert!(matches!(err, EngineError::NoSpace { .. }), "offset {offset}: {err:?}");
        }

        assert!(handle.read_object(&ch, &oid, 0, 10).unwrap_err().is_not_found());
        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 0, b"abcd".to_vec()))
            .unwrap();
    }

    #[test]
    fn test_remove_releases_space() {
        let (_temp, handle, ch) = created_store();
        let oid = ObjectId::new("obj");
        let half = vec![1u8; (BLOCK / 2) as usize + 1];

        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 0, half.clone()))
            .unwrap();
        handle.submit_transaction(&ch, Transaction::new().remove(oid.clone())).unwrap();
        handle
            .submit_transaction(&ch, Transaction::new().write(ObjectId::new("a"), 0, half.clone()))
            .unwrap();
    }

    #[test]
    fn test_open_collection_requires_committed_create() {
        let temp = TempDir::new().unwrap();
        allocate(temp.path(), BLOCK);
        let engine = SledEngine::default();

        let mut handle = engine.create_store(temp.path(), BLOCK).unwrap();
        let cid = CollectionId::default();
        handle.create_collection(&cid).unwrap();
        handle.unmount().unwrap();

        let mut handle = engine.mount_store(temp.path()).unwrap();
        let err = handle.open_collection(&cid).unwrap_err();
        assert!(matches!(err, EngineError::CollectionNotFound(_)));
        handle.unmount().unwrap();
    }

    #[test]
    fn test_data_survives_remount_and_old_handle_is_stale() {
        let (temp, handle, ch) = created_store();
        let oid = ObjectId::new("persisted");
        handle
            .submit_transaction(&ch, Transaction::new().write(oid.clone(), 0, b"still here".to_vec()))
            .unwrap();
        handle.unmount().unwrap();

        let config = EngineConfig {
            fsck_on_mount: true,
            fsck_on_unmount: true,
            ..EngineConfig::default()
        };
        let mut handle = SledEngine::new(config).mount_store(temp.path()).unwrap();

        let err = handle.read_object(&ch, &oid, 0, 100).unwrap_err();
        assert!(matches!(err, EngineError::StaleHandle(_)));

        let fresh = handle.open_collection(&CollectionId::default()).unwrap();
        assert_eq!(handle.read_object(&fresh, &oid, 0, 100).unwrap(), b"still here");
        assert_eq!(handle.list_objects(&fresh).unwrap(), vec![oid]);
        handle.unmount().unwrap();
    }

    #[test]
    fn test_mount_uninitialised_path_fails() {
        let temp = TempDir::new().unwrap();
        let err = SledEngine::default().mount_store(temp.path()).err().unwrap();
        assert!(matches!(err, EngineError::InvalidStore { .. }));
    }
}
