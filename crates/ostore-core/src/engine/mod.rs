//! Storage engine interface.
//!
//! The object store client never talks to on-disk structures directly. It
//! drives an engine through two traits:
//!
//! - [`StorageEngine`] - creates or mounts a store and hands back a session
//! - [`EngineHandle`] - one mounted session: collections, transactions, reads
//!
//! [`SledEngine`] is the reference implementation used by the CLI and tests.

mod sled_store;

pub use sled_store::{EngineConfig, SledEngine, Superblock};

use std::fmt;
use std::path::Path;

/// Name of the block region file inside a store directory.
pub const BLOCK_FILE: &str = "block";

/// Identifier of a collection inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CollectionId {
    /// Head collection of placement group 0.0, the only one the client uses.
    fn default() -> Self {
        Self::new("0.0_head")
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot tag of an object. Snapshots are not exposed, so only the head exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Snapshot {
    #[default]
    Head,
}

impl Snapshot {
    fn tag(self) -> &'static str {
        match self {
            Self::Head => "head",
        }
    }
}

/// Key of an object inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    name: String,
    namespace: String,
    snapshot: Snapshot,
}

impl ObjectId {
    /// Object in the default namespace at the head snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            snapshot: Snapshot::Head,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable byte encoding: `namespace \0 name \0 snapshot`.
    pub fn to_key(&self) -> Vec<u8> {
        let mut key =
            Vec::with_capacity(self.namespace.len() + self.name.len() + 2 + self.snapshot.tag().len());
        key.extend_from_slice(self.namespace.as_bytes());
        key.push(0);
        key.extend_from_slice(self.name.as_bytes());
        key.push(0);
        key.extend_from_slice(self.snapshot.tag().as_bytes());
        key
    }

    /// Inverse of [`ObjectId::to_key`]. Returns `None` for foreign keys.
    pub fn from_key(key: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(key).ok()?;
        let mut parts = text.splitn(3, '\0');
        let namespace = parts.next()?;
        let name = parts.next()?;
        match parts.next()? {
            "head" => Some(Self {
                name: name.to_string(),
                namespace: namespace.to_string(),
                snapshot: Snapshot::Head,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Opaque reference to an open collection.
///
/// Only valid for the session that produced it; the engine rejects it after
/// that session unmounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    cid: CollectionId,
    generation: u64,
}

impl CollectionHandle {
    /// Engines mint handles; the generation ties a handle to one mount.
    pub fn new(cid: CollectionId, generation: u64) -> Self {
        Self { cid, generation }
    }

    pub fn cid(&self) -> &CollectionId {
        &self.cid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A primitive operation inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Register a collection so later mounts can open it.
    CreateCollection(CollectionId),
    /// Write `data` at `offset`, replacing that byte range.
    WriteAt {
        oid: ObjectId,
        offset: u64,
        data: Vec<u8>,
    },
    /// Remove an object and all of its content.
    RemoveObject(ObjectId),
}

/// Ordered list of operations applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<Op>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn create_collection(mut self, cid: CollectionId) -> Self {
        self.ops.push(Op::CreateCollection(cid));
        self
    }

    #[must_use]
    pub fn write(mut self, oid: ObjectId, offset: u64, data: impl Into<Vec<u8>>) -> Self {
        self.ops.push(Op::WriteAt {
            oid,
            offset,
            data: data.into(),
        });
        self
    }

    #[must_use]
    pub fn remove(mut self, oid: ObjectId) -> Self {
        self.ops.push(Op::RemoveObject(oid));
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total payload bytes carried by write ops.
    pub fn payload_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Op::WriteAt { data, .. } => data.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Errors reported by a storage engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    #[error("collection already exists: {0}")]
    CollectionExists(CollectionId),

    #[error("stale collection handle for {0} (store was remounted or unmounted)")]
    StaleHandle(CollectionId),

    #[error("invalid store at {path}: {reason}")]
    InvalidStore { path: String, reason: String },

    #[error("transaction has no operations")]
    EmptyTransaction,

    #[error("no space left in block region ({needed} bytes needed, {available} available)")]
    NoSpace { needed: u64, available: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Negative errno-style code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::ObjectNotFound(_) | Self::CollectionNotFound(_) => -libc::ENOENT,
            Self::CollectionExists(_) => -libc::EEXIST,
            Self::StaleHandle(_) => -libc::ESTALE,
            Self::InvalidStore { .. } | Self::EmptyTransaction => -libc::EINVAL,
            Self::NoSpace { .. } => -libc::ENOSPC,
            Self::Storage(_) => -libc::EIO,
            Self::Io(e) => e.raw_os_error().map_or(-libc::EIO, |code| -code),
        }
    }

    /// True when the error means "no such object or collection".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_) | Self::CollectionNotFound(_))
    }
}

/// A storage engine capable of creating and mounting stores.
pub trait StorageEngine: Send + Sync {
    /// Human-readable engine name.
    fn name(&self) -> &'static str;

    /// Initialise on-disk structures at `path` and mount the new store.
    ///
    /// The block region file must already be allocated at `path/block`.
    fn create_store(&self, path: &Path, block_size: u64) -> Result<Box<dyn EngineHandle>, EngineError>;

    /// Mount an existing store.
    fn mount_store(&self, path: &Path) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// One mounted store session.
pub trait EngineHandle: Send {
    /// Prepare a new collection. It only survives a remount once a
    /// transaction containing [`Op::CreateCollection`] commits.
    fn create_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError>;

    /// Open a collection created by an earlier committed transaction.
    fn open_collection(&mut self, cid: &CollectionId) -> Result<CollectionHandle, EngineError>;

    /// Apply all ops of `txn` atomically.
    fn submit_transaction(&self, ch: &CollectionHandle, txn: Transaction) -> Result<(), EngineError>;

    /// Read up to `length` bytes starting at `offset`.
    fn read_object(
        &self,
        ch: &CollectionHandle,
        oid: &ObjectId,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, EngineError>;

    /// List objects stored in a collection.
    fn list_objects(&self, ch: &CollectionHandle) -> Result<Vec<ObjectId>, EngineError>;

    /// Unmount and release the session.
    fn unmount(self: Box<Self>) -> Result<(), EngineError>;
}
