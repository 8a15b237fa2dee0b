//! Object-level API over a mounted store.

use crate::engine::{ObjectId, Transaction};
use crate::error::{Result, StoreError};
use crate::store::ObjectStore;

/// Whole-object write, read and delete against one store's collection.
///
/// Every operation mounts the store first if needed.
#[derive(Debug)]
pub struct ObjectClient {
    store: ObjectStore,
}

impl ObjectClient {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Write `data` at offset 0 of `name` in a single transaction.
    ///
    /// Creates the object if absent. Bytes past `data.len()` of a longer
    /// existing object are kept.
    pub fn write(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        let len = data.len();
        let (engine, collection) = self.store.ensure_mounted()?;

        let txn = Transaction::new().write(ObjectId::new(name), 0, data);
        engine
            .submit_transaction(collection, txn)
            .map_err(|source| StoreError::WriteFailure {
                object: name.to_string(),
                source,
            })?;

        tracing::debug!(object = name, bytes = len, "Wrote object");
        Ok(())
    }

    /// Read up to `max_bytes` from offset 0 of `name`.
    pub fn read(&mut self, name: &str, max_bytes: u64) -> Result<Vec<u8>> {
        let oid = ObjectId::new(name);
        let (engine, collection) = self.store.ensure_mounted()?;

        let data = engine
            .read_object(collection, &oid, 0, max_bytes)
            .map_err(|source| {
                if source.is_not_found() {
                    StoreError::NotFound {
                        what: format!("object {name}"),
                        source: Some(source),
                    }
                } else {
                    StoreError::ReadFailure {
                        object: name.to_string(),
                        source,
                    }
                }
            })?;

        tracing::debug!(object = name, bytes = data.len(), "Read object");
        Ok(data)
    }

    /// Read `name` bounded by the store's `max_object_bytes`.
    pub fn read_all(&mut self, name: &str) -> Result<Vec<u8>> {
        let bound = self.store.config().max_object_bytes;
        self.read(name, bound)
    }

    /// Remove `name` and all of its content.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let (engine, collection) = self.store.ensure_mounted()?;

        let txn = Transaction::new().remove(ObjectId::new(name));
        engine
            .submit_transaction(collection, txn)
            .map_err(|source| StoreError::DeleteFailure {
                object: name.to_string(),
                source,
            })?;

        tracing::debug!(object = name, "Deleted object");
        Ok(())
    }

    /// Names of all objects in the collection, in key order.
    pub fn list(&mut self) -> Result<Vec<String>> {
        let cid = self.store.collection_id().clone();
        let (engine, collection) = self.store.ensure_mounted()?;

        let oids = engine
            .list_objects(collection)
            .map_err(|source| StoreError::ReadFailure {
                object: format!("collection {cid}"),
                source,
            })?;

        Ok(oids.into_iter().map(|oid| oid.name().to_string()).collect())
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    pub fn into_store(self) -> ObjectStore {
        self.store
    }

    /// Tear the underlying store down now instead of on drop.
    pub fn teardown(&mut self) -> Result<()> {
        self.store.teardown()
    }
}
