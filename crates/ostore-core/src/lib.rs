//! Collection-based object store client.
//!
//! - [`engine`]: the storage engine interface and the sled reference engine
//! - [`ObjectStore`]: creates, mounts and tears down one store directory
//! - [`ObjectClient`]: whole-object write/read/delete on the store's collection
//! - [`EngineContext`]: process-scoped engine setup and shutdown
//!
//! ```no_run
//! use ostore_core::{EngineContext, ObjectClient, ObjectStore, StoreConfig};
//! use ostore_core::engine::EngineConfig;
//!
//! # fn main() -> ostore_core::Result<()> {
//! let ctx = EngineContext::init(EngineConfig::default());
//! let mut store = ObjectStore::new("/tmp/demo", StoreConfig::default(), ctx.engine());
//! store.create()?;
//!
//! let mut client = ObjectClient::new(store);
//! client.write("greeting", b"hello".to_vec())?;
//! assert_eq!(client.read("greeting", 5)?, b"hello");
//! client.teardown()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod store;

pub use client::ObjectClient;
pub use config::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_OBJECT_BYTES, StoreConfig};
pub use context::EngineContext;
pub use error::{Result, StoreError};
pub use store::{ObjectStore, StoreState};
