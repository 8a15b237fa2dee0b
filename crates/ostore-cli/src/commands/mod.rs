//! Subcommand implementations.

pub mod bench;
pub mod create;
pub mod delete;
pub mod list;
pub mod read;
pub mod write;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ostore_core::engine::StorageEngine;
use ostore_core::{ObjectClient, ObjectStore};

use crate::config::Config;

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub root: PathBuf,
    pub config: Config,
    pub engine: Arc<dyn StorageEngine>,
}

impl CommandContext {
    /// Directory of the store called `name` under the root.
    pub fn store_path(&self, name: &str) -> Result<PathBuf> {
        validate_store_name(name)?;
        Ok(self.root.join(name))
    }

    /// Handle for the store called `name`. Nothing is mounted yet.
    pub fn store(&self, name: &str) -> Result<ObjectStore> {
        let path = self.store_path(name)?;
        Ok(ObjectStore::new(path, self.config.store.clone(), self.engine()))
    }

    pub fn engine(&self) -> Arc<dyn StorageEngine> {
        Arc::clone(&self.engine)
    }
}

/// Store names are single path components.
pub fn validate_store_name(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Store name must not be empty");
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) || name.contains('\0') {
        anyhow::bail!("Invalid store name '{name}': must be a single directory name");
    }
    Ok(())
}

/// Mount `store`, run `f` with a client, then tear the store down.
///
/// Teardown runs whether or not `f` failed. When both fail, the error from
/// `f` is returned and the teardown error is only logged.
pub fn with_client<T, F>(store: ObjectStore, f: F) -> Result<T>
where
    F: FnOnce(&mut ObjectClient) -> Result<T>,
{
    let path = store.path().to_path_buf();
    let mut client = ObjectClient::new(store);
    let result = client
        .store_mut()
        .mount_existing()
        .with_context(|| format!("Failed to open store at {}", path.display()))
        .and_then(|()| f(&mut client));

    finish(result, client.store_mut(), &path)
}

/// Combine a primary result with the store's teardown.
pub fn finish<T>(result: Result<T>, store: &mut ObjectStore, path: &Path) -> Result<T> {
    let teardown = store.teardown();
    match (result, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => {
            Err(e).with_context(|| format!("Failed to unmount store at {}", path.display()))
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(teardown_err)) => {
            tracing::warn!(path = %path.display(), "Teardown after failure also failed: {teardown_err}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_names() {
        assert!(validate_store_name("mystore").is_ok());
        assert!(validate_store_name("bench_test").is_ok());
        assert!(validate_store_name("a.b").is_ok());

        assert!(validate_store_name("").is_err());
        assert!(validate_store_name(".").is_err());
        assert!(validate_store_name("..").is_err());
        assert!(validate_store_name("a/b").is_err());
        assert!(validate_store_name("/abs").is_err());
    }
}
