//! Key-value persistence for state that must survive the redirect
//!
//! The verifier is created before the browser leaves for the provider and
//! read back when it returns, possibly after a process restart. Callers hold
//! an `Arc<dyn KeyValueStore>` so tests can substitute [`MemoryStore`] for
//! the on-disk [`FileStore`].
//!
//! Slots are single-valued and overwrite-on-write: a second sign-in started
//! before the first completes replaces the first attempt's verifier.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Named single-value slots.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot without clearing it.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>>;

    /// Write a slot, replacing any previous value.
    fn set<'a>(&'a self, key: &'a str, value: Secret<String>) -> StoreFuture<'a, ()>;

    /// Read and clear a slot in one step.
    fn take<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>>;
}

/// Process-local store. Values are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Secret<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move { Ok(self.slots.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Secret<String>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.slots.lock().await.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn take<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move { Ok(self.slots.lock().await.remove(key)) })
    }
}

/// JSON file of slot name → value.
///
/// Writes use atomic temp-file + rename so a crash mid-write never leaves a
/// truncated file. The mutex serializes writers inside this process.
pub struct FileStore {
    path: PathBuf,
    slots: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if it does not exist.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let slots = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;
            let slots: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Store(format!("parsing {}: {e}", path.display())))?;
            info!(path = %path.display(), slots = slots.len(), "opened verifier store");
            slots
        } else {
            info!(path = %path.display(), "verifier store not found, creating empty store");
            let slots = HashMap::new();
            write_atomic(&path, &slots).await?;
            slots
        };

        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move {
            let slots = self.slots.lock().await;
            Ok(slots.get(key).cloned().map(Secret::new))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Secret<String>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut slots = self.slots.lock().await;
            let replaced = slots
                .insert(key.to_string(), value.expose().clone())
                .is_some();
            debug!(key, replaced, "stored slot");
            write_atomic(&self.path, &slots).await
        })
    }

    fn take<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move {
            let mut slots = self.slots.lock().await;
            let taken = slots.remove(key);
            if taken.is_some() {
                debug!(key, "cleared slot");
                write_atomic(&self.path, &slots).await?;
            }
            Ok(taken.map(Secret::new))
        })
    }
}

/// Sibling temp file unique to this target, process and write.
fn temp_path_for(dir: &Path, path: &Path) -> Result<PathBuf> {
    static WRITES: AtomicU64 = AtomicU64::new(0);

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Store(format!("store path {} has no file name", path.display())))?;
    let seq = WRITES.fetch_add(1, Ordering::Relaxed);
    Ok(dir.join(format!(
        ".{}.tmp.{}.{seq}",
        file_name.to_string_lossy(),
        std::process::id()
    )))
}

/// Write the slot map atomically with 0600 permissions (unix only).
async fn write_atomic(path: &Path, slots: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(slots)
        .map_err(|e| Error::Store(format!("serializing store: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Store("store path has no parent directory".into()))?;

    let tmp_path = temp_path_for(dir, path)?;

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Store(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Store(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Store(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted verifier store");
    Ok(())
}
