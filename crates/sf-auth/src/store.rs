//! Durable credential storage
//!
//! The client only depends on the two-method `CredentialStore` contract.
//! Stores keep a snapshot copy, never a shared reference: a credential
//! mutated after `save` is unaffected in the store until saved again.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credential::{Credential, CredentialSnapshot};
use crate::error::{Error, Result};
use crate::factory::CredentialFactory;

/// Load/save a single credential.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    /// Return the stored credential, or `Error::NotFound` when nothing has
    /// been saved yet.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Credential>> + Send + '_>>;

    /// Replace the stored credential with a snapshot of `credential`.
    fn save<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// JSON snapshot file.
///
/// Writes are atomic (temp file + rename) and serialized by a mutex; the
/// file is created with 0600 permissions on unix.
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Credential>> + Send + '_>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(Error::NotFound(format!(
                        "no credential file at {}",
                        self.path.display()
                    )));
                }
                Err(e) => return Err(Error::Io(format!("reading credential file: {e}"))),
            };
            let credential = CredentialFactory::from_json(&contents)?;
            info!(path = %self.path.display(), "loaded credential");
            Ok(credential)
        })
    }

    fn save<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let snapshot = credential.to_snapshot();
            let _guard = self.write_lock.lock().await;
            write_atomic(&self.path, &snapshot).await
        })
    }
}

/// Write a snapshot to a file atomically.
///
/// Writes to a uniquely named temporary file in the same directory, then
/// renames it over the target. The temporary file is removed if any step
/// fails. The file holds OAuth tokens, so it is restricted to the owner.
async fn write_atomic(path: &Path, snapshot: &CredentialSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist(&target, json.as_bytes()))
        .await
        .map_err(|e| Error::Io(format!("credential write task failed: {e}")))??;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}

fn persist(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".credential.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::Io(format!("creating temp credential file: {e}")))?;

    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::Io(format!("renaming temp credential file: {}", e.error)))?;
    Ok(())
}

/// In-process store, mainly for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryCredentialStore {
    snapshot: StdMutex<Option<CredentialSnapshot>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CredentialSnapshot>> {
        self.snapshot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Credential>> + Send + '_>> {
        let snapshot = self.lock().clone();
        Box::pin(async move {
            let snapshot =
                snapshot.ok_or_else(|| Error::NotFound("no credential saved".into()))?;
            CredentialFactory::from_snapshot(snapshot)
        })
    }

    fn save<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        *self.lock() = Some(credential.to_snapshot());
        Box::pin(async { Ok(()) })
    }
}
