//! Access credential storage
//!
//! The client holds exactly one access token at a time. `CredentialStore`
//! is the seam between the request pipeline and wherever that token lives:
//! memory for embedded use and tests, or a JSON file for the CLI so the
//! session survives between invocations.
//!
//! The file store writes atomically (temp file + rename) and a tokio Mutex
//! serializes writers, so a refresh racing a logout cannot leave a torn file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Boxed future returned by `CredentialStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Holder of the single live access credential.
///
/// Uses `Pin<Box<dyn Future>>` return types so stores can be shared as
/// `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Current access credential, if any.
    fn access_credential(&self) -> StoreFuture<'_, Option<Secret<String>>>;

    /// Replace the access credential.
    fn set_access_credential(&self, credential: Secret<String>) -> StoreFuture<'_, Result<()>>;

    /// Remove the access credential. Clearing an empty store is not an error.
    fn clear(&self) -> StoreFuture<'_, Result<()>>;
}

/// In-process credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<Option<Secret<String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a credential.
    pub fn with_credential(credential: impl Into<Secret<String>>) -> Self {
        Self {
            state: Mutex::new(Some(credential.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_credential(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.clone() })
    }

    fn set_access_credential(&self, credential: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.state.lock().await = Some(credential);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            self.state.lock().await.take();
            Ok(())
        })
    }
}

/// On-disk layout of the token file.
#[derive(Serialize, Deserialize)]
struct TokenFile {
    access_token: String,
}

/// Credential store backed by a single JSON file.
///
/// The in-memory copy is authoritative for reads once loaded; every write
/// goes to disk before the call returns.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<Option<Secret<String>>>,
}

impl FileCredentialStore {
    /// Load the token file at `path`. A missing file means no credential.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let file: TokenFile = serde_json::from_str(&contents)
                    .map_err(|e| Error::CredentialParse(format!("parsing token file: {e}")))?;
                debug!(path = %path.display(), "loaded access credential");
                Some(Secret::new(file.access_token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no token file, starting logged out");
                None
            }
            Err(e) => return Err(Error::Io(format!("reading token file: {e}"))),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_credential(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move { self.state.lock().await.clone() })
    }

    fn set_access_credential(&self, credential: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let json = serde_json::to_string_pretty(&TokenFile {
                access_token: credential.expose().to_owned(),
            })
            .map_err(|e| Error::CredentialParse(format!("serializing token file: {e}")))?;
            write_atomic(&self.path, json.as_bytes()).await?;
            debug!(path = %self.path.display(), "persisted access credential");
            *state = Some(credential);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.take();
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed token file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing token file: {e}"))),
            }
        })
    }
}

/// Write `contents` to `path` atomically with 0600 permissions on unix.
///
/// The parent directory is created if needed. The temp file is named after
/// the target so the token and cookie files can share a directory.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating {}: {e}", dir.display())))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Io(format!("no file name in {}", path.display())))?;
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| Error::Io(format!("writing {}: {e}", tmp_path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting permissions on {}: {e}", tmp_path.display())))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming into {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn memory_store_starts_empty() {
        let store = MemoryCredentialStore::new();
        assert!(store.access_credential().await.is_none());
    }

    #[tokio::test]
    async fn memory_store_set_overwrites_and_clear_removes() {
        let store = MemoryCredentialStore::with_credential("tok1");
        store
            .set_access_credential(Secret::from("tok2"))
            .await
            .unwrap();
        assert_eq!(store.access_credential().await.unwrap().expose(), "tok2");

        store.clear().await.unwrap();
        assert!(store.access_credential().await.is_none());
        // clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_missing_file_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::load(dir.path().join("token.json"))
            .await
            .unwrap();
        assert!(store.access_credential().await.is_none());
    }

    #[tokio::test]
    async fn file_store_roundtrip_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .set_access_credential(Secret::from("tok1"))
            .await
            .unwrap();

        let reloaded = FileCredentialStore::load(path).await.unwrap();
        assert_eq!(reloaded.access_credential().await.unwrap().expose(), "tok1");
    }

    #[tokio::test]
    async fn file_store_clear_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .set_access_credential(Secret::from("tok1"))
            .await
            .unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert!(store.access_credential().await.is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .set_access_credential(Secret::from("tok1"))
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = FileCredentialStore::load(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .set_access_credential(Secret::from("tok1"))
            .await
            .unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "token file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_writes_leave_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = Arc::new(FileCredentialStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set_access_credential(Secret::new(format!("tok{i}")))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let on_disk = FileCredentialStore::load(path).await.unwrap();
        let token = on_disk.access_credential().await.unwrap();
        assert_eq!(token, store.access_credential().await.unwrap());
    }
}
