//! Refresh cookie jar
//!
//! The refresh credential is an HttpOnly cookie the server sets on login.
//! `CookieJar` is the cookie provider handed to the shared
//! `reqwest::Client`; when backed by a file it survives between processes
//! the way a browser profile would, so a later invocation can still
//! refresh. Session cookies are saved too: the session ends on logout, not
//! on process exit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use tracing::debug;

use crate::credentials::write_atomic;
use crate::error::{Error, Result};

/// Cookie provider for the auth client, optionally persisted to a JSON file.
#[derive(Clone)]
pub struct CookieJar {
    path: Option<PathBuf>,
    store: Arc<CookieStoreMutex>,
}

impl CookieJar {
    /// Jar that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            store: Arc::new(CookieStoreMutex::default()),
        }
    }

    /// Load the jar file at `path`. A missing file means an empty jar.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let store = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let store = cookie_store::serde::json::load_all(bytes.as_slice())
                    .map_err(|e| Error::CredentialParse(format!("parsing cookie jar: {e}")))?;
                debug!(path = %path.display(), "loaded cookie jar");
                store
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CookieStore::new(),
            Err(e) => return Err(Error::Io(format!("reading cookie jar: {e}"))),
        };

        Ok(Self {
            path: Some(path),
            store: Arc::new(CookieStoreMutex::new(store)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The provider to install with `ClientBuilder::cookie_provider`.
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        self.store.clone()
    }

    /// Write the current cookies to the jar file. No-op for in-memory jars.
    pub async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let mut json = Vec::new();
        {
            let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut json)
                .map_err(|e| Error::CredentialParse(format!("serializing cookie jar: {e}")))?;
        }
        write_atomic(path, &json).await?;
        debug!(path = %path.display(), "persisted cookie jar");
        Ok(())
    }

    /// Drop every cookie and remove the jar file.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let Some(ref path) = self.path else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed cookie jar");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing cookie jar: {e}"))),
        }
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
