//! Session management for the bot client
//!
//! Provides:
//! - File-based session locking to prevent parallel runs on one session file
//! - A scoped session that is disconnected on every exit path

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{info, warn};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::platform::PlatformClient;

/// Session lock guard that ensures exclusive access to the session file.
pub struct SessionLock {
    lock_file: Option<File>,
    path: PathBuf,
}

impl SessionLock {
    /// Lock file that guards `session`.
    pub fn lock_path(session: &Path) -> PathBuf {
        let mut name = session.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire an exclusive lock on the session file.
    pub fn acquire(session: &Path) -> Result<Self> {
        let path = Self::lock_path(session);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
                path,
            }),
            Err(_) => {
                eprintln!(
                    "Session file '{}' is used by another run; wait for it to finish.",
                    session.display()
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// An established platform session.
///
/// Obtained from [`Session::open`]; finish it with [`Session::close`], which
/// disconnects exactly once. A session dropped without `close` falls back to
/// [`PlatformClient::abort`].
pub struct Session<'c, C: PlatformClient> {
    client: &'c mut C,
    open: bool,
}

impl<'c, C: PlatformClient> Session<'c, C> {
    /// Connect and authenticate. On failure nothing needs tearing down.
    pub async fn open(client: &'c mut C, credentials: &Credentials) -> Result<Self> {
        info!(api_id = credentials.api_id, "connecting as bot");
        client.connect(credentials).await.map_err(|err| match err {
            Error::Authentication(_) => err,
            other => Error::Authentication(other.to_string()),
        })?;
        info!("authenticated");

        Ok(Self { client, open: true })
    }

    pub fn client(&mut self) -> &mut C {
        &mut *self.client
    }

    /// Disconnect and hand back `outcome`.
    ///
    /// An error from `outcome` takes precedence over a teardown error.
    pub async fn close<T>(mut self, outcome: Result<T>) -> Result<T> {
        let teardown = self.client.disconnect().await;
        self.open = false;

        match (outcome, teardown) {
            (Ok(value), Ok(())) => {
                info!("disconnected");
                Ok(value)
            }
            (Ok(value), Err(err)) => {
                warn!(error = %err, "disconnect failed after a successful run");
                Ok(value)
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(teardown_err)) => {
                warn!(error = %teardown_err, "disconnect failed");
                Err(err)
            }
        }
    }
}

impl<C: PlatformClient> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if self.open {
            warn!("session dropped without close, aborting connection");
            self.client.abort();
        }
    }
}
