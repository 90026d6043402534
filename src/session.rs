//! Session management for the Telegram client
//!
//! Provides:
//! - File-based session locking to prevent two processes sharing one session
//! - Opening (or creating) the persisted grammers session
//! - Client creation with the sender pool running in the background

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::Client;
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock, failing immediately if another process holds it.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "session lock acquired");
                Ok(Self {
                    path,
                    lock_file: Some(lock_file),
                })
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    "Telegram session is already used by another process; wait for it to finish"
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

/// Open the persisted session, creating it on first run.
pub fn open_session(config: &Config) -> Result<Arc<SqliteSession>> {
    let session_file = config.session_file();
    let session = SqliteSession::open(&session_file).map_err(|e| {
        Error::SessionError(format!("Failed to open session {}: {}", session_file, e))
    })?;
    Ok(Arc::new(session))
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    pub handle: SenderPoolHandle,
    config: Config,
    updates: Option<mpsc::UnboundedReceiver<UpdatesLike>>,
    _runner_handle: tokio::task::JoinHandle<()>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(session: Arc<SqliteSession>, config: &Config) -> Result<Self> {
        let pool = SenderPool::new(session, config.api_id);

        // Client needs a reference to the whole pool before it is split up
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle,
            config: config.clone(),
            updates: Some(updates),
            _runner_handle: runner_handle,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Take ownership of the updates receiver to build an UpdateStream.
    /// Returns None if updates were already taken.
    pub fn take_updates(&mut self) -> Option<mpsc::UnboundedReceiver<UpdatesLike>> {
        self.updates.take()
    }
}

impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Open the session for `config` and connect a client to it.
pub async fn get_client(config: &Config) -> Result<TelegramClient> {
    let session = open_session(config)?;
    TelegramClient::connect(session, config).await
}
