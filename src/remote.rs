use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("no such remote directory {0}")]
    NotFound(String),

    #[error("listing {path} failed: {message}")]
    Listing { path: String, message: String },

    #[error("transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Connection parameters for a remote archive session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub timeout_secs: u64,
}

/// A file transfer session to the remote archive.
///
/// Implementations are single-owner and are used strictly sequentially; nothing in this crate
/// shares one session between threads.
pub trait RemoteSession {
    /// plain file names (no directory part) of the entries in `dir`
    fn list(&self, dir: &str) -> Result<Vec<String>, RemoteError>;

    /// copy `remote_path` into `local_path`, creating or truncating it
    fn get(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError>;

    /// release the session, called once at the end of a run whatever its outcome
    fn close(&mut self) {}
}

impl<R: RemoteSession + ?Sized> RemoteSession for Box<R> {
    fn list(&self, dir: &str) -> Result<Vec<String>, RemoteError> {
        (**self).list(dir)
    }

    fn get(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError> {
        (**self).get(remote_path, local_path)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
