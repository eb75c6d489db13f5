use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

pub type Result<T> = std::result::Result<T, HimawariArchError>;

#[derive(Error, Debug)]
pub enum HimawariArchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote directory not found: {0}")]
    RemoteNotFound(String),

    #[error("error listing remote directory {path}: {message}")]
    RemoteListing { path: String, message: String },

    #[error("transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("decompression of {path:?} failed: {message}")]
    Decompression { path: PathBuf, message: String },

    #[error("composite generation failed: {0}")]
    Composite(String),

    #[error("interrupted")]
    Interrupted,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error {0}")]
    Ron(#[from] ron::error::SpannedError),
}

impl HimawariArchError {
    /// fatal errors abort a run, everything else is absorbed per file or per timepoint
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HimawariArchError::Config(_)
                | HimawariArchError::Authentication(_)
                | HimawariArchError::Transport(_)
                | HimawariArchError::Interrupted
                | HimawariArchError::InvalidInput(_)
                | HimawariArchError::Ron(_)
        )
    }
}

impl From<RemoteError> for HimawariArchError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(path) => HimawariArchError::RemoteNotFound(path),
            RemoteError::Listing { path, message } => {
                HimawariArchError::RemoteListing { path, message }
            }
            RemoteError::Transfer { path, message } => {
                HimawariArchError::Transfer { path, message }
            }
            RemoteError::Authentication(msg) => HimawariArchError::Authentication(msg),
            RemoteError::Transport(msg) => HimawariArchError::Transport(msg),
        }
    }
}
