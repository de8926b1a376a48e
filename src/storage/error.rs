// ABOUTME: Errors from object storage operations.
// ABOUTME: Covers failed CLI invocations, missing objects and local read failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    /// A bulk synchronize failed; `transcript` is the client output up to the failure.
    #[error("rsync failed: {message}")]
    SyncFailed { message: String, transcript: String },

    #[error("failed to run storage client '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("failed to read local file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk build directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("simulated {0} failure")]
    Injected(String),
}

impl StorageError {
    /// Client output captured before the failure, if any.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            StorageError::SyncFailed { transcript, .. } if !transcript.is_empty() => {
                Some(transcript)
            }
            _ => None,
        }
    }
}
