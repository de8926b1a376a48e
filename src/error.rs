// ABOUTME: Application-wide error types for sitepush.
// ABOUTME: Uses thiserror for ergonomic error handling.

use thiserror::Error;

use crate::config::ConfigError;
use crate::deploy::{DeployError, DeployErrorKind};
use crate::prompt::PromptError;
use crate::release::ReleaseError;
use crate::routing::RoutingError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Ctrl-C arrived while a command was running.
    #[error("interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Steps the operator can take, printed after the error line.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            Error::Config(e) => e.remediation(),
            Error::Deploy(e) => e.remediation(),
            Error::Release(e) => e.remediation(),
            Error::Interrupted => vec![
                "remote objects written before the interrupt were left in place".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    /// The operator declined a confirmation; not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Deploy(e) if e.kind() == DeployErrorKind::Cancelled)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Interrupted => 130,
            _ if self.is_cancelled() => 0,
            _ => 1,
        }
    }
}
