// ABOUTME: Errors from release naming, conflict checks and release lookup.
// ABOUTME: Each error can describe the remediation an operator should take.

use thiserror::Error;

use crate::storage::StorageError;
use crate::types::ReleaseVersionError;

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// `version: auto` needs a tag reachable from HEAD.
    #[error("no reachable annotated git tag to derive the release version from")]
    NoReachableTag,

    #[error("source control query failed: {0}")]
    SourceControl(String),

    #[error("invalid release version '{value}': {source}")]
    InvalidVersion {
        value: String,
        #[source]
        source: ReleaseVersionError,
    },

    /// The target prefix already holds objects.
    #[error("release already exists: {url} contains {} object(s)", .objects.len())]
    AlreadyExists { url: String, objects: Vec<String> },

    #[error("release not found: {0}")]
    NotFound(String),

    #[error("no releases found under {0}")]
    NoReleases(String),

    #[error("{step} failed after {attempts} attempt(s): {source}")]
    Storage {
        step: String,
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

impl ReleaseError {
    /// Steps the operator can take to get past this error.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            ReleaseError::NoReachableTag => vec![
                "create an annotated tag: git tag -a v1.0.0 -m \"Release v1.0.0\"".to_string(),
                "or pass an explicit version with --version <VERSION>".to_string(),
                "or use --version timestamp".to_string(),
            ],
            ReleaseError::AlreadyExists { url, objects } => {
                let mut steps: Vec<String> = objects
                    .iter()
                    .take(10)
                    .map(|key| format!("existing object: {key}"))
                    .collect();
                if objects.len() > 10 {
                    steps.push(format!("... and {} more", objects.len() - 10));
                }
                steps.push("choose a new version with --version <VERSION>".to_string());
                steps.push("or deploy under a different prefix with --prefix <PREFIX>".to_string());
                steps.push(format!("or delete the old release: gsutil -m rm -r {url}"));
                steps
            }
            ReleaseError::NoReleases(_) => {
                vec!["deploy a release first with: sitepush deploy".to_string()]
            }
            ReleaseError::NotFound(_) => {
                vec!["list the available releases with: sitepush releases".to_string()]
            }
            _ => Vec::new(),
        }
    }
}
