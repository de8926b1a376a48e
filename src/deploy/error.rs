// ABOUTME: Error types for the deploy and rollback workflows.
// ABOUTME: Wraps the per-stage errors and maps them onto one operator-facing taxonomy.

use std::path::PathBuf;

use crate::compress::CompressError;
use crate::prompt::PromptError;
use crate::release::ReleaseError;
use crate::routing::RoutingError;
use crate::storage::StorageError;
use crate::upload::{UploadError, UploadErrorKind};

/// Errors that stop a deploy or rollback.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The build output directory does not exist.
    #[error("build directory not found: {}", .0.display())]
    BuildDirectoryNotFound(PathBuf),

    /// The build directory holds no files to upload.
    #[error("build directory is empty: {}", .0.display())]
    EmptyBuild(PathBuf),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Compress(#[from] CompressError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The bucket rejected the scratch write made before uploading.
    #[error("bucket {bucket} is not writable: {source}")]
    WriteProbe {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("routing is not configured; set routing.url_map and routing.path_matcher to use --apply")]
    RoutingNotConfigured,

    /// No release was named and none could be chosen interactively.
    #[error("no release selected; pass --to <VERSION>")]
    NoReleaseSelected,

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The operator declined to continue.
    #[error("cancelled by operator")]
    Cancelled,
}

/// Categories of deploy failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    ConfigurationMissing,
    ReleaseAlreadyExists,
    BuildDirectoryNotFound,
    NetworkOperationFailure,
    UploadVerificationFailed,
    ReleaseNotFound,
    NoReleases,
    Cancelled,
    Other,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::BuildDirectoryNotFound(_) => DeployErrorKind::BuildDirectoryNotFound,
            DeployError::Release(ReleaseError::NoReachableTag) => DeployErrorKind::ConfigurationMissing,
            DeployError::Release(ReleaseError::AlreadyExists { .. }) => {
                DeployErrorKind::ReleaseAlreadyExists
            }
            DeployError::Release(ReleaseError::NotFound(_)) => DeployErrorKind::ReleaseNotFound,
            DeployError::Release(ReleaseError::NoReleases(_)) => DeployErrorKind::NoReleases,
            DeployError::Release(ReleaseError::Storage { .. }) | DeployError::WriteProbe { .. } => {
                DeployErrorKind::NetworkOperationFailure
            }
            DeployError::Upload(e) => match e.kind() {
                UploadErrorKind::NetworkOperationFailure => DeployErrorKind::NetworkOperationFailure,
                UploadErrorKind::VerificationFailed => DeployErrorKind::UploadVerificationFailed,
                UploadErrorKind::LocalScan => DeployErrorKind::Other,
            },
            DeployError::RoutingNotConfigured => DeployErrorKind::ConfigurationMissing,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
            _ => DeployErrorKind::Other,
        }
    }

    /// Steps the operator can take next.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            DeployError::Release(e) => e.remediation(),
            DeployError::BuildDirectoryNotFound(_) | DeployError::EmptyBuild(_) => vec![
                "run your build first".to_string(),
                "or point sitepush at the output with --build-dir <DIR>".to_string(),
            ],
            DeployError::Upload(UploadError::StepFailed { .. }) => vec![
                "objects written before the failure were left in place".to_string(),
                "delete the partial release or deploy again with a new --version".to_string(),
            ],
            DeployError::Upload(UploadError::VerificationFailed { .. }) => {
                vec!["inspect the bucket: the release may be incomplete".to_string()]
            }
            DeployError::WriteProbe { bucket, .. } => vec![format!(
                "check that your account can write to gs://{bucket} (gcloud auth login)"
            )],
            _ => Vec::new(),
        }
    }
}
