// ABOUTME: Upload error types with SNAFU context.
// ABOUTME: Carries the failing step and attempt count so operators know where a deploy stopped.

use snafu::Snafu;

use crate::storage::StorageError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UploadError {
    #[snafu(display("{step} failed after {attempts} attempt(s): {source}"))]
    StepFailed {
        step: String,
        attempts: u32,
        source: StorageError,
    },

    #[snafu(display("upload verification failed: {reason}"))]
    VerificationFailed { reason: String },

    #[snafu(display("failed to scan build directory: {source}"))]
    Scan { source: walkdir::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// A remote operation kept failing after all retries.
    NetworkOperationFailure,
    /// Every pass succeeded but the release is not visible remotely.
    VerificationFailed,
    /// The local build tree could not be read.
    LocalScan,
}

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::StepFailed { .. } => UploadErrorKind::NetworkOperationFailure,
            UploadError::VerificationFailed { .. } => UploadErrorKind::VerificationFailed,
            UploadError::Scan { .. } => UploadErrorKind::LocalScan,
        }
    }

    /// The step that exhausted its retries, if any.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            UploadError::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}
