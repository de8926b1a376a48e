// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state carries the data produced by the transition that reached it.

use crate::compress::{CleanupReport, CompressedSet};
use crate::types::{Prefix, ReleaseVersion};
use crate::upload::{UploadPlan, UploadReport};

/// The release a deployment writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub version: ReleaseVersion,
    /// Where the release is stored; root for mirror deploys.
    pub prefix: Prefix,
}

/// Configuration resolved, build directory located.
/// Available actions: `name()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Configured;

/// Version computed.
/// Available actions: `check_conflicts()`
#[derive(Debug)]
pub struct Named {
    pub(crate) target: Target,
}

/// No existing release at the target prefix.
/// Available actions: `compress()`, `preview()`
#[derive(Debug)]
pub struct Cleared {
    pub(crate) target: Target,
}

/// Gzip intermediates written next to the build files.
/// Available actions: `upload()`
///
/// Dropping a deployment in this state deletes the intermediates.
#[derive(Debug)]
pub struct Compressed {
    pub(crate) target: Target,
    pub(crate) compressed: CompressedSet,
}

/// Every pass finished and intermediates were cleaned up.
/// Available actions: `verify()`
#[derive(Debug)]
pub struct Uploaded {
    pub(crate) target: Target,
    pub(crate) plan: UploadPlan,
    pub(crate) report: UploadReport,
    pub(crate) compressed: usize,
    pub(crate) cleanup: CleanupReport,
}

/// The release is visible remotely.
/// Available actions: `finish()`
#[derive(Debug)]
pub struct Verified {
    pub(crate) target: Target,
    pub(crate) report: UploadReport,
    pub(crate) compressed: usize,
}
