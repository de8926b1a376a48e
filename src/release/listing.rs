// ABOUTME: Enumerates the releases stored under the releases prefix.
// ABOUTME: Only child directories whose names are valid release versions are reported.

use super::error::ReleaseError;
use crate::retry::RetryPolicy;
use crate::storage::StorageOps;
use crate::types::{BucketName, Prefix, ReleaseVersion};

/// One release found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    pub version: ReleaseVersion,
    /// Full prefix of the release, e.g. `releases/v1.0.0/`.
    pub prefix: Prefix,
}

/// List releases directly under `releases`, in the order storage returns them.
pub async fn list_releases<S: StorageOps + ?Sized>(
    storage: &S,
    bucket: &BucketName,
    releases: &Prefix,
    retry: &RetryPolicy,
) -> Result<Vec<ReleaseEntry>, ReleaseError> {
    let step = format!("list {}", bucket.url(releases.as_str()));
    let children = retry
        .run(&step, |_| storage.list_children(bucket, releases))
        .await
        .map_err(|exhausted| ReleaseError::Storage {
            step: step.clone(),
            attempts: exhausted.attempts,
            source: exhausted.error,
        })?;

    let entries: Vec<ReleaseEntry> = children
        .iter()
        .filter_map(|child| child.strip_suffix('/'))
        .filter_map(|name| ReleaseVersion::new(name).ok())
        .map(|version| ReleaseEntry {
            prefix: releases.join_release(&version),
            version,
        })
        .collect();

    tracing::debug!(count = entries.len(), releases = %releases, "listed releases");
    Ok(entries)
}

/// Find `version` among the stored releases.
pub async fn find_release<S: StorageOps + ?Sized>(
    storage: &S,
    bucket: &BucketName,
    releases: &Prefix,
    version: &ReleaseVersion,
    retry: &RetryPolicy,
) -> Result<ReleaseEntry, ReleaseError> {
    list_releases(storage, bucket, releases, retry)
        .await?
        .into_iter()
        .find(|entry| &entry.version == version)
        .ok_or_else(|| ReleaseError::NotFound(bucket.url(releases.join_release(version).as_str())))
}
