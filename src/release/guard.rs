// ABOUTME: Refuses to deploy into a release prefix that already holds objects.
// ABOUTME: Root deploys are mirrors and are never blocked.

use super::error::ReleaseError;
use crate::retry::RetryPolicy;
use crate::storage::StorageOps;
use crate::types::{BucketName, Prefix};

/// Fail with `ReleaseError::AlreadyExists` when `prefix` is not empty.
///
/// The root prefix always passes: a root deploy overwrites in place.
pub async fn ensure_vacant<S: StorageOps + ?Sized>(
    storage: &S,
    bucket: &BucketName,
    prefix: &Prefix,
    retry: &RetryPolicy,
) -> Result<(), ReleaseError> {
    if prefix.is_root() {
        tracing::debug!("root deploy, skipping version conflict check");
        return Ok(());
    }

    let step = format!("list {}", bucket.url(prefix.as_str()));
    let existing = retry
        .run(&step, |_| storage.list(bucket, prefix))
        .await
        .map_err(|exhausted| ReleaseError::Storage {
            step: step.clone(),
            attempts: exhausted.attempts,
            source: exhausted.error,
        })?;

    if existing.is_empty() {
        return Ok(());
    }

    Err(ReleaseError::AlreadyExists {
        url: bucket.url(prefix.as_str()),
        objects: existing.into_iter().map(|o| o.key).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Operation};

    fn bucket() -> BucketName {
        BucketName::new("site-bucket").unwrap()
    }

    #[tokio::test]
    async fn empty_prefix_is_vacant() {
        let storage = MemoryStorage::new();
        let prefix = Prefix::new("releases/v1/").unwrap();
        ensure_vacant(&storage, &bucket(), &prefix, &RetryPolicy::none())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn occupied_prefix_is_a_conflict() {
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "releases/v1/index.html", "x");
        let prefix = Prefix::new("releases/v1/").unwrap();

        let err = ensure_vacant(&storage, &bucket(), &prefix, &RetryPolicy::none())
            .await
            .unwrap_err();
        match &err {
            ReleaseError::AlreadyExists { url, objects } => {
                assert_eq!(url, "gs://site-bucket/releases/v1/");
                assert_eq!(objects, &["releases/v1/index.html"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.remediation().iter().any(|s| s.contains("--version")));
    }

    #[tokio::test]
    async fn sibling_release_does_not_conflict() {
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "releases/v10/index.html", "x");
        let prefix = Prefix::new("releases/v1/").unwrap();
        ensure_vacant(&storage, &bucket(), &prefix, &RetryPolicy::none())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn root_prefix_never_lists() {
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "index.html", "x");
        ensure_vacant(&storage, &bucket(), &Prefix::root(), &RetryPolicy::none())
            .await
            .unwrap();
        assert_eq!(storage.count(Operation::List), 0);
    }
}
