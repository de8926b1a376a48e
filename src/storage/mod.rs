// ABOUTME: Object storage abstraction used by the deploy and rollback workflows.
// ABOUTME: Exports the StorageOps trait, the gsutil-backed client and an in-memory store.

mod error;
mod gsutil;
mod memory;
mod metadata;

pub use error::StorageError;
pub use gsutil::GsutilStorage;
pub use memory::{MemoryStorage, Operation, StoredObject};
pub use metadata::{CacheControl, ContentEncoding, ObjectMetadata};

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::retry::RetryPolicy;
use crate::types::{BucketName, Prefix};

/// A remote object as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
}

/// Which local files a bulk synchronize skips.
///
/// `skip_extensions` drops whole classes such as HTML that are uploaded
/// separately; `skip_paths` drops individual files, namely the compression
/// intermediates of this run. Other `.gz` files in the build are ordinary
/// assets and are synchronized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncFilter {
    pub skip_extensions: Vec<String>,
    pub skip_paths: BTreeSet<String>,
}

impl SyncFilter {
    pub fn skipping<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_extensions: extensions
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .collect(),
            skip_paths: BTreeSet::new(),
        }
    }

    /// Also skip these slash-separated relative paths.
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Whether a relative path takes part in the bulk synchronize.
    pub fn includes(&self, relative: &str) -> bool {
        if self.skip_paths.contains(relative) {
            return false;
        }
        match relative.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => {
                !self.skip_extensions.contains(&ext.to_ascii_lowercase())
            }
            _ => true,
        }
    }

    /// Regex in the dialect of `gsutil rsync -x` matching the skipped files.
    ///
    /// Extensions match case-insensitively; paths match exactly.
    pub fn exclude_regex(&self) -> String {
        let mut alternatives = Vec::new();
        if !self.skip_extensions.is_empty() {
            alternatives.push(format!(r"(?i:.*\.({}))$", self.skip_extensions.join("|")));
        }
        alternatives.extend(
            self.skip_paths
                .iter()
                .map(|path| format!("^{}$", escape_regex(path))),
        );
        alternatives.join("|")
    }

    pub fn is_empty(&self) -> bool {
        self.skip_extensions.is_empty() && self.skip_paths.is_empty()
    }
}

fn escape_regex(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Result of a bulk synchronize.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Keys written during this synchronize (unchanged objects may be omitted).
    pub transferred: Vec<String>,
    /// Raw transcript of the transfer, appended to the sync log.
    pub transcript: String,
}

/// Operations against an object storage bucket.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// All objects under `prefix`, recursively.
    async fn list(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Immediate children of `prefix`; "directories" end with `/`.
    async fn list_children(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<String>, StorageError>;

    /// Whether a single object exists.
    async fn exists(&self, bucket: &BucketName, key: &str) -> Result<bool, StorageError>;

    /// Copy every file under `source` accepted by `filter` to `prefix`, never deleting.
    async fn sync_dir(
        &self,
        bucket: &BucketName,
        prefix: &Prefix,
        source: &Path,
        filter: &SyncFilter,
    ) -> Result<SyncReport, StorageError>;

    /// Upload one local file to `key` with the given metadata.
    async fn upload(
        &self,
        bucket: &BucketName,
        key: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError>;

    /// Patch the metadata of an existing object.
    async fn set_metadata(
        &self,
        bucket: &BucketName,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError>;

    async fn delete(&self, bucket: &BucketName, key: &str) -> Result<(), StorageError>;
}

/// Slash-separated path of `path` relative to `root`.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Key used by the write-access probe for this process.
pub fn probe_key(prefix: &Prefix) -> String {
    prefix.key(&format!(".sitepush-write-probe-{}", std::process::id()))
}

/// Check that the bucket accepts writes by uploading and deleting a scratch object.
///
/// Both remote calls run under `retry`. The local scratch file is a
/// `NamedTempFile`, so it is removed on every exit path, including an
/// interrupted deploy.
pub async fn probe_write_access<S: StorageOps + ?Sized>(
    storage: &S,
    bucket: &BucketName,
    prefix: &Prefix,
    retry: &RetryPolicy,
) -> Result<(), StorageError> {
    let mut scratch = tempfile::NamedTempFile::new()?;
    writeln!(scratch, "sitepush write probe")?;
    scratch.flush()?;

    let key = probe_key(prefix);
    let metadata = ObjectMetadata::default().content_type("text/plain");
    retry
        .run("upload write-access object", |_| {
            storage.upload(bucket, &key, scratch.path(), &metadata)
        })
        .await
        .map_err(|exhausted| exhausted.error)?;

    // A retried delete may find the object already gone.
    retry
        .run("delete write-access object", |attempt| {
            let key = &key;
            async move {
                match storage.delete(bucket, key).await {
                    Err(StorageError::NotFound(_)) if attempt > 1 => Ok(()),
                    other => other,
                }
            }
        })
        .await
        .map_err(|exhausted| exhausted.error)?;

    tracing::debug!(bucket = %bucket, key, "write probe succeeded");
    Ok(())
}
