// ABOUTME: In-process object store implementing StorageOps.
// ABOUTME: Records every call and can inject failures, for tests and rehearsals.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use walkdir::WalkDir;

use super::{
    ObjectInfo, ObjectMetadata, StorageError, StorageOps, SyncFilter, SyncReport, relative_key,
};
use crate::types::{BucketName, Prefix};

/// Storage operations, as recorded and as targeted by failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    ListChildren,
    Exists,
    Sync,
    Upload,
    SetMetadata,
    Delete,
}

/// An object held by `MemoryStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub metadata: ObjectMetadata,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(String, String), StoredObject>,
    failures: HashMap<Operation, u32>,
    calls: Vec<Operation>,
}

/// Object storage kept entirely in memory.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStorage")
            .field("objects", &state.objects.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing call recording.
    pub fn insert(&self, bucket: &BucketName, key: &str, body: impl Into<Bytes>) {
        self.state.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                metadata: ObjectMetadata::default(),
            },
        );
    }

    pub fn object(&self, bucket: &BucketName, key: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in a bucket, in lexical order.
    pub fn keys(&self, bucket: &BucketName) -> Vec<String> {
        self.state
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket.as_str())
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Make the next `times` calls of `operation` fail.
    pub fn fail_next(&self, operation: Operation, times: u32) {
        self.state.lock().failures.insert(operation, times);
    }

    /// Every operation attempted so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    fn begin(&self, operation: Operation) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(operation);
        if let Some(remaining) = state.failures.get_mut(&operation)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(StorageError::Injected(format!("{operation:?}")));
        }
        Ok(())
    }

    fn keys_under(&self, bucket: &BucketName, prefix: &Prefix) -> Vec<String> {
        self.state
            .lock()
            .objects
            .keys()
            .filter(|(b, k)| b == bucket.as_str() && k.starts_with(prefix.as_str()))
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl StorageOps for MemoryStorage {
    async fn list(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<ObjectInfo>, StorageError> {
        self.begin(Operation::List)?;
        Ok(self
            .keys_under(bucket, prefix)
            .into_iter()
            .map(|key| ObjectInfo { key })
            .collect())
    }

    async fn list_children(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<String>, StorageError> {
        self.begin(Operation::ListChildren)?;
        let children: BTreeSet<String> = self
            .keys_under(bucket, prefix)
            .iter()
            .filter_map(|key| prefix.relative(key))
            .map(|rest| match rest.split_once('/') {
                Some((dir, _)) => format!("{dir}/"),
                None => rest.to_string(),
            })
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn exists(&self, bucket: &BucketName, key: &str) -> Result<bool, StorageError> {
        self.begin(Operation::Exists)?;
        Ok(self
            .state
            .lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn sync_dir(
        &self,
        bucket: &BucketName,
        prefix: &Prefix,
        source: &Path,
        filter: &SyncFilter,
    ) -> Result<SyncReport, StorageError> {
        self.begin(Operation::Sync)?;
        let mut report = SyncReport::default();

        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_key(source, entry.path());
            if !filter.includes(&relative) {
                continue;
            }

            let key = prefix.key(&relative);
            let body = std::fs::read(entry.path())?;
            report.transcript.push_str(&format!(
                "Copying file://{} [Content-Type=unset]...\n",
                entry.path().display()
            ));
            self.state.lock().objects.insert(
                (bucket.to_string(), key.clone()),
                StoredObject {
                    body: Bytes::from(body),
                    metadata: ObjectMetadata::default(),
                },
            );
            report.transferred.push(key);
        }

        Ok(report)
    }

    async fn upload(
        &self,
        bucket: &BucketName,
        key: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        self.begin(Operation::Upload)?;
        let body = std::fs::read(source)?;
        self.state.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: Bytes::from(body),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn set_metadata(
        &self,
        bucket: &BucketName,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        self.begin(Operation::SetMetadata)?;
        let mut state = self.state.lock();
        let object = state
            .objects
            .get_mut(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::NotFound(bucket.url(key)))?;
        object.metadata.merge(metadata);
        Ok(())
    }

    async fn delete(&self, bucket: &BucketName, key: &str) -> Result<(), StorageError> {
        self.begin(Operation::Delete)?;
        self.state
            .lock()
            .objects
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(bucket.url(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketName {
        BucketName::new("test-bucket").unwrap()
    }

    #[tokio::test]
    async fn list_children_groups_directories() {
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "releases/v1/index.html", "a");
        storage.insert(&bucket(), "releases/v1/app.js", "b");
        storage.insert(&bucket(), "releases/v2/index.html", "c");
        storage.insert(&bucket(), "releases/notes.txt", "d");
        storage.insert(&bucket(), "other/file", "e");

        let prefix = Prefix::new("releases/").unwrap();
        let children = storage.list_children(&bucket(), &prefix).await.unwrap();
        assert_eq!(children, vec!["notes.txt", "v1/", "v2/"]);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let storage = MemoryStorage::new();
        storage.fail_next(Operation::Exists, 1);

        assert!(storage.exists(&bucket(), "x").await.is_err());
        assert!(!storage.exists(&bucket(), "x").await.unwrap());
        assert_eq!(storage.count(Operation::Exists), 2);
    }

    #[tokio::test]
    async fn set_metadata_requires_existing_object() {
        let storage = MemoryStorage::new();
        let err = storage
            .set_metadata(&bucket(), "missing", &ObjectMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
