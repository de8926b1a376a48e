// ABOUTME: Executes an UploadPlan against object storage, pass by pass.
// ABOUTME: Every remote call is retried; an exhausted step aborts the upload and keeps partial state.

use std::future::Future;

use super::error::UploadError;
use super::log::SyncLog;
use super::plan::{Pass, PlannedObject, UploadPlan};
use crate::retry::RetryPolicy;
use crate::storage::{StorageError, StorageOps};
use crate::types::BucketName;

/// What to do with remote objects that are not part of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extraneous {
    /// Leave them and report how many there are.
    #[default]
    Keep,
    /// Delete them after all passes succeeded. Only honoured for root deploys.
    Delete,
}

/// Counts of what an upload did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Files transferred by the bulk synchronize.
    pub synced: usize,
    /// Objects whose cache metadata was patched after the bulk synchronize.
    pub patched: usize,
    pub compressed_assets: usize,
    pub html: usize,
    pub compressed_html: usize,
    /// Remote objects deleted because they are not part of the build.
    pub pruned: usize,
    /// Remote objects outside the build that were left in place.
    pub stale: Vec<String>,
}

/// Runs the upload passes for one release.
pub struct Uploader<'a, S: StorageOps + ?Sized> {
    storage: &'a S,
    bucket: &'a BucketName,
    retry: &'a RetryPolicy,
    log: &'a SyncLog,
}

impl<'a, S: StorageOps + ?Sized> Uploader<'a, S> {
    pub fn new(
        storage: &'a S,
        bucket: &'a BucketName,
        retry: &'a RetryPolicy,
        log: &'a SyncLog,
    ) -> Self {
        Self {
            storage,
            bucket,
            retry,
            log,
        }
    }

    /// Run `operation` under the retry policy, naming `step` on failure.
    async fn step<T, F, Fut>(&self, step: String, operation: F) -> Result<T, UploadError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        self.retry
            .run(&step, operation)
            .await
            .map_err(|exhausted| UploadError::StepFailed {
                step,
                attempts: exhausted.attempts,
                source: exhausted.error,
            })
    }

    /// Upload the plan. Passes run strictly in order; each finishes before the next starts.
    pub async fn upload(
        &self,
        plan: &UploadPlan,
        extraneous: Extraneous,
    ) -> Result<UploadReport, UploadError> {
        let mut report = UploadReport::default();

        for pass in Pass::ALL {
            let objects = plan.pass(pass);
            tracing::info!(%pass, objects = objects.len(), "starting upload pass");
            match pass {
                Pass::Bulk => {
                    report.synced = self.sync(plan).await?;
                    report.patched = self.patch_metadata(objects).await?;
                }
                Pass::CompressedAssets => report.compressed_assets = self.copy_each(objects).await?,
                Pass::Html => report.html = self.copy_each(objects).await?,
                Pass::CompressedHtml => report.compressed_html = self.copy_each(objects).await?,
            }
        }

        if plan.prefix.is_root() {
            let extra = self.extraneous(plan).await?;
            match extraneous {
                Extraneous::Delete => report.pruned = self.prune(&extra).await?,
                Extraneous::Keep => report.stale = extra,
            }
        }

        Ok(report)
    }

    async fn sync(&self, plan: &UploadPlan) -> Result<usize, UploadError> {
        if plan.bulk.is_empty() {
            return Ok(0);
        }
        let filter = &plan.sync_filter();
        self.step("bulk synchronize".to_string(), |attempt| async move {
            let result = self
                .storage
                .sync_dir(self.bucket, &plan.prefix, &plan.source, filter)
                .await;
            let transcript = match &result {
                Ok(sync) => sync.transcript.clone(),
                Err(e) => failed_attempt_transcript(attempt, e),
            };
            self.log.append(self.bucket, &plan.prefix, &transcript);
            result.map(|sync| sync.transferred.len())
        })
        .await
    }

    async fn patch_metadata(&self, objects: &[PlannedObject]) -> Result<usize, UploadError> {
        for object in objects {
            self.step(format!("set metadata on {}", object.key), |_| {
                self.storage
                    .set_metadata(self.bucket, &object.key, &object.metadata)
            })
            .await?;
        }
        Ok(objects.len())
    }

    async fn copy_each(&self, objects: &[PlannedObject]) -> Result<usize, UploadError> {
        for object in objects {
            self.step(format!("upload {}", object.key), |_| {
                self.storage
                    .upload(self.bucket, &object.key, &object.local, &object.metadata)
            })
            .await?;
        }
        Ok(objects.len())
    }

    /// Remote keys under the plan's prefix that the build does not contain.
    async fn extraneous(&self, plan: &UploadPlan) -> Result<Vec<String>, UploadError> {
        let listing = self
            .step(format!("list {}", self.bucket.url(plan.prefix.as_str())), |_| {
                self.storage.list(self.bucket, &plan.prefix)
            })
            .await?;
        Ok(listing
            .into_iter()
            .map(|object| object.key)
            .filter(|key| !plan.logical_keys.contains(key))
            .collect())
    }

    async fn prune(&self, keys: &[String]) -> Result<usize, UploadError> {
        for key in keys {
            tracing::info!(key, "deleting object not present in build");
            self.step(format!("delete {key}"), |_| {
                self.storage.delete(self.bucket, key)
            })
            .await?;
        }
        Ok(keys.len())
    }

    /// Confirm the release is visible remotely.
    ///
    /// With an `index.html` in the build that object must exist; otherwise at
    /// least one object must be listable under the prefix.
    pub async fn verify(&self, plan: &UploadPlan) -> Result<(), UploadError> {
        if plan.has_index() {
            let key = plan.prefix.key("index.html");
            let found = self
                .step(format!("stat {key}"), |_| self.storage.exists(self.bucket, &key))
                .await?;
            if !found {
                return Err(UploadError::VerificationFailed {
                    reason: format!("{} is missing", self.bucket.url(&key)),
                });
            }
            return Ok(());
        }

        let listing = self
            .step(format!("list {}", self.bucket.url(plan.prefix.as_str())), |_| {
                self.storage.list(self.bucket, &plan.prefix)
            })
            .await?;
        if listing.is_empty() {
            return Err(UploadError::VerificationFailed {
                reason: format!(
                    "no objects found under {}",
                    self.bucket.url(plan.prefix.as_str())
                ),
            });
        }
        Ok(())
    }
}

/// Log section for a failed synchronize attempt: the error, then whatever the client printed.
fn failed_attempt_transcript(attempt: u32, error: &StorageError) -> String {
    let mut section = format!("attempt {attempt} failed: {error}\n");
    if let Some(transcript) = error.transcript() {
        section.push_str(transcript);
    }
    section
}
