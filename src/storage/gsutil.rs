// ABOUTME: StorageOps implementation that drives the gsutil command-line client.
// ABOUTME: Each trait method maps to a single gsutil invocation.

use async_trait::async_trait;
use std::path::Path;

use super::{
    ObjectInfo, ObjectMetadata, StorageError, StorageOps, SyncFilter, SyncReport, relative_key,
};
use crate::process::{self, CommandOutput};
use crate::types::{BucketName, Prefix};

/// gsutil prints this when a listing matched nothing; that is an empty result, not a failure.
const NO_MATCH: &str = "matched no objects";

/// Google Cloud Storage client backed by `gsutil`.
#[derive(Debug, Clone)]
pub struct GsutilStorage {
    program: String,
    parallel: bool,
}

impl Default for GsutilStorage {
    fn default() -> Self {
        Self::new("gsutil")
    }
}

impl GsutilStorage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            parallel: true,
        }
    }

    /// Disable `gsutil -m` multi-threaded transfers.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    async fn gsutil(&self, operation: &str, args: Vec<String>) -> Result<CommandOutput, StorageError> {
        process::run(&self.program, &args, None)
            .await
            .map_err(|source| StorageError::Spawn {
                program: self.program.clone(),
                source,
            })
            .map(|output| {
                tracing::trace!(operation, stdout = %output.stdout, "gsutil finished");
                output
            })
    }

    async fn checked(&self, operation: &str, args: Vec<String>) -> Result<CommandOutput, StorageError> {
        let output = self.gsutil(operation, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(StorageError::CommandFailed {
                operation: operation.to_string(),
                message: output.diagnostic(),
            })
        }
    }

    fn header_args(metadata: &ObjectMetadata) -> Vec<String> {
        metadata
            .headers()
            .into_iter()
            .flat_map(|(name, value)| ["-h".to_string(), format!("{name}:{value}")])
            .collect()
    }

    fn prefix_url(bucket: &BucketName, prefix: &Prefix) -> String {
        if prefix.is_root() {
            format!("gs://{bucket}")
        } else {
            bucket.url(prefix.as_str().trim_end_matches('/'))
        }
    }

    /// Keys relative to the bucket from `gsutil ls` output lines.
    fn parse_listing(bucket: &BucketName, stdout: &str) -> Vec<String> {
        let base = format!("gs://{bucket}/");
        stdout
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix(&base))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl StorageOps for GsutilStorage {
    async fn list(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<ObjectInfo>, StorageError> {
        let url = bucket.url(&format!("{}**", prefix.as_str()));
        let output = self.gsutil("list", vec!["ls".into(), url]).await?;

        if !output.success() {
            if output.stderr.contains(NO_MATCH) {
                return Ok(Vec::new());
            }
            return Err(StorageError::CommandFailed {
                operation: "list".to_string(),
                message: output.diagnostic(),
            });
        }

        Ok(Self::parse_listing(bucket, &output.stdout)
            .into_iter()
            .filter(|key| !key.ends_with('/'))
            .map(|key| ObjectInfo { key })
            .collect())
    }

    async fn list_children(&self, bucket: &BucketName, prefix: &Prefix) -> Result<Vec<String>, StorageError> {
        let url = bucket.url(prefix.as_str());
        let output = self.gsutil("list children", vec!["ls".into(), url]).await?;

        if !output.success() {
            if output.stderr.contains(NO_MATCH) {
                return Ok(Vec::new());
            }
            return Err(StorageError::CommandFailed {
                operation: "list children".to_string(),
                message: output.diagnostic(),
            });
        }

        Ok(Self::parse_listing(bucket, &output.stdout)
            .iter()
            .filter_map(|key| prefix.relative(key))
            .filter(|child| !child.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn exists(&self, bucket: &BucketName, key: &str) -> Result<bool, StorageError> {
        let output = self
            .gsutil("stat", vec!["-q".into(), "stat".into(), bucket.url(key)])
            .await?;
        match output.exit_code {
            Some(0) => Ok(true),
            Some(1) if output.stderr.trim().is_empty() => Ok(false),
            _ => Err(StorageError::CommandFailed {
                operation: "stat".to_string(),
                message: output.diagnostic(),
            }),
        }
    }

    async fn sync_dir(
        &self,
        bucket: &BucketName,
        prefix: &Prefix,
        source: &Path,
        filter: &SyncFilter,
    ) -> Result<SyncReport, StorageError> {
        let mut args = Vec::new();
        if self.parallel {
            args.push("-m".to_string());
        }
        args.extend(["rsync".to_string(), "-r".to_string()]);
        // An empty -x pattern would exclude every file.
        if !filter.is_empty() {
            args.extend(["-x".to_string(), filter.exclude_regex()]);
        }
        args.extend([
            source.display().to_string(),
            Self::prefix_url(bucket, prefix),
        ]);

        let output = self.gsutil("rsync", args).await?;
        let transcript = format!("{}{}", output.stdout, output.stderr);
        if !output.success() {
            return Err(StorageError::SyncFailed {
                message: output.diagnostic(),
                transcript,
            });
        }

        // gsutil reports "Copying file://<local> [Content-Type=...]..." per transfer.
        let transferred = transcript
            .lines()
            .filter_map(|line| line.trim().strip_prefix("Copying file://"))
            .filter_map(|rest| rest.split(" [").next())
            .map(Path::new)
            .filter(|local| local.starts_with(source))
            .map(|local| prefix.key(&relative_key(source, local)))
            .collect();

        Ok(SyncReport {
            transferred,
            transcript,
        })
    }

    async fn upload(
        &self,
        bucket: &BucketName,
        key: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        let mut args = Self::header_args(metadata);
        args.extend([
            "cp".to_string(),
            source.display().to_string(),
            bucket.url(key),
        ]);
        self.checked("upload", args).await.map(|_| ())
    }

    async fn set_metadata(
        &self,
        bucket: &BucketName,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        let mut args = vec!["setmeta".to_string()];
        args.extend(Self::header_args(metadata));
        args.push(bucket.url(key));
        self.checked("setmeta", args).await.map(|_| ())
    }

    async fn delete(&self, bucket: &BucketName, key: &str) -> Result<(), StorageError> {
        self.checked("delete", vec!["rm".into(), bucket.url(key)])
            .await
            .map(|_| ())
    }
}
