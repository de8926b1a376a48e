// ABOUTME: Append-only transcript of bulk synchronize runs.
// ABOUTME: Kept on local disk for post-mortem diagnosis of failed uploads.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::{BucketName, Prefix};

/// Destination of the sync transcript. `None` disables logging.
#[derive(Debug, Clone, Default)]
pub struct SyncLog {
    path: Option<PathBuf>,
}

impl SyncLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one transcript section. Failures are logged, never fatal.
    pub fn append(&self, bucket: &BucketName, prefix: &Prefix, transcript: &str) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = Self::write_section(path, bucket, prefix, transcript) {
            tracing::warn!("failed to write sync log {}: {}", path.display(), e);
        }
    }

    fn write_section(
        path: &Path,
        bucket: &BucketName,
        prefix: &Prefix,
        transcript: &str,
    ) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(
            file,
            "=== {} host={} target={} ===",
            Utc::now().to_rfc3339(),
            gethostname::gethostname().to_string_lossy(),
            bucket.url(prefix.as_str())
        )?;
        file.write_all(transcript.as_bytes())?;
        if !transcript.ends_with('\n') {
            writeln!(file)?;
        }
        Ok(())
    }
}
