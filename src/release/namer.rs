// ABOUTME: Computes the release version from an explicit value, a git tag or a timestamp.
// ABOUTME: Source control is queried through a trait so naming can run without a repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::ReleaseError;
use crate::process;
use crate::types::ReleaseVersion;

/// How the release version is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionSpec {
    /// `<nearest annotated tag>-<short revision>`.
    #[default]
    Auto,
    /// `<YYYYMMDD-HHMMSS UTC>-<short revision>`.
    Timestamp,
    /// Used as given.
    Explicit(String),
}

impl VersionSpec {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "auto" => VersionSpec::Auto,
            "timestamp" => VersionSpec::Timestamp,
            other => VersionSpec::Explicit(other.to_string()),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Auto => write!(f, "auto"),
            VersionSpec::Timestamp => write!(f, "timestamp"),
            VersionSpec::Explicit(v) => write!(f, "{v}"),
        }
    }
}

/// Read-only view of the source repository.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Abbreviated revision of HEAD.
    async fn short_revision(&self) -> Result<String, ReleaseError>;

    /// Nearest annotated tag reachable from HEAD, if any.
    async fn nearest_tag(&self) -> Result<Option<String>, ReleaseError>;
}

/// `SourceControl` backed by the `git` command-line client.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn git(&self, args: &[&str]) -> Result<process::CommandOutput, ReleaseError> {
        process::run("git", args, Some(Path::new(&self.dir)))
            .await
            .map_err(|e| ReleaseError::SourceControl(format!("failed to run git: {e}")))
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn short_revision(&self) -> Result<String, ReleaseError> {
        let output = self.git(&["rev-parse", "--short", "HEAD"]).await?;
        if !output.success() {
            return Err(ReleaseError::SourceControl(format!(
                "git rev-parse failed: {}",
                output.diagnostic()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn nearest_tag(&self) -> Result<Option<String>, ReleaseError> {
        // Without --tags, describe only considers annotated tags.
        let output = self.git(&["describe", "--abbrev=0"]).await?;
        if !output.success() {
            return Ok(None);
        }
        let tag = output.stdout.trim();
        Ok((!tag.is_empty()).then(|| tag.to_string()))
    }
}

/// Format the timestamp part of a timestamped version.
pub fn timestamp_label(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Resolve `spec` into a concrete release version.
///
/// Only source control is consulted; nothing here touches storage, so a
/// missing tag fails before any network call is made.
pub async fn resolve_version<C: SourceControl + ?Sized>(
    spec: &VersionSpec,
    scm: &C,
    now: DateTime<Utc>,
) -> Result<ReleaseVersion, ReleaseError> {
    let value = match spec {
        VersionSpec::Explicit(value) => value.clone(),
        VersionSpec::Auto => {
            let tag = scm.nearest_tag().await?.ok_or(ReleaseError::NoReachableTag)?;
            let revision = scm.short_revision().await?;
            format!("{tag}-{revision}")
        }
        VersionSpec::Timestamp => {
            let revision = scm.short_revision().await?;
            format!("{}-{}", timestamp_label(now), revision)
        }
    };

    ReleaseVersion::new(&value).map_err(|source| ReleaseError::InvalidVersion { value, source })
}
