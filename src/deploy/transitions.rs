// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::compress::Compressor;
use crate::diagnostics::Warning;
use crate::prompt::Prompter;
use crate::release::{SourceControl, ensure_vacant, list_releases, resolve_version};
use crate::routing::RepointPlan;
use crate::storage::{StorageOps, probe_write_access};
use crate::upload::{Extraneous, SyncLog, UploadPlan, Uploader};

use super::Deployment;
use super::error::DeployError;
use super::report::DeployReport;
use super::state::{Cleared, Compressed, Configured, Named, Target, Uploaded, Verified};

/// Whether `dir` holds at least one file.
fn has_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file())
}

// =============================================================================
// Configured -> Named
// =============================================================================

impl Deployment<Configured> {
    /// Make sure the build directory exists.
    ///
    /// An interactive session is asked once for another path before failing
    /// with `DeployError::BuildDirectoryNotFound`.
    pub fn locate_build_dir(mut self, prompter: &dyn Prompter) -> Result<Self, DeployError> {
        if self.config.build_dir.is_dir() {
            return Ok(self);
        }
        if !prompter.is_interactive() {
            return Err(DeployError::BuildDirectoryNotFound(self.config.build_dir.clone()));
        }

        let answer = prompter.input(
            &format!(
                "Build directory {} not found. Path to the build output",
                self.config.build_dir.display()
            ),
            None,
        )?;
        let candidate = PathBuf::from(answer.trim());
        if !candidate.is_dir() {
            return Err(DeployError::BuildDirectoryNotFound(candidate));
        }

        self.config.build_dir = candidate;
        Ok(self)
    }

    /// Compute the release version and the prefix it will be stored under.
    pub async fn name<C: SourceControl + ?Sized>(
        self,
        scm: &C,
        now: DateTime<Utc>,
    ) -> Result<Deployment<Named>, DeployError> {
        let version = resolve_version(&self.config.version, scm, now).await?;
        let prefix = self.config.release_prefix(&version);
        tracing::info!(%version, %prefix, "release named");
        Ok(self.advance(|_| Named {
            target: Target { version, prefix },
        }))
    }
}

// =============================================================================
// Named -> Cleared
// =============================================================================

impl Deployment<Named> {
    /// Fail with `ReleaseAlreadyExists` if the target prefix is occupied.
    pub async fn check_conflicts<S: StorageOps + ?Sized>(
        self,
        storage: &S,
    ) -> Result<Deployment<Cleared>, DeployError> {
        ensure_vacant(
            storage,
            &self.config.bucket,
            &self.state.target.prefix,
            &self.config.retry,
        )
        .await?;
        Ok(self.advance(|named| Cleared {
            target: named.target,
        }))
    }
}

// =============================================================================
// Cleared -> Compressed
// =============================================================================

impl Deployment<Cleared> {
    fn compressor(&self) -> Compressor {
        Compressor::new(&self.config.compress_extensions)
    }

    /// The upload plan as it would run, without touching disk or storage.
    pub fn preview(&self) -> Result<UploadPlan, DeployError> {
        let predicted = self.compressor().predict(&self.config.build_dir)?;
        Ok(UploadPlan::build(
            &self.config.build_dir,
            &self.state.target.prefix,
            &predicted,
            &self.config.media_types,
            self.config.cache,
        )?)
    }

    /// Write gzip siblings for every eligible file.
    pub fn compress(mut self) -> Result<Deployment<Compressed>, DeployError> {
        if !has_files(&self.config.build_dir) {
            return Err(DeployError::EmptyBuild(self.config.build_dir.clone()));
        }
        let compressed = self
            .compressor()
            .compress(&self.config.build_dir, &mut self.diag)?;
        Ok(self.advance(|cleared| Compressed {
            target: cleared.target,
            compressed,
        }))
    }
}

// =============================================================================
// Compressed -> Uploaded
// =============================================================================

impl Deployment<Compressed> {
    /// Probe write access, run passes (a) to (d), then remove the intermediates.
    ///
    /// On failure the deployment is dropped, which also removes the
    /// intermediates; remote objects already written stay in place.
    pub async fn upload<S: StorageOps + ?Sized>(
        mut self,
        storage: &S,
    ) -> Result<Deployment<Uploaded>, DeployError> {
        let config = &self.config;
        let target = &self.state.target;

        let plan = UploadPlan::build(
            &config.build_dir,
            &target.prefix,
            self.state.compressed.intermediates(),
            &config.media_types,
            config.cache,
        )?;
        if plan.is_empty() {
            return Err(DeployError::EmptyBuild(config.build_dir.clone()));
        }

        probe_write_access(storage, &config.bucket, &target.prefix, &config.retry)
            .await
            .map_err(|source| DeployError::WriteProbe {
                bucket: config.bucket.to_string(),
                source,
            })?;

        let log = config
            .log_file
            .as_ref()
            .map(|path| SyncLog::new(path.clone()))
            .unwrap_or_default();
        let extraneous = if config.delete_extraneous && target.prefix.is_root() {
            Extraneous::Delete
        } else {
            Extraneous::Keep
        };

        let report = Uploader::new(storage, &config.bucket, &config.retry, &log)
            .upload(&plan, extraneous)
            .await?;

        if !report.stale.is_empty() {
            self.diag.warn(Warning::stale_objects(format!(
                "{} object(s) in {} are not part of this build; use --delete to remove them",
                report.stale.len(),
                config.bucket.url(target.prefix.as_str())
            )));
        }
        if !plan.has_index() {
            self.diag.warn(Warning::missing_index(format!(
                "release {} has no index.html",
                target.version
            )));
        }

        let mut uploaded = self.advance(|compressed| {
            let count = compressed.compressed.len();
            Uploaded {
                target: compressed.target,
                plan,
                report,
                compressed: count,
                cleanup: compressed.compressed.cleanup(),
            }
        });

        let failed = uploaded.state.cleanup.failed.len();
        if failed > 0 {
            uploaded.diag.warn(Warning::cleanup_failed(format!(
                "{failed} compression intermediate(s) could not be removed from {}",
                uploaded.config.build_dir.display()
            )));
        }
        Ok(uploaded)
    }
}

// =============================================================================
// Uploaded -> Verified -> report
// =============================================================================

impl Deployment<Uploaded> {
    /// Confirm the release is visible in storage.
    pub async fn verify<S: StorageOps + ?Sized>(
        self,
        storage: &S,
    ) -> Result<Deployment<Verified>, DeployError> {
        let log = SyncLog::disabled();
        Uploader::new(storage, &self.config.bucket, &self.config.retry, &log)
            .verify(&self.state.plan)
            .await?;
        Ok(self.advance(|uploaded| Verified {
            target: uploaded.target,
            report: uploaded.report,
            compressed: uploaded.compressed,
        }))
    }
}

impl Deployment<Verified> {
    /// List the releases now in storage and build the final report.
    pub async fn finish<S: StorageOps + ?Sized>(self, storage: &S) -> Result<DeployReport, DeployError> {
        let releases = if self.config.prefix.is_root() {
            Vec::new()
        } else {
            list_releases(storage, &self.config.bucket, &self.config.prefix, &self.config.retry)
                .await?
        };

        let target = self.state.target;
        let repoint = self.config.routing.as_ref().map(|routing| {
            RepointPlan::new(routing.target.clone(), routing.host.clone(), &target.prefix)
        });

        Ok(DeployReport {
            bucket: self.config.bucket,
            target,
            upload: self.state.report,
            compressed: self.state.compressed,
            releases,
            repoint,
            warnings: self.diag.warnings().to_vec(),
        })
    }
}
