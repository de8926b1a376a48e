// ABOUTME: Summary of a finished deploy, printed by the CLI.
// ABOUTME: Carries per-pass counts, the release listing and repoint instructions.

use serde_json::{Value, json};

use crate::diagnostics::{Warning, WarningKind};
use crate::release::ReleaseEntry;
use crate::routing::RepointPlan;
use crate::types::BucketName;
use crate::upload::UploadReport;

use super::state::Target;

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub bucket: BucketName,
    pub target: Target,
    pub upload: UploadReport,
    /// Gzip intermediates produced (and removed again).
    pub compressed: usize,
    /// Releases under the releases prefix after the deploy.
    pub releases: Vec<ReleaseEntry>,
    /// How to point the load balancer at the new release, when routing is configured.
    pub repoint: Option<RepointPlan>,
    pub warnings: Vec<Warning>,
}

impl DeployReport {
    pub fn url(&self) -> String {
        self.bucket.url(self.target.prefix.as_str())
    }

    pub fn compression_failures(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.kind == WarningKind::CompressionFailed)
            .count()
    }

    /// Human readable summary lines.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Release:     {}", self.target.version),
            format!("Location:    {}", self.url()),
            format!(
                "Objects:     {} synced, {} compressed assets, {} html, {} compressed html",
                self.upload.patched,
                self.upload.compressed_assets,
                self.upload.html,
                self.upload.compressed_html
            ),
            format!(
                "Compression: {} file(s), {} failure(s)",
                self.compressed,
                self.compression_failures()
            ),
        ];
        if self.upload.pruned > 0 {
            lines.push(format!("Pruned:      {} object(s)", self.upload.pruned));
        }
        lines
    }

    pub fn to_json(&self) -> Value {
        json!({
            "version": self.target.version.as_str(),
            "prefix": self.target.prefix.as_str(),
            "url": self.url(),
            "objects": {
                "bulk": self.upload.patched,
                "compressed_assets": self.upload.compressed_assets,
                "html": self.upload.html,
                "compressed_html": self.upload.compressed_html,
                "pruned": self.upload.pruned,
                "stale": self.upload.stale.len(),
            },
            "compressed": self.compressed,
            "compression_failures": self.compression_failures(),
            "releases": self.releases.iter().map(|r| r.version.as_str()).collect::<Vec<_>>(),
            "repoint": self.repoint.as_ref().map(|p| p.steps()),
            "warnings": self.warnings.iter().map(|w| w.message.as_str()).collect::<Vec<_>>(),
        })
    }
}
