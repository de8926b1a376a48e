// ABOUTME: RoutingOps implementation that drives `gcloud compute url-maps`.
// ABOUTME: Updates go through export, local edit and import of the url-map document.

use async_trait::async_trait;
use serde_yaml::Value;
use std::path::Path;

use super::RoutingOps;
use super::error::RoutingError;
use super::url_map;
use crate::process::{self, CommandOutput};

/// Identifies the url-map and path matcher that serve the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub project: Option<String>,
    pub url_map: String,
    pub path_matcher: String,
}

impl RoutingTarget {
    /// `--project=<id>` when a project is configured.
    pub fn project_args(&self) -> Vec<String> {
        self.project
            .iter()
            .map(|p| format!("--project={p}"))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct GcloudRouting {
    program: String,
    target: RoutingTarget,
}

impl GcloudRouting {
    pub fn new(target: RoutingTarget) -> Self {
        Self {
            program: "gcloud".to_string(),
            target,
        }
    }

    pub fn target(&self) -> &RoutingTarget {
        &self.target
    }

    async fn gcloud(&self, operation: &str, mut args: Vec<String>) -> Result<CommandOutput, RoutingError> {
        args.extend(self.target.project_args());
        let output = process::run(&self.program, &args, None)
            .await
            .map_err(|source| RoutingError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.success() {
            return Err(RoutingError::CommandFailed {
                operation: operation.to_string(),
                message: output.diagnostic(),
            });
        }
        Ok(output)
    }

    async fn export(&self, destination: &Path) -> Result<(), RoutingError> {
        self.gcloud(
            "url-map export",
            vec![
                "compute".into(),
                "url-maps".into(),
                "export".into(),
                self.target.url_map.clone(),
                format!("--destination={}", destination.display()),
                "--quiet".into(),
            ],
        )
        .await
        .map(drop)
    }

    async fn import(&self, source: &Path) -> Result<(), RoutingError> {
        self.gcloud(
            "url-map import",
            vec![
                "compute".into(),
                "url-maps".into(),
                "import".into(),
                self.target.url_map.clone(),
                format!("--source={}", source.display()),
                "--quiet".into(),
            ],
        )
        .await
        .map(drop)
    }
}

#[async_trait]
impl RoutingOps for GcloudRouting {
    async fn current_rewrite(&self) -> Result<Option<String>, RoutingError> {
        let output = self
            .gcloud(
                "url-map describe",
                vec![
                    "compute".into(),
                    "url-maps".into(),
                    "describe".into(),
                    self.target.url_map.clone(),
                    "--format=json".into(),
                ],
            )
            .await?;
        let doc: Value = serde_yaml::from_str(&output.stdout)?;
        url_map::path_rewrite(&doc, &self.target.url_map, &self.target.path_matcher)
    }

    async fn set_rewrite(&self, path: &str) -> Result<(), RoutingError> {
        let scratch = tempfile::Builder::new()
            .prefix("sitepush-url-map-")
            .suffix(".yaml")
            .tempfile()?;

        self.export(scratch.path()).await?;

        let mut doc: Value = serde_yaml::from_str(&std::fs::read_to_string(scratch.path())?)?;
        url_map::set_path_rewrite(&mut doc, &self.target.url_map, &self.target.path_matcher, path)?;
        std::fs::write(scratch.path(), serde_yaml::to_string(&doc)?)?;

        self.import(scratch.path()).await?;
        tracing::info!(url_map = %self.target.url_map, path, "path rewrite updated");
        Ok(())
    }
}
