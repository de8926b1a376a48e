// ABOUTME: Rollback command implementation.
// ABOUTME: Selects an earlier release and prints or applies the path rewrite change.

use serde_json::json;
use std::env;

use sitepush::config::ConfigError;
use sitepush::deploy::{self, RollbackRequest};
use sitepush::diagnostics::Diagnostics;
use sitepush::error::Result;
use sitepush::output::Output;
use sitepush::prompt;
use sitepush::routing::RoutingOps;
use sitepush::storage::GsutilStorage;
use sitepush::types::ReleaseVersion;

use super::{emit_warnings, routing_client};
use crate::cli::ConfigArgs;

pub async fn rollback(
    args: &ConfigArgs,
    to: Option<&str>,
    apply: bool,
    yes: bool,
    output: &mut Output,
) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = args.resolver(&cwd).resolve()?;

    let version = to
        .map(|value| {
            ReleaseVersion::new(value).map_err(|e| ConfigError::Invalid {
                key: "to",
                message: e.to_string(),
            })
        })
        .transpose()?;
    let request = RollbackRequest { version, apply };

    let storage = GsutilStorage::default();
    let routing = routing_client(&config);
    let prompter = prompt::for_session(yes);
    let mut diag = Diagnostics::default();

    let report = deploy::rollback(
        &config,
        &storage,
        routing.as_ref().map(|r| r as &dyn RoutingOps),
        prompter.as_ref(),
        &request,
        &mut diag,
    )
    .await?;
    emit_warnings(output, &diag);

    let version = &report.release.version;
    if report.already_current() {
        output.success(&format!("Release {version} is already being served"));
    } else if report.applied {
        output.success(&format!(
            "Path rewrite now points at {} (changes can take a few minutes to propagate)",
            report.plan.rewrite
        ));
    } else {
        output.line(&format!("To roll back to {version}:"));
        for (n, step) in report.plan.steps().iter().enumerate() {
            output.line(&format!("  {}. {}", n + 1, step));
        }
        output.success(&format!("Rollback to {version} prepared; run with --apply to change routing"));
    }

    output.data(
        "rollback",
        json!({
            "version": version.as_str(),
            "prefix": report.release.prefix.as_str(),
            "rewrite": report.plan.rewrite,
            "current": report.plan.current,
            "applied": report.applied,
            "steps": report.plan.steps(),
        }),
    );
    Ok(())
}
