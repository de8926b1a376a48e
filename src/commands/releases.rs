// ABOUTME: Releases command implementation.
// ABOUTME: Lists stored releases and marks the one the load balancer serves.

use serde_json::json;
use std::env;

use sitepush::diagnostics::Diagnostics;
use sitepush::error::Result;
use sitepush::output::Output;
use sitepush::release::{ReleaseError, list_releases};
use sitepush::storage::GsutilStorage;

use super::{current_rewrite, emit_warnings, routing_client};
use crate::cli::ConfigArgs;

pub async fn releases(args: &ConfigArgs, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = args.resolver(&cwd).resolve()?;
    let url = config.bucket.url(config.prefix.as_str());
    if config.prefix.is_root() {
        return Err(ReleaseError::NoReleases(url).into());
    }

    let storage = GsutilStorage::default();
    let entries = list_releases(&storage, &config.bucket, &config.prefix, &config.retry).await?;

    let routing = routing_client(&config);
    let mut diag = Diagnostics::default();
    let current = current_rewrite(routing.as_ref(), &mut diag).await;
    emit_warnings(output, &diag);

    if entries.is_empty() {
        output.line(&format!("No releases under {url}"));
    }
    for entry in &entries {
        let marker = if current.as_deref() == Some(entry.prefix.rewrite_path().as_str()) {
            "  (current)"
        } else {
            ""
        };
        output.line(&format!("{}{}", entry.version, marker));
    }

    output.data(
        "releases",
        json!({
            "location": url,
            "current": current,
            "releases": entries.iter().map(|e| e.version.as_str()).collect::<Vec<_>>(),
        }),
    );
    output.success(&format!("{} release(s) under {}", entries.len(), url));
    Ok(())
}
