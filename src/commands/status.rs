// ABOUTME: Status command implementation.
// ABOUTME: Shows the resolved configuration, the live path rewrite and the stored releases.

use serde_json::json;
use std::env;

use sitepush::diagnostics::Diagnostics;
use sitepush::error::Result;
use sitepush::output::Output;
use sitepush::release::list_releases;
use sitepush::storage::GsutilStorage;

use super::{current_rewrite, emit_warnings, routing_client};
use crate::cli::ConfigArgs;

pub async fn status(args: &ConfigArgs, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = args.resolver(&cwd).resolve()?;
    let target = config.bucket.url(config.prefix.as_str());

    output.line(&format!(
        "Environment: {}",
        config.environment.as_deref().unwrap_or("(default)")
    ));
    output.line(&format!("Bucket:      {}", config.bucket));
    if let Some(project) = &config.project {
        output.line(&format!("Project:     {project}"));
    }
    for (label, value) in [
        ("Region:", &config.region),
        ("Location:", &config.location),
        ("Backend:", &config.backend),
    ] {
        if let Some(value) = value {
            output.line(&format!("{label:<13}{value}"));
        }
    }
    output.line(&format!("Build dir:   {}", config.build_dir.display()));
    output.line(&format!("Target:      {target}"));
    output.line(&format!(
        "Cache:       {}s assets, {}s html",
        config.cache.long, config.cache.short
    ));
    output.line(&format!("Compress:    {}", config.compress_extensions.join(", ")));

    let routing = routing_client(&config);
    let mut diag = Diagnostics::default();
    let current = current_rewrite(routing.as_ref(), &mut diag).await;
    match (&config.routing, &current) {
        (None, _) => output.line("Routing:     not configured"),
        (Some(r), Some(rewrite)) => output.line(&format!(
            "Routing:     {}/{} → {}",
            r.target.url_map, r.target.path_matcher, rewrite
        )),
        (Some(r), None) => output.line(&format!(
            "Routing:     {}/{} (no path rewrite)",
            r.target.url_map, r.target.path_matcher
        )),
    }

    let releases = if config.prefix.is_root() {
        Vec::new()
    } else {
        let storage = GsutilStorage::default();
        list_releases(&storage, &config.bucket, &config.prefix, &config.retry).await?
    };
    emit_warnings(output, &diag);
    if !config.prefix.is_root() {
        output.line(&format!("Releases:    {}", releases.len()));
    }

    output.data(
        "status",
        json!({
            "environment": config.environment,
            "bucket": config.bucket.as_str(),
            "region": config.region,
            "location": config.location,
            "backend": config.backend,
            "target": target,
            "current": current,
            "releases": releases.iter().map(|r| r.version.as_str()).collect::<Vec<_>>(),
        }),
    );
    output.success("Status loaded");
    Ok(())
}
