// ABOUTME: Deploy command implementation.
// ABOUTME: Resolves configuration, then either prints the upload plan or runs the full deploy.

use chrono::Utc;
use serde_json::json;
use std::env;

use sitepush::config::{Config, EnvValue, Layer};
use sitepush::deploy::{self, Deployment};
use sitepush::error::Result;
use sitepush::output::Output;
use sitepush::prompt;
use sitepush::release::GitCli;
use sitepush::storage::GsutilStorage;
use sitepush::upload::Pass;

use crate::cli::ConfigArgs;

/// Deploy-only flags.
#[derive(Debug, Default)]
pub struct DeployOptions {
    pub version: Option<String>,
    pub delete: bool,
    pub dry_run: bool,
    pub yes: bool,
}

pub async fn deploy(args: &ConfigArgs, options: DeployOptions, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let mut overrides = Layer {
        version: options.version.as_deref().map(EnvValue::from),
        ..Layer::default()
    };
    if options.delete {
        overrides.delete_extraneous = Some(true);
    }
    let config = args
        .resolver(&cwd)
        .overrides(args.layer().merge(overrides))
        .resolve()?;

    let storage = GsutilStorage::default();
    let scm = GitCli::new(&cwd);
    let prompter = prompt::for_session(options.yes);

    output.start_timer();
    output.progress(&format!(
        "Deploying {} to {}",
        config.build_dir.display(),
        config.bucket.url(config.prefix.as_str())
    ));

    if options.dry_run {
        return dry_run(config, &storage, &scm, prompter.as_ref(), output).await;
    }

    let progress = |message: &str| output.progress(message);
    let report = deploy::deploy(config, &storage, &scm, prompter.as_ref(), Utc::now(), &progress).await?;

    for warning in &report.warnings {
        output.warning(&warning.message);
    }
    for line in report.summary() {
        output.line(&line);
    }
    if !report.releases.is_empty() {
        output.line("Releases:");
        for release in &report.releases {
            let marker = if release.version == report.target.version {
                "  (new)"
            } else {
                ""
            };
            output.line(&format!("  {}{}", release.version, marker));
        }
    }
    if let Some(plan) = &report.repoint {
        output.line("To serve this release:");
        for (n, step) in plan.steps().iter().enumerate() {
            output.line(&format!("  {}. {}", n + 1, step));
        }
    }

    output.data("deployed", report.to_json());
    output.success(&format!(
        "Release {} uploaded to {}",
        report.target.version,
        report.url()
    ));
    Ok(())
}

/// Name the release and check for conflicts, then print what the upload would do.
async fn dry_run(
    config: Config,
    storage: &GsutilStorage,
    scm: &GitCli,
    prompter: &dyn prompt::Prompter,
    output: &mut Output,
) -> Result<()> {
    let deployment = Deployment::new(config)
        .locate_build_dir(prompter)?
        .name(scm, Utc::now())
        .await?
        .check_conflicts(storage)
        .await?;
    let plan = deployment.preview()?;
    let target = deployment.target();
    let url = deployment.config().bucket.url(target.prefix.as_str());

    output.line(&format!("Release {} → {}", target.version, url));
    let mut passes = serde_json::Map::new();
    for pass in Pass::ALL {
        let objects = plan.pass(pass);
        output.line(&format!("{pass} ({} object(s)):", objects.len()));
        for object in objects {
            let headers = object
                .metadata
                .headers()
                .into_iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join(", ");
            output.line(&format!(
                "  {} → {} [{}]",
                object.local.display(),
                object.key,
                headers
            ));
        }
        passes.insert(
            pass.to_string(),
            json!(objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>()),
        );
    }

    output.data(
        "dry run",
        json!({
            "version": target.version.as_str(),
            "url": url,
            "passes": passes,
        }),
    );
    output.success("Dry run finished, nothing was uploaded");
    Ok(())
}
