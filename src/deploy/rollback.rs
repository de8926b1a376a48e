// ABOUTME: Rollback by repointing the load balancer path rewrite at an earlier release.
// ABOUTME: Releases are never modified; only the routing reference changes, and only with --apply.

use nonempty::NonEmpty;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::prompt::Prompter;
use crate::release::{ReleaseEntry, ReleaseError, list_releases};
use crate::routing::{RepointPlan, RoutingOps, RoutingTarget};
use crate::storage::StorageOps;
use crate::types::ReleaseVersion;

use super::error::DeployError;

/// What the operator asked for.
#[derive(Debug, Clone, Default)]
pub struct RollbackRequest {
    /// Release to roll back to; chosen interactively when absent.
    pub version: Option<ReleaseVersion>,
    /// Change the url-map instead of printing instructions.
    pub apply: bool,
}

#[derive(Debug, Clone)]
pub struct RollbackReport {
    pub release: ReleaseEntry,
    pub plan: RepointPlan,
    /// The url-map was changed.
    pub applied: bool,
}

impl RollbackReport {
    pub fn already_current(&self) -> bool {
        self.plan.is_noop()
    }
}

/// Placeholder target used for printed instructions when routing is not configured.
fn placeholder_target(config: &Config) -> RoutingTarget {
    RoutingTarget {
        project: config.project.clone(),
        url_map: "<URL_MAP>".to_string(),
        path_matcher: "<PATH_MATCHER>".to_string(),
    }
}

fn label(entry: &ReleaseEntry, current: Option<&str>) -> String {
    if current == Some(entry.prefix.rewrite_path().as_str()) {
        format!("{} (current)", entry.version)
    } else {
        entry.version.to_string()
    }
}

/// Choose the release: the requested one, or ask the operator.
fn select(
    releases: &NonEmpty<ReleaseEntry>,
    requested: Option<&ReleaseVersion>,
    current: Option<&str>,
    prompter: &dyn Prompter,
    not_found: impl FnOnce(&ReleaseVersion) -> ReleaseError,
) -> Result<ReleaseEntry, DeployError> {
    if let Some(version) = requested {
        return releases
            .iter()
            .find(|entry| &entry.version == version)
            .cloned()
            .ok_or_else(|| not_found(version).into());
    }

    if !prompter.is_interactive() {
        return Err(DeployError::NoReleaseSelected);
    }

    let items: Vec<String> = releases.iter().map(|e| label(e, current)).collect();
    let index = prompter.select("Roll back to which release?", &items, items.len() - 1)?;
    releases
        .get(index)
        .cloned()
        .ok_or(DeployError::NoReleaseSelected)
}

/// Run the rollback flow.
///
/// Listing → selecting → verifying the release exists → confirming for
/// production → emitting (or, with `apply`, executing) the repoint.
pub async fn rollback<S: StorageOps + ?Sized>(
    config: &Config,
    storage: &S,
    routing: Option<&dyn RoutingOps>,
    prompter: &dyn Prompter,
    request: &RollbackRequest,
    diag: &mut Diagnostics,
) -> Result<RollbackReport, DeployError> {
    let bucket = &config.bucket;
    let releases_url = bucket.url(config.prefix.as_str());

    if config.prefix.is_root() {
        return Err(ReleaseError::NoReleases(releases_url).into());
    }

    let releases = list_releases(storage, bucket, &config.prefix, &config.retry).await?;
    let releases = NonEmpty::from_vec(releases).ok_or_else(|| ReleaseError::NoReleases(releases_url))?;

    let current = match routing {
        Some(routing) => match routing.current_rewrite().await {
            Ok(current) => current,
            Err(e) => {
                diag.warn(Warning::routing_unavailable(format!(
                    "could not read the current path rewrite: {e}"
                )));
                None
            }
        },
        None => None,
    };

    let release = select(
        &releases,
        request.version.as_ref(),
        current.as_deref(),
        prompter,
        |version| ReleaseError::NotFound(bucket.url(config.prefix.join_release(version).as_str())),
    )?;

    let step = format!("list {}", bucket.url(release.prefix.as_str()));
    let objects = config
        .retry
        .run(&step, |_| storage.list(bucket, &release.prefix))
        .await
        .map_err(|exhausted| ReleaseError::Storage {
            step: step.clone(),
            attempts: exhausted.attempts,
            source: exhausted.error,
        })?;
    if objects.is_empty() {
        return Err(ReleaseError::NotFound(bucket.url(release.prefix.as_str())).into());
    }

    let index = release.prefix.key("index.html");
    if !objects.iter().any(|o| o.key == index) {
        diag.warn(Warning::missing_index(format!(
            "release {} has no index.html",
            release.version
        )));
    }

    let plan = match &config.routing {
        Some(r) => RepointPlan::new(r.target.clone(), r.host.clone(), &release.prefix),
        None => RepointPlan::new(placeholder_target(config), None, &release.prefix),
    }
    .with_current(current);

    let apply_via = match (request.apply, routing, &config.routing) {
        (false, _, _) => None,
        (true, Some(routing), Some(_)) => Some(routing),
        (true, _, _) => return Err(DeployError::RoutingNotConfigured),
    };

    if config.is_production() && !plan.is_noop() {
        let confirmed = prompter.confirm(
            &format!(
                "Repoint PRODUCTION ({}) to release {}?",
                bucket, release.version
            ),
            false,
        )?;
        if !confirmed {
            return Err(DeployError::Cancelled);
        }
    }

    let mut applied = false;
    if let Some(routing) = apply_via
        && !plan.is_noop()
    {
        routing.set_rewrite(&plan.rewrite).await?;
        applied = true;
        tracing::info!(version = %release.version, rewrite = %plan.rewrite, "path rewrite repointed");
    }

    Ok(RollbackReport {
        release,
        plan,
        applied,
    })
}
