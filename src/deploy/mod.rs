// ABOUTME: Deploy and rollback orchestration using the type state pattern.
// ABOUTME: Exports the Deployment states, the end-to-end deploy driver and the rollback flow.

mod deployment;
mod error;
mod report;
mod rollback;
mod state;
mod transitions;

pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use report::DeployReport;
pub use rollback::{RollbackReport, RollbackRequest, rollback};
pub use state::{Cleared, Compressed, Configured, Named, Target, Uploaded, Verified};

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::prompt::Prompter;
use crate::release::SourceControl;
use crate::storage::StorageOps;

/// Run every deploy stage in order, reporting each one through `progress`.
pub async fn deploy<S, C>(
    config: Config,
    storage: &S,
    scm: &C,
    prompter: &dyn Prompter,
    now: DateTime<Utc>,
    progress: &(dyn Fn(&str) + Sync),
) -> Result<DeployReport, DeployError>
where
    S: StorageOps + ?Sized,
    C: SourceControl + ?Sized,
{
    let deployment = Deployment::new(config).locate_build_dir(prompter)?;

    progress("  → Naming release...");
    let deployment = deployment.name(scm, now).await?;
    let target = deployment.target().clone();
    progress(&format!(
        "  → Release {} → {}",
        target.version,
        deployment.config().bucket.url(target.prefix.as_str())
    ));

    progress("  → Checking for an existing release...");
    let deployment = deployment.check_conflicts(storage).await?;

    progress("  → Compressing assets...");
    let deployment = deployment.compress()?;
    progress(&format!("  → Compressed {} file(s)", deployment.compressed()));

    progress("  → Uploading...");
    let deployment = deployment.upload(storage).await?;

    progress("  → Verifying...");
    let deployment = deployment.verify(storage).await?;

    deployment.finish(storage).await
}
