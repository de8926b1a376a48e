// ABOUTME: Command module aggregator for the sitepush CLI.
// ABOUTME: Re-exports the init, deploy, rollback, releases and status handlers.

mod deploy;
mod init;
mod releases;
mod rollback;
mod status;

pub use deploy::{DeployOptions, deploy};
pub use init::init;
pub use releases::releases;
pub use rollback::rollback;
pub use status::status;

use sitepush::config::Config;
use sitepush::diagnostics::{Diagnostics, Warning};
use sitepush::output::Output;
use sitepush::routing::{GcloudRouting, RoutingOps};

/// gcloud-backed routing client, when routing is configured.
fn routing_client(config: &Config) -> Option<GcloudRouting> {
    config
        .routing
        .as_ref()
        .map(|routing| GcloudRouting::new(routing.target.clone()))
}

/// Read the live path rewrite, recording a warning instead of failing.
async fn current_rewrite(routing: Option<&GcloudRouting>, diag: &mut Diagnostics) -> Option<String> {
    let routing = routing?;
    match routing.current_rewrite().await {
        Ok(current) => current,
        Err(e) => {
            diag.warn(Warning::routing_unavailable(format!(
                "could not read the current path rewrite: {e}"
            )));
            None
        }
    }
}

/// Emit collected warnings.
fn emit_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
