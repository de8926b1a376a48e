// ABOUTME: Load balancer routing: reading and repointing the path rewrite that selects a release.
// ABOUTME: Exports the RoutingOps trait, the gcloud client, a test double and repoint instructions.

mod error;
mod gcloud;
mod memory;
mod plan;
mod url_map;

pub use error::RoutingError;
pub use gcloud::{GcloudRouting, RoutingTarget};
pub use memory::MemoryRouting;
pub use plan::RepointPlan;
pub use url_map::{path_rewrite, set_path_rewrite};

use async_trait::async_trait;

/// Access to the routing reference that maps the public host to one release.
#[async_trait]
pub trait RoutingOps: Send + Sync {
    /// The path prefix rewrite currently in effect, if any.
    async fn current_rewrite(&self) -> Result<Option<String>, RoutingError>;

    /// Point the rewrite at `path` (e.g. `/releases/v1.0.0/`).
    async fn set_rewrite(&self, path: &str) -> Result<(), RoutingError>;
}
