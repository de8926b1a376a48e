// ABOUTME: Errors from reading or changing the load balancer path rewrite.
// ABOUTME: Covers gcloud failures, malformed url-map documents and missing path matchers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("{operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path matcher '{matcher}' not found in url map '{url_map}'")]
    MatcherNotFound { url_map: String, matcher: String },

    #[error("malformed url map document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("routing is not configured (set routing.url_map and routing.path_matcher)")]
    NotConfigured,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
