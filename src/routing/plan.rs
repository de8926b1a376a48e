// ABOUTME: Renders the manual steps that repoint the path rewrite at a release.
// ABOUTME: The same plan drives the printed instructions and the automated --apply path.

use super::gcloud::RoutingTarget;
use crate::types::Prefix;

/// A planned change of the path rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepointPlan {
    pub target: RoutingTarget,
    /// Public host, used only for the verification step.
    pub host: Option<String>,
    /// Rewrite currently in effect, when it could be read.
    pub current: Option<String>,
    /// Rewrite the plan sets.
    pub rewrite: String,
}

impl RepointPlan {
    pub fn new(target: RoutingTarget, host: Option<String>, release: &Prefix) -> Self {
        Self {
            target,
            host,
            current: None,
            rewrite: release.rewrite_path(),
        }
    }

    pub fn with_current(mut self, current: Option<String>) -> Self {
        self.current = current;
        self
    }

    /// The rewrite already points at the release.
    pub fn is_noop(&self) -> bool {
        self.current.as_deref() == Some(self.rewrite.as_str())
    }

    /// Numbered, copy-pasteable steps.
    pub fn steps(&self) -> Vec<String> {
        let project = self
            .target
            .project_args()
            .into_iter()
            .map(|a| format!(" {a}"))
            .collect::<String>();
        let file = format!("{}.yaml", self.target.url_map);

        let mut steps = vec![
            format!(
                "Export the url map: gcloud compute url-maps export {} --destination={}{}",
                self.target.url_map, file, project
            ),
            format!(
                "In {}, under pathMatchers entry '{}', set defaultRouteAction.urlRewrite.pathPrefixRewrite to {}",
                file, self.target.path_matcher, self.rewrite
            ),
            format!(
                "Import the url map: gcloud compute url-maps import {} --source={}{}",
                self.target.url_map, file, project
            ),
        ];

        if let Some(host) = &self.host {
            steps.push(format!(
                "Verify: curl -sI https://{host}/ (changes can take a few minutes to propagate)"
            ));
        }
        steps
    }
}
