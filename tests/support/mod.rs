// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup, build tree fixtures and a scripted source control double.

use async_trait::async_trait;
use sitepush::config::{Config, Resolver};
use sitepush::release::{ReleaseError, SourceControl};
use sitepush::retry::RetryPolicy;
use std::fs;
use std::path::Path;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("sitepush=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Write `files` (relative path, content) below `dir`.
#[allow(dead_code)]
pub fn write_tree(dir: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Resolve `yaml` as the project's sitepush.yml, with retries that never sleep.
#[allow(dead_code)]
pub fn config_from_yaml(dir: &Path, yaml: &str, environment: Option<&str>) -> Config {
    fs::write(dir.join("sitepush.yml"), yaml).unwrap();
    let mut config = Resolver::new(dir)
        .environment(environment.map(str::to_string))
        .resolve()
        .unwrap();
    config.retry = RetryPolicy::immediate(2);
    config.log_file = None;
    config
}

/// Source control answering from fixed values.
#[allow(dead_code)]
pub struct FakeScm {
    pub revision: String,
    pub tag: Option<String>,
}

#[allow(dead_code)]
impl FakeScm {
    pub fn tagged(tag: &str, revision: &str) -> Self {
        Self {
            revision: revision.to_string(),
            tag: Some(tag.to_string()),
        }
    }

    pub fn untagged(revision: &str) -> Self {
        Self {
            revision: revision.to_string(),
            tag: None,
        }
    }
}

#[async_trait]
impl SourceControl for FakeScm {
    async fn short_revision(&self) -> Result<String, ReleaseError> {
        Ok(self.revision.clone())
    }

    async fn nearest_tag(&self) -> Result<Option<String>, ReleaseError> {
        Ok(self.tag.clone())
    }
}
