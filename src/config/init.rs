// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented sitepush.yml template.

use std::path::{Path, PathBuf};

use super::CONFIG_FILENAME;
use super::error::ConfigError;
use crate::types::BucketName;

/// Write `sitepush.yml` into `dir`, returning its path.
pub fn init_config(dir: &Path, bucket: Option<&str>, force: bool) -> Result<PathBuf, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(ConfigError::AlreadyExists(config_path));
    }

    let bucket = match bucket {
        Some(b) => BucketName::new(b)
            .map_err(|e| ConfigError::Invalid {
                key: "bucket",
                message: e.to_string(),
            })?
            .to_string(),
        None => "my-site-bucket".to_string(),
    };

    std::fs::write(&config_path, template_yaml(&bucket))?;
    Ok(config_path)
}

pub fn template_yaml(bucket: &str) -> String {
    format!(
        r#"# Bucket that stores the releases (required)
bucket: {bucket}
# project: my-gcp-project
# region: europe-west1
# location: EU

# Local build output
build_dir: dist

# auto (<tag>-<revision>), timestamp (<YYYYMMDD-HHMMSS>-<revision>) or an explicit version
version: auto

# Releases live under <prefix><version>/. An empty prefix deploys to the bucket root.
prefix: releases/

cache:
  long: 31536000
  short: 300

compress_extensions: js,css,html,htm,json,svg,txt,xml

# content_types:
#   wasm: application/wasm

# Load balancer path rewrite used for repointing and rollback
# routing:
#   url_map: my-site-lb
#   path_matcher: site
#   host: www.example.com

retry:
  attempts: 3
  delay: 5s

# Root deploys only: delete remote objects that are not part of the build
delete_extraneous: false

# environments:
#   production:
#     bucket: my-site-bucket-prod
"#
    )
}
