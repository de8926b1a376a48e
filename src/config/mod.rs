// ABOUTME: Configuration types and resolution for sitepush.yml.
// ABOUTME: Layers defaults, the config file, environment overlays, env-file values and CLI flags.

mod env_file;
mod env_value;
mod error;
mod init;
mod layer;

pub use env_file::{
    ENV_BUCKET, ENV_BUILD_DIR, ENV_PREFIX, ENV_VERSION, layer_from_pairs, load_env_file,
};
pub use env_value::EnvValue;
pub use error::ConfigError;
pub use init::{init_config, template_yaml};
pub use layer::{CacheLayer, ExtensionList, Layer, RetryLayer, RoutingLayer};

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::compress::DEFAULT_EXTENSIONS;
use crate::release::VersionSpec;
use crate::retry::RetryPolicy;
use crate::routing::RoutingTarget;
use crate::types::{BucketName, Prefix, ReleaseVersion};
use crate::upload::{CachePolicy, MediaTypes};
use env_value::resolve_opt;

pub const CONFIG_FILENAME: &str = "sitepush.yml";
pub const CONFIG_FILENAME_ALT: &str = "sitepush.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".sitepush/config.yml";

pub const DEFAULT_BUILD_DIR: &str = "dist";
pub const DEFAULT_PREFIX: &str = "releases/";
pub const DEFAULT_LOG_FILE: &str = ".sitepush/sync.log";

/// Name of the environment that requires confirmation before repointing.
pub const PRODUCTION: &str = "production";

/// Parsed config file: a base layer plus named environment overlays.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub base: Layer,

    #[serde(default)]
    pub environments: HashMap<String, Layer>,
}

impl ConfigFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::from)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the config file in `dir`. A missing file is not an error.
    pub fn discover(dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in candidates {
            if path.exists() {
                let file = Self::load(&path)?;
                return Ok(Some((path, file)));
            }
        }

        Ok(None)
    }

    /// The base layer with the named environment's overlay applied.
    pub fn for_environment(&self, name: &str) -> Result<Layer, ConfigError> {
        let overlay = self
            .environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))?;
        Ok(self.base.clone().merge(overlay.clone()))
    }
}

/// Where the release listing lives and, for routing, which url-map to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    pub target: RoutingTarget,
    pub host: Option<String>,
}

/// Fully resolved, validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project: Option<String>,
    pub bucket: BucketName,
    pub region: Option<String>,
    pub location: Option<String>,
    pub build_dir: PathBuf,
    pub version: VersionSpec,
    /// Releases prefix. Root means a single release mirrored at the bucket root.
    pub prefix: Prefix,
    pub backend: Option<String>,
    pub cache: CachePolicy,
    pub compress_extensions: Vec<String>,
    pub media_types: MediaTypes,
    pub routing: Option<RoutingConfig>,
    pub retry: RetryPolicy,
    pub delete_extraneous: bool,
    /// Sync transcript destination; `None` disables the log.
    pub log_file: Option<PathBuf>,
    /// Selected `environments.<name>` overlay.
    pub environment: Option<String>,
}

impl Config {
    /// Turn a merged layer into a `Config`, relative paths anchored at `dir`.
    pub fn from_layer(layer: Layer, dir: &Path, environment: Option<String>) -> Result<Self, ConfigError> {
        let bucket = resolve_opt(layer.bucket.as_ref())?.ok_or(ConfigError::Missing {
            key: "bucket",
            flag: "--bucket",
            env_key: env_file::ENV_BUCKET,
        })?;
        let bucket = BucketName::new(&bucket).map_err(|e| ConfigError::Invalid {
            key: "bucket",
            message: e.to_string(),
        })?;

        let prefix = match layer.prefix.as_ref().map(EnvValue::resolve).transpose()? {
            Some(value) => Prefix::new(&value).map_err(|e| ConfigError::Invalid {
                key: "prefix",
                message: e.to_string(),
            })?,
            None => Prefix::new(DEFAULT_PREFIX).map_err(|e| ConfigError::Invalid {
                key: "prefix",
                message: e.to_string(),
            })?,
        };

        let build_dir = resolve_opt(layer.build_dir.as_ref())?
            .unwrap_or_else(|| DEFAULT_BUILD_DIR.to_string());

        let version = resolve_opt(layer.version.as_ref())?
            .map(|v| VersionSpec::parse(&v))
            .unwrap_or_default();
        if let VersionSpec::Explicit(value) = &version {
            ReleaseVersion::new(value).map_err(|e| ConfigError::Invalid {
                key: "version",
                message: e.to_string(),
            })?;
        }

        let defaults = CachePolicy::default();
        let cache = CachePolicy {
            long: layer.cache.long.unwrap_or(defaults.long),
            short: layer.cache.short.unwrap_or(defaults.short),
        };

        let compress_extensions = layer
            .compress_extensions
            .map(ExtensionList::into_vec)
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());

        let project = resolve_opt(layer.project.as_ref())?;
        let routing = match (
            resolve_opt(layer.routing.url_map.as_ref())?,
            resolve_opt(layer.routing.path_matcher.as_ref())?,
        ) {
            (Some(url_map), Some(path_matcher)) => Some(RoutingConfig {
                target: RoutingTarget {
                    project: project.clone(),
                    url_map,
                    path_matcher,
                },
                host: resolve_opt(layer.routing.host.as_ref())?,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    key: "routing.path_matcher",
                    message: "required when routing.url_map is set".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    key: "routing.url_map",
                    message: "required when routing.path_matcher is set".to_string(),
                });
            }
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            attempts: layer.retry.attempts.unwrap_or(retry_defaults.attempts),
            delay: layer.retry.delay.unwrap_or(retry_defaults.delay),
            backoff: layer.retry.backoff.unwrap_or(retry_defaults.backoff),
            max_delay: retry_defaults.max_delay,
        };
        if retry.attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.attempts",
                message: "must be at least 1".to_string(),
            });
        }

        // An explicitly empty log_file disables the sync log.
        let log_file = match layer.log_file.as_ref().map(EnvValue::resolve).transpose()? {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(dir.join(path.trim())),
            None => Some(dir.join(DEFAULT_LOG_FILE)),
        };

        Ok(Config {
            project,
            bucket,
            region: resolve_opt(layer.region.as_ref())?,
            location: resolve_opt(layer.location.as_ref())?,
            build_dir: dir.join(build_dir),
            version,
            prefix,
            backend: resolve_opt(layer.backend.as_ref())?,
            cache,
            compress_extensions,
            media_types: MediaTypes::with_overrides(&layer.content_types),
            routing,
            retry,
            delete_extraneous: layer.delete_extraneous.unwrap_or(false),
            log_file,
            environment,
        })
    }

    /// Prefix a release with `version` is stored under.
    pub fn release_prefix(&self, version: &ReleaseVersion) -> Prefix {
        if self.prefix.is_root() {
            Prefix::root()
        } else {
            self.prefix.join_release(version)
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.as_deref() == Some(PRODUCTION)
    }
}

/// Collects the configuration sources for one command and resolves them.
#[derive(Debug, Clone)]
pub struct Resolver {
    dir: PathBuf,
    config_path: Option<PathBuf>,
    environment: Option<String>,
    env_file: Option<PathBuf>,
    overrides: Layer,
}

impl Resolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config_path: None,
            environment: None,
            env_file: None,
            overrides: Layer::default(),
        }
    }

    /// Use this config file instead of discovering one.
    pub fn config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn environment(mut self, name: Option<String>) -> Self {
        self.environment = name;
        self
    }

    pub fn env_file(mut self, path: Option<PathBuf>) -> Self {
        self.env_file = path;
        self
    }

    /// Values from command-line flags; they win over every other source.
    pub fn overrides(mut self, layer: Layer) -> Self {
        self.overrides = layer;
        self
    }

    pub fn resolve(self) -> Result<Config, ConfigError> {
        let file = match &self.config_path {
            Some(path) => Some(ConfigFile::load(&self.dir.join(path))?),
            None => ConfigFile::discover(&self.dir)?.map(|(path, file)| {
                tracing::debug!(path = %path.display(), "using config file");
                file
            }),
        };

        let mut layer = match (&file, &self.environment) {
            (Some(file), Some(name)) => file.for_environment(name)?,
            (Some(file), None) => file.base.clone(),
            (None, Some(name)) => return Err(ConfigError::UnknownEnvironment(name.clone())),
            (None, None) => Layer::default(),
        };

        if let Some(path) = &self.env_file {
            layer = layer.merge(load_env_file(&self.dir.join(path))?);
        }

        layer = layer.merge(self.overrides);
        Config::from_layer(layer, &self.dir, self.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
project: acme-web
bucket: acme-site
build_dir: public
prefix: releases/
cache:
  short: 60
compress_extensions: js,css,html
routing:
  url_map: acme-lb
  path_matcher: site
environments:
  production:
    bucket: acme-site-prod
  staging:
    prefix: ""
"#;

    #[test]
    fn minimal_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::from_yaml("bucket: my-bucket\n").unwrap();
        let config = Config::from_layer(file.base, dir.path(), None).unwrap();

        assert_eq!(config.bucket.as_str(), "my-bucket");
        assert_eq!(config.build_dir, dir.path().join("dist"));
        assert_eq!(config.prefix.as_str(), "releases/");
        assert_eq!(config.version, VersionSpec::Auto);
        assert_eq!(config.cache, CachePolicy::default());
        assert_eq!(config.compress_extensions.len(), DEFAULT_EXTENSIONS.len());
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(!config.delete_extraneous);
        assert!(config.routing.is_none());
        assert_eq!(config.log_file, Some(dir.path().join(DEFAULT_LOG_FILE)));
    }

    #[test]
    fn missing_bucket_names_every_source() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_layer(Layer::default(), dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "bucket", .. }));

        let hints = err.remediation().join("\n");
        assert!(hints.contains("--bucket"));
        assert!(hints.contains("SITEPUSH_BUCKET"));
    }

    #[test]
    fn environment_overlay_applies() {
        let file = ConfigFile::from_yaml(SAMPLE).unwrap();
        let dir = TempDir::new().unwrap();

        let prod = Config::from_layer(
            file.for_environment("production").unwrap(),
            dir.path(),
            Some("production".into()),
        )
        .unwrap();
        assert_eq!(prod.bucket.as_str(), "acme-site-prod");
        assert!(prod.is_production());
        assert_eq!(prod.cache.short, 60);

        let staging =
            Config::from_layer(file.for_environment("staging").unwrap(), dir.path(), None).unwrap();
        assert!(staging.prefix.is_root());
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let file = ConfigFile::from_yaml(SAMPLE).unwrap();
        assert!(matches!(
            file.for_environment("qa"),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn routing_requires_both_fields() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::from_yaml("bucket: b-1\nrouting:\n  url_map: lb\n").unwrap();
        let err = Config::from_layer(file.base, dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "routing.path_matcher", .. }));
    }

    #[test]
    fn routing_inherits_project() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::from_yaml(SAMPLE).unwrap();
        let config = Config::from_layer(file.base, dir.path(), None).unwrap();
        let routing = config.routing.unwrap();
        assert_eq!(routing.target.project.as_deref(), Some("acme-web"));
        assert_eq!(routing.target.url_map, "acme-lb");
    }

    #[test]
    fn release_prefix_for_root_and_nested_layouts() {
        let dir = TempDir::new().unwrap();
        let version = ReleaseVersion::new("v1.0.0").unwrap();

        let file = ConfigFile::from_yaml("bucket: b-1\n").unwrap();
        let nested = Config::from_layer(file.base, dir.path(), None).unwrap();
        assert_eq!(nested.release_prefix(&version).as_str(), "releases/v1.0.0/");

        let file = ConfigFile::from_yaml("bucket: b-1\nprefix: \"\"\n").unwrap();
        let root = Config::from_layer(file.base, dir.path(), None).unwrap();
        assert!(root.release_prefix(&version).is_root());
    }

    #[test]
    fn resolver_precedence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), SAMPLE).unwrap();
        fs::write(
            dir.path().join("deploy.env"),
            "SITEPUSH_BUCKET=from-env-file\nSITEPUSH_CACHE_LONG=86400\n",
        )
        .unwrap();

        let overrides = Layer {
            cache: CacheLayer {
                long: Some(1000),
                short: None,
            },
            ..Layer::default()
        };

        let config = Resolver::new(dir.path())
            .environment(Some("production".into()))
            .env_file(Some("deploy.env".into()))
            .overrides(overrides)
            .resolve()
            .unwrap();

        assert_eq!(config.bucket.as_str(), "from-env-file");
        assert_eq!(config.cache.long, 1000);
        assert_eq!(config.cache.short, 60);
        assert_eq!(config.build_dir, dir.path().join("public"));
    }

    #[test]
    fn resolver_without_config_file_uses_overrides() {
        let dir = TempDir::new().unwrap();
        let config = Resolver::new(dir.path())
            .overrides(Layer {
                bucket: Some("flag-bucket".into()),
                ..Layer::default()
            })
            .resolve()
            .unwrap();
        assert_eq!(config.bucket.as_str(), "flag-bucket");
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = Resolver::new(dir.path())
            .config_file(Some("missing.yml".into()))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn env_value_reference_in_file() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::from_yaml("bucket: { env: SITEPUSH_TEST_CFG_BUCKET }\n").unwrap();
        temp_env::with_var("SITEPUSH_TEST_CFG_BUCKET", Some("env-bucket"), || {
            let config = Config::from_layer(file.base.clone(), dir.path(), None).unwrap();
            assert_eq!(config.bucket.as_str(), "env-bucket");
        });
    }
}
