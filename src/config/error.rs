// ABOUTME: Errors raised while loading, layering and validating configuration.
// ABOUTME: Missing required values name every place that could supply them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value was not supplied by any layer.
    #[error("missing required configuration value '{key}'")]
    Missing {
        key: &'static str,
        flag: &'static str,
        env_key: &'static str,
    },

    #[error("invalid value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },

    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn remediation(&self) -> Vec<String> {
        match self {
            ConfigError::Missing { key, flag, env_key } => vec![
                format!("pass {flag} <VALUE>"),
                format!("or set {env_key} in the env file given with --env-file"),
                format!("or set '{key}' in sitepush.yml (see: sitepush init)"),
            ],
            ConfigError::UnknownEnvironment(name) => vec![format!(
                "add an 'environments.{name}' section to sitepush.yml or drop --env"
            )],
            ConfigError::AlreadyExists(_) => vec!["pass --force to overwrite it".to_string()],
            _ => Vec::new(),
        }
    }
}
