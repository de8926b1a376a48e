// ABOUTME: Configuration values that are either literals or environment variable references.
// ABOUTME: References are resolved once, when the layered configuration is turned into a Config.

use serde::Deserialize;

use super::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String, ConfigError> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar(var.clone())),
            },
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Literal(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        EnvValue::Literal(value)
    }
}

/// Resolve an optional value, treating an empty result as absent.
pub(crate) fn resolve_opt(value: Option<&EnvValue>) -> Result<Option<String>, ConfigError> {
    Ok(value
        .map(EnvValue::resolve)
        .transpose()?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
