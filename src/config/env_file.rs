// ABOUTME: Reads SITEPUSH_* values from a dotenv-style file into a configuration layer.
// ABOUTME: The file is parsed without touching the process environment.

use std::path::Path;
use std::str::FromStr;

use super::error::ConfigError;
use super::layer::{ExtensionList, Layer};

pub const ENV_PROJECT: &str = "SITEPUSH_PROJECT";
pub const ENV_BUCKET: &str = "SITEPUSH_BUCKET";
pub const ENV_REGION: &str = "SITEPUSH_REGION";
pub const ENV_LOCATION: &str = "SITEPUSH_LOCATION";
pub const ENV_BUILD_DIR: &str = "SITEPUSH_BUILD_DIR";
pub const ENV_VERSION: &str = "SITEPUSH_VERSION";
pub const ENV_PREFIX: &str = "SITEPUSH_PREFIX";
pub const ENV_BACKEND: &str = "SITEPUSH_BACKEND";
pub const ENV_CACHE_LONG: &str = "SITEPUSH_CACHE_LONG";
pub const ENV_CACHE_SHORT: &str = "SITEPUSH_CACHE_SHORT";
pub const ENV_COMPRESS_EXTENSIONS: &str = "SITEPUSH_COMPRESS_EXTENSIONS";
pub const ENV_URL_MAP: &str = "SITEPUSH_URL_MAP";
pub const ENV_PATH_MATCHER: &str = "SITEPUSH_PATH_MATCHER";
pub const ENV_HOST: &str = "SITEPUSH_HOST";
pub const ENV_RETRY_ATTEMPTS: &str = "SITEPUSH_RETRY_ATTEMPTS";
pub const ENV_DELETE_EXTRANEOUS: &str = "SITEPUSH_DELETE_EXTRANEOUS";

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{value}': {e}"),
    })
}

/// Build a layer from `KEY=VALUE` pairs. Unknown keys are ignored.
pub fn layer_from_pairs<I>(pairs: I) -> Result<Layer, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut layer = Layer::default();
    for (key, value) in pairs {
        match key.as_str() {
            ENV_PROJECT => layer.project = Some(value.into()),
            ENV_BUCKET => layer.bucket = Some(value.into()),
            ENV_REGION => layer.region = Some(value.into()),
            ENV_LOCATION => layer.location = Some(value.into()),
            ENV_BUILD_DIR => layer.build_dir = Some(value.into()),
            ENV_VERSION => layer.version = Some(value.into()),
            ENV_PREFIX => layer.prefix = Some(value.into()),
            ENV_BACKEND => layer.backend = Some(value.into()),
            ENV_CACHE_LONG => layer.cache.long = Some(parse(ENV_CACHE_LONG, &value)?),
            ENV_CACHE_SHORT => layer.cache.short = Some(parse(ENV_CACHE_SHORT, &value)?),
            ENV_COMPRESS_EXTENSIONS => {
                layer.compress_extensions = Some(ExtensionList::Csv(value))
            }
            ENV_URL_MAP => layer.routing.url_map = Some(value.into()),
            ENV_PATH_MATCHER => layer.routing.path_matcher = Some(value.into()),
            ENV_HOST => layer.routing.host = Some(value.into()),
            ENV_RETRY_ATTEMPTS => layer.retry.attempts = Some(parse(ENV_RETRY_ATTEMPTS, &value)?),
            ENV_DELETE_EXTRANEOUS => {
                layer.delete_extraneous = Some(parse(ENV_DELETE_EXTRANEOUS, &value)?)
            }
            other => tracing::debug!(key = other, "ignoring unknown env-file key"),
        }
    }
    Ok(layer)
}

/// Read an env file into a layer.
pub fn load_env_file(path: &Path) -> Result<Layer, ConfigError> {
    let env_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let pairs = dotenv::from_path_iter(path)
        .map_err(env_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(env_error)?;

    tracing::debug!(path = %path.display(), entries = pairs.len(), "loaded env file");
    layer_from_pairs(pairs)
}
