// ABOUTME: One layer of configuration values: defaults, file, environment overlay, env-file or CLI.
// ABOUTME: Layers merge field by field, the later layer winning wherever it sets a value.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::env_value::EnvValue;
use crate::retry::Backoff;

/// Extensions given either as a list or as a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtensionList {
    List(Vec<String>),
    Csv(String),
}

impl ExtensionList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ExtensionList::List(list) => list,
            ExtensionList::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CacheLayer {
    pub long: Option<u64>,
    pub short: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoutingLayer {
    pub url_map: Option<EnvValue>,
    pub path_matcher: Option<EnvValue>,
    pub host: Option<EnvValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetryLayer {
    pub attempts: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub delay: Option<Duration>,
    pub backoff: Option<Backoff>,
}

/// Every configurable value, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Layer {
    pub project: Option<EnvValue>,
    pub bucket: Option<EnvValue>,
    pub region: Option<EnvValue>,
    pub location: Option<EnvValue>,
    pub build_dir: Option<EnvValue>,
    pub version: Option<EnvValue>,
    pub prefix: Option<EnvValue>,
    pub backend: Option<EnvValue>,
    #[serde(default)]
    pub cache: CacheLayer,
    pub compress_extensions: Option<ExtensionList>,
    #[serde(default)]
    pub content_types: HashMap<String, String>,
    #[serde(default)]
    pub routing: RoutingLayer,
    #[serde(default)]
    pub retry: RetryLayer,
    pub delete_extraneous: Option<bool>,
    pub log_file: Option<EnvValue>,
}

fn pick<T>(base: Option<T>, over: Option<T>) -> Option<T> {
    over.or(base)
}

impl Layer {
    /// Merge `over` on top of `self`.
    ///
    /// Scalars from `over` replace those in `self`; `content_types` entries
    /// are merged key by key.
    pub fn merge(self, over: Layer) -> Layer {
        let mut content_types = self.content_types;
        content_types.extend(over.content_types);

        Layer {
            project: pick(self.project, over.project),
            bucket: pick(self.bucket, over.bucket),
            region: pick(self.region, over.region),
            location: pick(self.location, over.location),
            build_dir: pick(self.build_dir, over.build_dir),
            version: pick(self.version, over.version),
            prefix: pick(self.prefix, over.prefix),
            backend: pick(self.backend, over.backend),
            cache: CacheLayer {
                long: pick(self.cache.long, over.cache.long),
                short: pick(self.cache.short, over.cache.short),
            },
            compress_extensions: pick(self.compress_extensions, over.compress_extensions),
            content_types,
            routing: RoutingLayer {
                url_map: pick(self.routing.url_map, over.routing.url_map),
                path_matcher: pick(self.routing.path_matcher, over.routing.path_matcher),
                host: pick(self.routing.host, over.routing.host),
            },
            retry: RetryLayer {
                attempts: pick(self.retry.attempts, over.retry.attempts),
                delay: pick(self.retry.delay, over.retry.delay),
                backoff: pick(self.retry.backoff, over.retry.backoff),
            },
            delete_extraneous: pick(self.delete_extraneous, over.delete_extraneous),
            log_file: pick(self.log_file, over.log_file),
        }
    }
}
