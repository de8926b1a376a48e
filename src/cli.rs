// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments and the configuration override flags.

use clap::{Args, Parser, Subcommand};
use sitepush::config::{CacheLayer, EnvValue, ExtensionList, Layer, Resolver, RetryLayer, RoutingLayer};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sitepush")]
#[command(about = "Versioned static site releases for cloud object storage")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results (for CI)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a sitepush.yml configuration file
    Init {
        /// Bucket to write into the template
        #[arg(long)]
        bucket: Option<String>,

        /// Overwrite an existing sitepush.yml
        #[arg(long)]
        force: bool,
    },

    /// Compress and upload the build directory as a new release
    Deploy {
        #[command(flatten)]
        config: ConfigArgs,

        /// Release version: auto, timestamp, or an explicit version
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,

        /// Root deploys: delete remote objects that are not part of the build
        #[arg(long)]
        delete: bool,

        /// Print the upload plan without compressing or uploading
        #[arg(long)]
        dry_run: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Point the load balancer back at an earlier release
    Rollback {
        #[command(flatten)]
        config: ConfigArgs,

        /// Release to roll back to (prompted for when omitted)
        #[arg(long, value_name = "VERSION")]
        to: Option<String>,

        /// Update the url map instead of printing instructions
        #[arg(long)]
        apply: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List the releases stored in the bucket
    Releases {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the resolved configuration, live release and stored releases
    Status {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Configuration sources and per-value overrides shared by the bucket commands.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Config file (default: sitepush.yml, sitepush.yaml or .sitepush/config.yml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Environment overlay from the config file
    #[arg(short = 'e', long = "env", value_name = "NAME")]
    pub environment: Option<String>,

    /// Read SITEPUSH_* values from this env file
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Releases prefix; an empty string deploys to the bucket root
    #[arg(long)]
    pub prefix: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<String>,

    /// Cache max-age in seconds for non-HTML objects
    #[arg(long, value_name = "SECONDS")]
    pub cache_long: Option<u64>,

    /// Cache max-age in seconds for HTML objects
    #[arg(long, value_name = "SECONDS")]
    pub cache_short: Option<u64>,

    /// Comma-separated extensions to pre-compress
    #[arg(long, value_name = "EXTS")]
    pub compress: Option<String>,

    #[arg(long)]
    pub url_map: Option<String>,

    #[arg(long)]
    pub path_matcher: Option<String>,

    /// Attempts per remote operation
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

fn literal(value: &Option<String>) -> Option<EnvValue> {
    value.as_deref().map(EnvValue::from)
}

impl ConfigArgs {
    /// Flag values as the highest-precedence configuration layer.
    pub fn layer(&self) -> Layer {
        Layer {
            project: literal(&self.project),
            bucket: literal(&self.bucket),
            region: literal(&self.region),
            build_dir: literal(&self.build_dir),
            prefix: literal(&self.prefix),
            cache: CacheLayer {
                long: self.cache_long,
                short: self.cache_short,
            },
            compress_extensions: self.compress.clone().map(ExtensionList::Csv),
            routing: RoutingLayer {
                url_map: literal(&self.url_map),
                path_matcher: literal(&self.path_matcher),
                host: None,
            },
            retry: RetryLayer {
                attempts: self.retries,
                ..RetryLayer::default()
            },
            ..Layer::default()
        }
    }

    pub fn resolver(&self, dir: &Path) -> Resolver {
        Resolver::new(dir)
            .config_file(self.config.clone())
            .environment(self.environment.clone())
            .env_file(self.env_file.clone())
            .overrides(self.layer())
    }
}
