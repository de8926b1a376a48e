// ABOUTME: Integration tests for configuration discovery and resolution.
// ABOUTME: Tests file lookup order, env files, environment overlays and derived values.

use sitepush::config::*;
use sitepush::release::VersionSpec;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

mod discovery {
    use super::*;

    #[test]
    fn finds_yaml_extension_variant() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sitepush.yaml"), "bucket: alt-bucket\n").unwrap();

        let config = Resolver::new(dir.path()).resolve().unwrap();
        assert_eq!(config.bucket.as_str(), "alt-bucket");
    }

    #[test]
    fn finds_config_in_dot_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".sitepush")).unwrap();
        fs::write(dir.path().join(".sitepush/config.yml"), "bucket: hidden-bucket\n").unwrap();

        let config = Resolver::new(dir.path()).resolve().unwrap();
        assert_eq!(config.bucket.as_str(), "hidden-bucket");
    }

    #[test]
    fn primary_name_wins_over_variants() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sitepush.yml"), "bucket: primary\n").unwrap();
        fs::write(dir.path().join("sitepush.yaml"), "bucket: secondary\n").unwrap();

        let config = Resolver::new(dir.path()).resolve().unwrap();
        assert_eq!(config.bucket.as_str(), "primary");
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sitepush.yml"), "bucket: [unclosed\n").unwrap();

        let err = Resolver::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("sitepush.yml"));
    }
}

mod env_files {
    use super::*;

    #[test]
    fn env_file_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepush.yml"),
            "bucket: from-file\nprefix: releases/\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("deploy.env"),
            "SITEPUSH_BUCKET=from-env\nSITEPUSH_CACHE_SHORT=30\nSITEPUSH_PREFIX=sites/main/\n",
        )
        .unwrap();

        let config = Resolver::new(dir.path())
            .env_file(Some("deploy.env".into()))
            .resolve()
            .unwrap();

        assert_eq!(config.bucket.as_str(), "from-env");
        assert_eq!(config.cache.short, 30);
        assert_eq!(config.prefix.as_str(), "sites/main/");
    }

    #[test]
    fn env_file_rejects_non_numeric_cache() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("deploy.env"),
            "SITEPUSH_BUCKET=acme-site\nSITEPUSH_CACHE_LONG=forever\n",
        )
        .unwrap();

        let err = Resolver::new(dir.path())
            .env_file(Some("deploy.env".into()))
            .resolve()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: ENV_CACHE_LONG,
                ..
            }
        ));
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Resolver::new(dir.path())
            .env_file(Some("absent.env".into()))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }
}

mod resolution {
    use super::*;

    #[test]
    fn full_file_resolves_every_section() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepush.yml"),
            r#"
bucket: acme-site
project: acme-web
version: timestamp
compress_extensions: [js, wasm]
content_types:
  wasm: application/wasm
retry:
  attempts: 4
  delay: 2s
  backoff: exponential
log_file: ""
environments:
  production:
    routing:
      url_map: acme-lb
      path_matcher: site
      host: www.acme.test
"#,
        )
        .unwrap();

        let config = Resolver::new(dir.path())
            .environment(Some(PRODUCTION.to_string()))
            .resolve()
            .unwrap();

        assert_eq!(config.version, VersionSpec::Timestamp);
        assert_eq!(config.compress_extensions, ["js", "wasm"]);
        assert_eq!(config.media_types.for_extension("wasm"), "application/wasm");
        assert_eq!(config.retry.attempts, 4);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
        assert!(config.log_file.is_none());
        assert!(config.is_production());

        let routing = config.routing.unwrap();
        assert_eq!(routing.target.url_map, "acme-lb");
        assert_eq!(routing.target.project.as_deref(), Some("acme-web"));
        assert_eq!(routing.host.as_deref(), Some("www.acme.test"));
    }

    #[test]
    fn invalid_explicit_version_is_rejected_early() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepush.yml"),
            "bucket: acme-site\nversion: \"v1/evil\"\n",
        )
        .unwrap();

        let err = Resolver::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "version", .. }));
    }

    #[test]
    fn zero_retry_attempts_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepush.yml"),
            "bucket: acme-site\nretry:\n  attempts: 0\n",
        )
        .unwrap();

        let err = Resolver::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "retry.attempts",
                ..
            }
        ));
    }

    #[test]
    fn init_template_resolves() {
        let dir = TempDir::new().unwrap();
        init_config(dir.path(), Some("fresh-site"), false).unwrap();

        let config = Resolver::new(dir.path()).resolve().unwrap();
        assert_eq!(config.bucket.as_str(), "fresh-site");
        assert_eq!(config.prefix.as_str(), DEFAULT_PREFIX);
        assert!(config.routing.is_none());
    }
}
