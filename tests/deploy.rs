// ABOUTME: Integration tests for the end-to-end deploy workflow.
// ABOUTME: Runs deploys against in-memory storage and checks objects, metadata and cleanup.

mod support;

use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use sitepush::config::Config;
use sitepush::deploy::{DeployError, DeployErrorKind, DeployReport, deploy};
use sitepush::diagnostics::WarningKind;
use sitepush::prompt::NonInteractive;
use sitepush::release::ReleaseError;
use sitepush::storage::{ContentEncoding, MemoryStorage, Operation};
use sitepush::types::BucketName;
use sitepush::upload::UploadError;
use std::io::Read;
use std::path::Path;
use support::{FakeScm, config_from_yaml, init_tracing, write_tree};
use tempfile::TempDir;

const VERSIONED: &str = r#"
bucket: acme-site
build_dir: dist
prefix: releases/
version: v1.0.0
compress_extensions: js,html
"#;

fn site(dir: &Path) {
    write_tree(
        dir,
        &[
            ("dist/index.html", "<html><body>hello</body></html>"),
            ("dist/app.js", "console.log('hello');"),
        ],
    );
}

async fn run(config: Config, storage: &MemoryStorage, scm: &FakeScm) -> Result<DeployReport, DeployError> {
    let prompter = NonInteractive { assume_yes: true };
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    deploy(config, storage, scm, &prompter, now, &|_: &str| {}).await
}

fn bucket() -> BucketName {
    BucketName::new("acme-site").unwrap()
}

fn gunzip(body: &[u8]) -> String {
    let mut decoded = String::new();
    GzDecoder::new(body).read_to_string(&mut decoded).unwrap();
    decoded
}

#[tokio::test]
async fn versioned_deploy_writes_compressed_objects_with_metadata() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();

    let report = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    assert_eq!(
        storage.keys(&bucket()),
        ["releases/v1.0.0/app.js", "releases/v1.0.0/index.html"]
    );

    let js = storage.object(&bucket(), "releases/v1.0.0/app.js").unwrap();
    assert_eq!(js.metadata.content_type.as_deref(), Some("application/javascript"));
    assert_eq!(js.metadata.content_encoding, Some(ContentEncoding::Gzip));
    assert_eq!(
        js.metadata.cache_control.unwrap().to_string(),
        "public, max-age=31536000"
    );
    assert_eq!(gunzip(&js.body), "console.log('hello');");

    let html = storage.object(&bucket(), "releases/v1.0.0/index.html").unwrap();
    assert_eq!(html.metadata.content_type.as_deref(), Some("text/html"));
    assert_eq!(html.metadata.content_encoding, Some(ContentEncoding::Gzip));
    assert_eq!(html.metadata.cache_control.unwrap().to_string(), "public, max-age=300");

    assert!(!dir.path().join("dist/app.js.gz").exists());
    assert!(!dir.path().join("dist/index.html.gz").exists());
    assert!(dir.path().join("dist/app.js").exists());

    assert_eq!(report.compressed, 2);
    assert_eq!(report.url(), "gs://acme-site/releases/v1.0.0/");
    let listed: Vec<_> = report.releases.iter().map(|r| r.version.as_str()).collect();
    assert_eq!(listed, ["v1.0.0"]);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn passes_run_in_order() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();

    run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let calls = storage.calls();
    // conflict check, then the write probe, then the passes
    assert_eq!(
        calls[..3],
        [Operation::List, Operation::Upload, Operation::Delete]
    );
    let passes = &calls[3..];
    assert_eq!(passes[0], Operation::Sync);
    assert_eq!(passes[1], Operation::SetMetadata);
    assert!(
        passes[2..]
            .iter()
            .all(|op| matches!(op, Operation::Upload | Operation::Exists | Operation::ListChildren))
    );
    assert_eq!(storage.count(Operation::Upload), 4);
}

#[tokio::test]
async fn existing_release_is_never_overwritten() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    storage.insert(&bucket(), "releases/v1.0.0/index.html", "old");

    let err = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::ReleaseAlreadyExists);
    assert!(matches!(
        err,
        DeployError::Release(ReleaseError::AlreadyExists { ref objects, .. }) if objects.len() == 1
    ));
    assert_eq!(storage.count(Operation::Sync), 0);
    assert_eq!(storage.count(Operation::Upload), 0);
    assert_eq!(
        &storage.object(&bucket(), "releases/v1.0.0/index.html").unwrap().body[..],
        b"old"
    );
    assert!(!dir.path().join("dist/app.js.gz").exists());
}

#[tokio::test]
async fn auto_version_uses_nearest_tag_and_revision() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    let yaml = VERSIONED.replace("version: v1.0.0", "version: auto");

    let report = run(
        config_from_yaml(dir.path(), &yaml, None),
        &storage,
        &FakeScm::tagged("v2.1.0", "9f8e7d6"),
    )
    .await
    .unwrap();

    assert_eq!(report.target.version.as_str(), "v2.1.0-9f8e7d6");
    assert!(storage.object(&bucket(), "releases/v2.1.0-9f8e7d6/index.html").is_some());
}

#[tokio::test]
async fn timestamp_version_uses_utc_clock() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    let yaml = VERSIONED.replace("version: v1.0.0", "version: timestamp");

    let report = run(
        config_from_yaml(dir.path(), &yaml, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    assert_eq!(report.target.version.as_str(), "20240309-140507-abc1234");
}

#[tokio::test]
async fn missing_tag_fails_before_touching_storage() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    let yaml = VERSIONED.replace("version: v1.0.0", "version: auto");

    let err = run(
        config_from_yaml(dir.path(), &yaml, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DeployError::Release(ReleaseError::NoReachableTag)));
    assert!(storage.calls().is_empty());
}

#[tokio::test]
async fn exhausted_retries_abort_and_clean_up() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    storage.fail_next(Operation::SetMetadata, 10);

    let err = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::NetworkOperationFailure);
    match err {
        DeployError::Upload(UploadError::StepFailed { step, attempts, .. }) => {
            assert_eq!(step, "set metadata on releases/v1.0.0/app.js");
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(storage.count(Operation::SetMetadata), 2);
    assert!(!dir.path().join("dist/app.js.gz").exists());
    assert!(!dir.path().join("dist/index.html.gz").exists());
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    storage.fail_next(Operation::Sync, 1);

    run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    assert_eq!(storage.count(Operation::Sync), 2);
    assert!(storage.object(&bucket(), "releases/v1.0.0/app.js").is_some());
}

#[tokio::test]
async fn empty_build_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("dist")).unwrap();
    let storage = MemoryStorage::new();

    let err = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DeployError::EmptyBuild(_)));
    assert_eq!(storage.count(Operation::Upload), 0);
}

#[tokio::test]
async fn missing_index_is_a_warning() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("dist/app.js", "x")]);
    let storage = MemoryStorage::new();

    let report = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    assert!(report.warnings.iter().any(|w| w.kind == WarningKind::MissingIndex));
}

#[tokio::test]
async fn uncompressed_assets_get_long_cache_and_no_encoding() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    write_tree(dir.path(), &[("dist/img/logo.png", "PNG-BYTES")]);
    let storage = MemoryStorage::new();

    run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let logo = storage.object(&bucket(), "releases/v1.0.0/img/logo.png").unwrap();
    assert_eq!(&logo.body[..], b"PNG-BYTES");
    assert_eq!(logo.metadata.content_encoding, None);
    assert_eq!(
        logo.metadata.cache_control.unwrap().to_string(),
        "public, max-age=31536000"
    );
}

#[tokio::test]
async fn configured_media_type_reaches_uncompressed_objects() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    write_tree(dir.path(), &[("dist/pkg/mod.wasm", "\0asm")]);
    let yaml = format!("{VERSIONED}content_types:\n  wasm: application/wasm\n");
    let storage = MemoryStorage::new();

    run(
        config_from_yaml(dir.path(), &yaml, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let wasm = storage.object(&bucket(), "releases/v1.0.0/pkg/mod.wasm").unwrap();
    assert_eq!(wasm.metadata.content_type.as_deref(), Some("application/wasm"));
    assert_eq!(wasm.metadata.content_encoding, None);
    assert_eq!(
        wasm.metadata.cache_control.unwrap().to_string(),
        "public, max-age=31536000"
    );
}

#[tokio::test]
async fn gz_files_shipped_in_the_build_are_preserved_and_uploaded() {
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        &[
            ("dist/index.html", "<html></html>"),
            ("dist/app.js", "console.log('hello');"),
            ("dist/app.js.gz", "BUNDLER-PRECOMPRESSED"),
            ("dist/data/archive.tar.gz", "TARBALL"),
        ],
    );
    let storage = MemoryStorage::new();

    let report = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let mut keys = storage.keys(&bucket());
    keys.sort();
    assert_eq!(
        keys,
        [
            "releases/v1.0.0/app.js",
            "releases/v1.0.0/app.js.gz",
            "releases/v1.0.0/data/archive.tar.gz",
            "releases/v1.0.0/index.html",
        ]
    );

    let shipped = storage.object(&bucket(), "releases/v1.0.0/app.js.gz").unwrap();
    assert_eq!(&shipped.body[..], b"BUNDLER-PRECOMPRESSED");
    let archive = storage
        .object(&bucket(), "releases/v1.0.0/data/archive.tar.gz")
        .unwrap();
    assert_eq!(&archive.body[..], b"TARBALL");

    // app.js kept its existing sibling, so it ships uncompressed.
    let js = storage.object(&bucket(), "releases/v1.0.0/app.js").unwrap();
    assert_eq!(&js.body[..], b"console.log('hello');");
    assert_eq!(js.metadata.content_encoding, None);

    assert_eq!(
        std::fs::read_to_string(dir.path().join("dist/app.js.gz")).unwrap(),
        "BUNDLER-PRECOMPRESSED"
    );
    assert!(dir.path().join("dist/data/archive.tar.gz").exists());
    assert!(!dir.path().join("dist/index.html.gz").exists());

    assert_eq!(report.compressed, 1);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::CompressionSkipped)
    );
}

#[tokio::test]
async fn other_releases_are_left_untouched() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    storage.insert(&bucket(), "releases/v0.9.0/index.html", "previous release");
    storage.insert(&bucket(), "releases/v0.9.0/app.js", "old();");

    let report = run(
        config_from_yaml(dir.path(), VERSIONED, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let old = storage.object(&bucket(), "releases/v0.9.0/index.html").unwrap();
    assert_eq!(&old.body[..], b"previous release");
    let old_js = storage.object(&bucket(), "releases/v0.9.0/app.js").unwrap();
    assert_eq!(&old_js.body[..], b"old();");
    assert_eq!(old_js.metadata, Default::default());

    let listed: Vec<_> = report.releases.iter().map(|r| r.version.as_str()).collect();
    assert_eq!(listed, ["v0.9.0", "v1.0.0"]);
}

#[tokio::test]
async fn sync_log_records_successful_transfers() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    let log_path = dir.path().join("logs/sync.log");
    let mut config = config_from_yaml(dir.path(), VERSIONED, None);
    config.log_file = Some(log_path.clone());

    run(config, &storage, &FakeScm::untagged("abc1234")).await.unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("target=gs://acme-site/releases/v1.0.0/"));
    assert!(log.contains("app.js"));
}

#[tokio::test]
async fn sync_log_records_failed_attempts() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    storage.fail_next(Operation::Sync, 5);
    let log_path = dir.path().join("sync.log");
    let mut config = config_from_yaml(dir.path(), VERSIONED, None);
    config.log_file = Some(log_path.clone());

    let err = run(config, &storage, &FakeScm::untagged("abc1234"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeployError::Upload(UploadError::StepFailed { attempts: 2, .. })
    ));

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("attempt 1 failed: simulated Sync failure"));
    assert!(log.contains("attempt 2 failed: simulated Sync failure"));
    assert_eq!(log.matches("=== ").count(), 2);
}

mod root_layout {
    use super::*;

    const ROOT: &str = r#"
bucket: acme-site
prefix: ""
version: v3
compress_extensions: js,html
"#;

    #[tokio::test]
    async fn stale_objects_are_kept_by_default() {
        let dir = TempDir::new().unwrap();
        site(dir.path());
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "old.css", "body{}");
        storage.insert(&bucket(), "index.html", "previous");

        let report = run(
            config_from_yaml(dir.path(), ROOT, None),
            &storage,
            &FakeScm::untagged("abc1234"),
        )
        .await
        .unwrap();

        assert_eq!(storage.keys(&bucket()), ["app.js", "index.html", "old.css"]);
        assert_eq!(report.upload.stale, ["old.css"]);
        assert!(report.warnings.iter().any(|w| w.kind == WarningKind::StaleObjects));
        assert!(report.releases.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_stale_objects() {
        let dir = TempDir::new().unwrap();
        site(dir.path());
        let storage = MemoryStorage::new();
        storage.insert(&bucket(), "old.css", "body{}");

        let mut config = config_from_yaml(dir.path(), ROOT, None);
        config.delete_extraneous = true;
        let report = run(config, &storage, &FakeScm::untagged("abc1234")).await.unwrap();

        assert_eq!(storage.keys(&bucket()), ["app.js", "index.html"]);
        assert_eq!(report.upload.pruned, 1);
    }
}

#[tokio::test]
async fn routing_config_yields_repoint_steps() {
    let dir = TempDir::new().unwrap();
    site(dir.path());
    let storage = MemoryStorage::new();
    let yaml = format!("{VERSIONED}routing:\n  url_map: acme-lb\n  path_matcher: site\n");

    let report = run(
        config_from_yaml(dir.path(), &yaml, None),
        &storage,
        &FakeScm::untagged("abc1234"),
    )
    .await
    .unwrap();

    let plan = report.repoint.unwrap();
    assert_eq!(plan.rewrite, "/releases/v1.0.0/");
    assert!(plan.steps()[1].contains("/releases/v1.0.0/"));
}
