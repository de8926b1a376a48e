// ABOUTME: Integration tests for rollback by path rewrite repointing.
// ABOUTME: Uses in-memory storage and routing to check selection, confirmation and apply behavior.

mod support;

use sitepush::config::Config;
use sitepush::deploy::{DeployError, DeployErrorKind, RollbackReport, RollbackRequest, rollback};
use sitepush::diagnostics::{Diagnostics, WarningKind};
use sitepush::prompt::NonInteractive;
use sitepush::release::ReleaseError;
use sitepush::routing::{MemoryRouting, RoutingOps};
use sitepush::storage::MemoryStorage;
use sitepush::types::{BucketName, ReleaseVersion};
use support::{config_from_yaml, init_tracing};
use tempfile::TempDir;

const ROUTED: &str = r#"
bucket: acme-site
prefix: releases/
routing:
  url_map: acme-lb
  path_matcher: site
environments:
  production: {}
"#;

fn bucket() -> BucketName {
    BucketName::new("acme-site").unwrap()
}

/// Storage holding releases v1 and v2, each with an index.html.
fn two_releases() -> MemoryStorage {
    let storage = MemoryStorage::new();
    for version in ["v1", "v2"] {
        storage.insert(&bucket(), &format!("releases/{version}/index.html"), "<html>");
        storage.insert(&bucket(), &format!("releases/{version}/app.js"), "js");
    }
    storage
}

fn to(version: &str, apply: bool) -> RollbackRequest {
    RollbackRequest {
        version: Some(ReleaseVersion::new(version).unwrap()),
        apply,
    }
}

async fn run(
    config: &Config,
    storage: &MemoryStorage,
    routing: Option<&MemoryRouting>,
    assume_yes: bool,
    request: &RollbackRequest,
    diag: &mut Diagnostics,
) -> Result<RollbackReport, DeployError> {
    let prompter = NonInteractive { assume_yes };
    rollback(
        config,
        storage,
        routing.map(|r| r as &dyn RoutingOps),
        &prompter,
        request,
        diag,
    )
    .await
}

#[tokio::test]
async fn without_apply_only_instructions_are_produced() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = two_releases();
    let routing = MemoryRouting::new(Some("/releases/v2/"));

    let report = run(&config, &storage, Some(&routing), false, &to("v1", false), &mut Diagnostics::default())
        .await
        .unwrap();

    assert_eq!(report.release.version.as_str(), "v1");
    assert_eq!(report.plan.rewrite, "/releases/v1/");
    assert_eq!(report.plan.current.as_deref(), Some("/releases/v2/"));
    assert!(!report.applied);
    assert!(routing.updates().is_empty());
    assert!(report.plan.steps()[0].contains("url-maps export acme-lb"));
}

#[tokio::test]
async fn apply_repoints_the_rewrite() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = two_releases();
    let routing = MemoryRouting::new(Some("/releases/v2/"));

    let report = run(&config, &storage, Some(&routing), false, &to("v1", true), &mut Diagnostics::default())
        .await
        .unwrap();

    assert!(report.applied);
    assert_eq!(routing.updates(), ["/releases/v1/"]);
    assert_eq!(routing.rewrite().as_deref(), Some("/releases/v1/"));
    // releases themselves are never touched
    assert_eq!(storage.keys(&bucket()).len(), 4);
}

#[tokio::test]
async fn current_release_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, Some("production"));
    let storage = two_releases();
    let routing = MemoryRouting::new(Some("/releases/v2/"));

    let report = run(&config, &storage, Some(&routing), false, &to("v2", true), &mut Diagnostics::default())
        .await
        .unwrap();

    assert!(report.already_current());
    assert!(!report.applied);
    assert!(routing.updates().is_empty());
}

#[tokio::test]
async fn production_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, Some("production"));
    let storage = two_releases();
    let routing = MemoryRouting::new(Some("/releases/v2/"));

    let err = run(&config, &storage, Some(&routing), false, &to("v1", true), &mut Diagnostics::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Cancelled);
    assert!(routing.updates().is_empty());
}

#[tokio::test]
async fn production_with_assumed_yes_applies() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, Some("production"));
    let storage = two_releases();
    let routing = MemoryRouting::new(Some("/releases/v2/"));

    let report = run(&config, &storage, Some(&routing), true, &to("v1", true), &mut Diagnostics::default())
        .await
        .unwrap();

    assert!(report.applied);
    assert_eq!(routing.updates(), ["/releases/v1/"]);
}

#[tokio::test]
async fn apply_without_routing_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), "bucket: acme-site\n", None);
    let storage = two_releases();

    let err = run(&config, &storage, None, true, &to("v1", true), &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::RoutingNotConfigured));
}

#[tokio::test]
async fn instructions_without_routing_use_placeholders() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), "bucket: acme-site\n", None);
    let storage = two_releases();

    let report = run(&config, &storage, None, false, &to("v1", false), &mut Diagnostics::default())
        .await
        .unwrap();
    assert!(report.plan.steps()[0].contains("<URL_MAP>"));
}

#[tokio::test]
async fn unknown_version_is_not_found() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = two_releases();

    let err = run(&config, &storage, None, false, &to("v9", false), &mut Diagnostics::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::Release(ReleaseError::NotFound(ref url)) if url == "gs://acme-site/releases/v9/"
    ));
}

#[tokio::test]
async fn no_selection_without_terminal() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = two_releases();
    let request = RollbackRequest::default();

    let err = run(&config, &storage, None, true, &request, &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NoReleaseSelected));
}

#[tokio::test]
async fn empty_bucket_has_no_releases() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = MemoryStorage::new();

    let err = run(&config, &storage, None, false, &to("v1", false), &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::NoReleases);
}

#[tokio::test]
async fn root_layout_has_no_releases() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), "bucket: acme-site\nprefix: \"\"\n", None);
    let storage = two_releases();

    let err = run(&config, &storage, None, false, &to("v1", false), &mut Diagnostics::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::NoReleases);
}

#[tokio::test]
async fn unreadable_routing_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = two_releases();
    let routing = MemoryRouting::unavailable();
    let mut diag = Diagnostics::default();

    let report = run(&config, &storage, Some(&routing), false, &to("v1", false), &mut diag)
        .await
        .unwrap();

    assert!(report.plan.current.is_none());
    assert_eq!(diag.count(WarningKind::RoutingUnavailable), 1);
}

#[tokio::test]
async fn release_without_index_is_flagged() {
    let dir = TempDir::new().unwrap();
    let config = config_from_yaml(dir.path(), ROUTED, None);
    let storage = MemoryStorage::new();
    storage.insert(&bucket(), "releases/v1/app.js", "js");
    let mut diag = Diagnostics::default();

    run(&config, &storage, None, false, &to("v1", false), &mut diag)
        .await
        .unwrap();
    assert_eq!(diag.count(WarningKind::MissingIndex), 1);
}
