// ABOUTME: Release naming, version conflict detection and release enumeration.
// ABOUTME: A release is an immutable build snapshot stored under its own prefix.

mod error;
mod guard;
mod listing;
mod namer;

pub use error::ReleaseError;
pub use guard::ensure_vacant;
pub use listing::{ReleaseEntry, find_release, list_releases};
pub use namer::{GitCli, SourceControl, VersionSpec, resolve_version, timestamp_label};
