// ABOUTME: Uploads a build directory as a release with per-class cache and encoding metadata.
// ABOUTME: Exports the media table, upload planning, the uploader and its errors.

mod error;
mod log;
mod media;
mod plan;
mod uploader;

pub use error::{UploadError, UploadErrorKind};
pub use log::SyncLog;
pub use media::{MediaTypes, OCTET_STREAM, TEXT_HTML, is_html};
pub use plan::{CachePolicy, Pass, PlannedObject, UploadPlan};
pub use uploader::{Extraneous, UploadReport, Uploader};
