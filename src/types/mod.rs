// ABOUTME: Validated domain types for buckets, prefixes and release versions.
// ABOUTME: Invalid values are rejected at construction so the workflow never sees them.

mod bucket_name;
mod prefix;
mod release_version;

pub use bucket_name::{BucketName, BucketNameError};
pub use prefix::{Prefix, PrefixError};
pub use release_version::{ReleaseVersion, ReleaseVersionError};
