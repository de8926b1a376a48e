// ABOUTME: Validated storage bucket name.
// ABOUTME: Follows the object storage naming rules for DNS-style bucket names.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BucketNameError {
    #[error("bucket name cannot be empty")]
    Empty,

    #[error("bucket name must be between 3 and 63 characters")]
    BadLength,

    #[error("bucket name must start and end with a letter or digit")]
    BadBoundary,

    #[error("bucket name must be lowercase")]
    NotLowercase,

    #[error("invalid character in bucket name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketName(String);

impl BucketName {
    pub fn new(value: &str) -> Result<Self, BucketNameError> {
        let value = value.trim().trim_start_matches("gs://").trim_end_matches('/');

        if value.is_empty() {
            return Err(BucketNameError::Empty);
        }

        if value.len() < 3 || value.len() > 63 {
            return Err(BucketNameError::BadLength);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(BucketNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && !matches!(c, '-' | '_' | '.') {
                return Err(BucketNameError::InvalidChar(c));
            }
        }

        let boundary_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !boundary_ok(value.chars().next()) || !boundary_ok(value.chars().last()) {
            return Err(BucketNameError::BadBoundary);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `gs://` URL for an object key (or prefix) in this bucket.
    pub fn url(&self, key: &str) -> String {
        format!("gs://{}/{}", self.0, key)
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
