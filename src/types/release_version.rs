// ABOUTME: Release version identifiers used as storage folder names.
// ABOUTME: Restricts versions to characters that are safe in object keys and URLs.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseVersionError {
    #[error("release version cannot be empty")]
    Empty,

    #[error("release version exceeds maximum length of 128 characters")]
    TooLong,

    #[error("release version must start with a letter or digit")]
    BadStart,

    #[error("invalid character in release version: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn new(value: &str) -> Result<Self, ReleaseVersionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ReleaseVersionError::Empty);
        }

        if value.len() > 128 {
            return Err(ReleaseVersionError::TooLong);
        }

        if !value.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(ReleaseVersionError::BadStart);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '+') {
                return Err(ReleaseVersionError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
