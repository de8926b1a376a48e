// ABOUTME: Storage prefix under which a release lives.
// ABOUTME: Either the bucket root (empty) or a slash-terminated relative path.

use std::fmt;
use thiserror::Error;

use super::ReleaseVersion;

#[derive(Debug, Error)]
pub enum PrefixError {
    #[error("prefix must not start with '/': {0}")]
    LeadingSlash(String),

    #[error("prefix contains an empty path segment: {0}")]
    EmptySegment(String),

    #[error("prefix contains a relative path segment: {0}")]
    RelativeSegment(String),

    #[error("invalid character in prefix: '{0}'")]
    InvalidChar(char),
}

/// A namespace inside a bucket. The empty prefix is the bucket root.
///
/// Non-root prefixes are always normalised to end with exactly one `/`, so
/// `prefix.key("index.html")` never needs to think about separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Prefix(String);

impl Prefix {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn new(value: &str) -> Result<Self, PrefixError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::root());
        }

        if value.starts_with('/') {
            return Err(PrefixError::LeadingSlash(value.to_string()));
        }

        for c in value.chars() {
            if c.is_control() || matches!(c, '*' | '?' | '[' | ']' | '#') {
                return Err(PrefixError::InvalidChar(c));
            }
        }

        let trimmed = value.strip_suffix('/').unwrap_or(value);
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(PrefixError::EmptySegment(value.to_string()));
            }
            if segment == "." || segment == ".." {
                return Err(PrefixError::RelativeSegment(value.to_string()));
            }
        }

        Ok(Self(format!("{trimmed}/")))
    }

    /// Prefix of a release living directly under this prefix.
    pub fn join_release(&self, version: &ReleaseVersion) -> Self {
        Self(format!("{}{}/", self.0, version))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote key for a path relative to this prefix.
    pub fn key(&self, relative: &str) -> String {
        format!("{}{}", self.0, relative.trim_start_matches('/'))
    }

    /// Strip this prefix from a key, returning the relative remainder.
    pub fn relative<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.0.as_str())
    }

    /// The path rewrite value a load balancer uses to serve this prefix.
    pub fn rewrite_path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<bucket root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
