// ABOUTME: Per-object HTTP metadata written alongside uploaded objects.
// ABOUTME: Content-Type, Content-Encoding and Cache-Control headers.

use std::fmt;

/// `Cache-Control: public, max-age=<seconds>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheControl {
    pub max_age: u64,
}

impl CacheControl {
    pub fn max_age(seconds: u64) -> Self {
        Self { max_age: seconds }
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "public, max-age={}", self.max_age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentEncoding::Gzip => write!(f, "gzip"),
        }
    }
}

/// Metadata to apply to an object. `None` fields are left untouched by a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
    pub cache_control: Option<CacheControl>,
}

impl ObjectMetadata {
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn gzip(mut self) -> Self {
        self.content_encoding = Some(ContentEncoding::Gzip);
        self
    }

    pub fn cache(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    /// Overlay the set fields of `patch` onto `self`.
    pub fn merge(&mut self, patch: &ObjectMetadata) {
        if let Some(ref content_type) = patch.content_type {
            self.content_type = Some(content_type.clone());
        }
        if patch.content_encoding.is_some() {
            self.content_encoding = patch.content_encoding;
        }
        if patch.cache_control.is_some() {
            self.cache_control = patch.cache_control;
        }
    }

    /// Header name/value pairs for the set fields.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(ref content_type) = self.content_type {
            headers.push(("Content-Type", content_type.clone()));
        }
        if let Some(encoding) = self.content_encoding {
            headers.push(("Content-Encoding", encoding.to_string()));
        }
        if let Some(cache) = self.cache_control {
            headers.push(("Cache-Control", cache.to_string()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_only_include_set_fields() {
        let metadata = ObjectMetadata::default()
            .content_type("text/html")
            .cache(CacheControl::max_age(300));
        assert_eq!(
            metadata.headers(),
            vec![
                ("Content-Type", "text/html".to_string()),
                ("Cache-Control", "public, max-age=300".to_string()),
            ]
        );
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut current = ObjectMetadata::default()
            .content_type("application/javascript")
            .gzip();
        current.merge(&ObjectMetadata::default().cache(CacheControl::max_age(60)));
        assert_eq!(current.content_type.as_deref(), Some("application/javascript"));
        assert_eq!(current.content_encoding, Some(ContentEncoding::Gzip));
        assert_eq!(current.cache_control, Some(CacheControl::max_age(60)));
    }
}
