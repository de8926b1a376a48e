// ABOUTME: Extension to media type table used for Content-Type metadata.
// ABOUTME: Built-in defaults can be extended from configuration; HTML is always text/html.

use std::collections::{BTreeMap, HashMap};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_HTML: &str = "text/html";

const DEFAULTS: &[(&str, &str)] = &[
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("html", TEXT_HTML),
    ("htm", TEXT_HTML),
];

/// Extensions that are uploaded in the HTML passes.
pub fn is_html(extension: &str) -> bool {
    matches!(extension, "html" | "htm")
}

/// Static extension → media type lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypes {
    table: BTreeMap<String, String>,
}

impl Default for MediaTypes {
    fn default() -> Self {
        Self {
            table: DEFAULTS
                .iter()
                .map(|(ext, media)| (ext.to_string(), media.to_string()))
                .collect(),
        }
    }
}

impl MediaTypes {
    /// Defaults plus configured entries. Entries for HTML extensions are ignored.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut types = Self::default();
        for (ext, media) in overrides {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() || is_html(&ext) {
                continue;
            }
            types.table.insert(ext, media.trim().to_string());
        }
        types
    }

    /// Media type for a known extension.
    pub fn lookup(&self, extension: &str) -> Option<&str> {
        self.table
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Media type for any extension, falling back to `application/octet-stream`.
    pub fn for_extension(&self, extension: &str) -> &str {
        self.lookup(extension).unwrap_or(OCTET_STREAM)
    }
}
