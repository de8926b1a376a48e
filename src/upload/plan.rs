// ABOUTME: Classification of build files into the four ordered upload passes.
// ABOUTME: Computes remote keys and metadata for every object before anything is written.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::UploadError;
use super::media::{MediaTypes, TEXT_HTML, is_html};
use crate::compress::{Intermediate, extension_of};
use crate::storage::{CacheControl, ObjectMetadata, SyncFilter, relative_key};
use crate::types::Prefix;

/// Cache lifetimes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CachePolicy {
    /// max-age for every non-HTML object.
    #[serde(default = "default_long")]
    pub long: u64,
    /// max-age for HTML objects.
    #[serde(default = "default_short")]
    pub short: u64,
}

fn default_long() -> u64 {
    31_536_000
}

fn default_short() -> u64 {
    300
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            long: default_long(),
            short: default_short(),
        }
    }
}

impl CachePolicy {
    pub fn long(&self) -> CacheControl {
        CacheControl::max_age(self.long)
    }

    pub fn short(&self) -> CacheControl {
        CacheControl::max_age(self.short)
    }
}

/// Upload passes, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pass {
    /// (a) Bulk synchronize of non-HTML files, then a cache metadata patch per object.
    Bulk,
    /// (b) Gzip intermediates of non-HTML files at their original keys.
    CompressedAssets,
    /// (c) HTML files with the short cache lifetime.
    Html,
    /// (d) Gzip intermediates of HTML files at their original keys.
    CompressedHtml,
}

impl Pass {
    pub const ALL: [Pass; 4] = [
        Pass::Bulk,
        Pass::CompressedAssets,
        Pass::Html,
        Pass::CompressedHtml,
    ];
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pass::Bulk => "assets",
            Pass::CompressedAssets => "compressed assets",
            Pass::Html => "html",
            Pass::CompressedHtml => "compressed html",
        };
        write!(f, "{name}")
    }
}

/// One object written (or patched) by a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedObject {
    pub pass: Pass,
    /// File read from disk (the `.gz` intermediate for compressed passes).
    pub local: PathBuf,
    /// Remote key, never carrying a `.gz` suffix.
    pub key: String,
    pub metadata: ObjectMetadata,
}

/// Everything an upload will do, grouped by pass.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub source: PathBuf,
    pub prefix: Prefix,
    pub bulk: Vec<PlannedObject>,
    pub compressed_assets: Vec<PlannedObject>,
    pub html: Vec<PlannedObject>,
    pub compressed_html: Vec<PlannedObject>,
    /// Keys the prefix holds once the upload finished: one per build file.
    pub logical_keys: BTreeSet<String>,
    /// Relative paths of this run's gzip intermediates, never uploaded under their own name.
    pub intermediates: BTreeSet<String>,
}

impl UploadPlan {
    /// Plan the upload of `build_dir` to `prefix`.
    ///
    /// `intermediates` are the gzip siblings produced by the compressor. Any
    /// other `*.gz` file in the tree belongs to the build and is uploaded
    /// like every other asset.
    pub fn build(
        build_dir: &Path,
        prefix: &Prefix,
        intermediates: &[Intermediate],
        media: &MediaTypes,
        cache: CachePolicy,
    ) -> Result<Self, UploadError> {
        let mut plan = UploadPlan {
            source: build_dir.to_path_buf(),
            prefix: prefix.clone(),
            bulk: Vec::new(),
            compressed_assets: Vec::new(),
            html: Vec::new(),
            compressed_html: Vec::new(),
            logical_keys: BTreeSet::new(),
            intermediates: intermediates
                .iter()
                .map(|i| relative_key(build_dir, &i.path))
                .collect(),
        };

        for entry in WalkDir::new(build_dir).sort_by_file_name() {
            let entry = entry.map_err(|source| UploadError::Scan { source })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_key(build_dir, entry.path());
            if plan.intermediates.contains(&relative) {
                continue;
            }
            let extension = extension_of(&relative).unwrap_or_default();

            let key = prefix.key(&relative);
            plan.logical_keys.insert(key.clone());

            if is_html(&extension) {
                plan.html.push(PlannedObject {
                    pass: Pass::Html,
                    local: entry.into_path(),
                    key,
                    metadata: ObjectMetadata::default()
                        .content_type(TEXT_HTML)
                        .cache(cache.short()),
                });
            } else {
                let mut metadata = ObjectMetadata::default().cache(cache.long());
                if let Some(media_type) = media.lookup(&extension) {
                    metadata = metadata.content_type(media_type);
                }
                plan.bulk.push(PlannedObject {
                    pass: Pass::Bulk,
                    local: entry.into_path(),
                    key,
                    metadata,
                });
            }
        }

        for intermediate in intermediates {
            let extension = intermediate.extension();
            let key = prefix.key(&intermediate.relative);
            if is_html(&extension) {
                plan.compressed_html.push(PlannedObject {
                    pass: Pass::CompressedHtml,
                    local: intermediate.path.clone(),
                    key,
                    metadata: ObjectMetadata::default()
                        .content_type(TEXT_HTML)
                        .gzip()
                        .cache(cache.short()),
                });
            } else {
                plan.compressed_assets.push(PlannedObject {
                    pass: Pass::CompressedAssets,
                    local: intermediate.path.clone(),
                    key,
                    metadata: ObjectMetadata::default()
                        .content_type(media.for_extension(&extension))
                        .gzip()
                        .cache(cache.long()),
                });
            }
        }

        Ok(plan)
    }

    /// Filter for the bulk synchronize of pass (a).
    pub fn sync_filter(&self) -> SyncFilter {
        SyncFilter::skipping(["html", "htm"]).with_paths(self.intermediates.iter().cloned())
    }

    pub fn pass(&self, pass: Pass) -> &[PlannedObject] {
        match pass {
            Pass::Bulk => &self.bulk,
            Pass::CompressedAssets => &self.compressed_assets,
            Pass::Html => &self.html,
            Pass::CompressedHtml => &self.compressed_html,
        }
    }

    /// Whether the build has a top-level `index.html`.
    pub fn has_index(&self) -> bool {
        self.logical_keys.contains(&self.prefix.key("index.html"))
    }

    pub fn is_empty(&self) -> bool {
        self.logical_keys.is_empty()
    }
}
