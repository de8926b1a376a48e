// ABOUTME: Pre-compression of static assets into gzip siblings before upload.
// ABOUTME: Per-file failures are collected, and intermediates are removed when the set is dropped.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::diagnostics::{Diagnostics, Warning};
use crate::storage::relative_key;

/// Headroom required on top of the estimated compressed output.
const DISK_SPACE_MARGIN: u64 = 64 * 1024 * 1024;

/// Default extensions eligible for compression.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "css", "html", "htm", "json", "svg", "txt", "xml"];

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("failed to scan build directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A `.gz` sibling produced for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intermediate {
    /// Source path relative to the build directory, slash separated.
    pub relative: String,
    /// Absolute path of the `<name>.<ext>.gz` file.
    pub path: PathBuf,
}

impl Intermediate {
    /// Lowercased extension of the source file.
    pub fn extension(&self) -> String {
        extension_of(&self.relative).unwrap_or_default()
    }
}

/// A file that could not be compressed.
#[derive(Debug, Clone)]
pub struct CompressionFailure {
    pub relative: String,
    pub reason: String,
}

/// Intermediates created by one compression run.
///
/// Dropping the set deletes every intermediate that is still on disk, so an
/// aborted or interrupted deploy does not leave `.gz` files in the build tree.
#[derive(Debug)]
pub struct CompressedSet {
    intermediates: Vec<Intermediate>,
    failures: Vec<CompressionFailure>,
    cleaned: bool,
}

/// Outcome of removing intermediates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: Vec<PathBuf>,
}

impl CompressedSet {
    pub fn empty() -> Self {
        Self {
            intermediates: Vec::new(),
            failures: Vec::new(),
            cleaned: false,
        }
    }

    pub fn intermediates(&self) -> &[Intermediate] {
        &self.intermediates
    }

    pub fn failures(&self) -> &[CompressionFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.intermediates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intermediates.is_empty()
    }

    /// Delete all intermediates from disk.
    pub fn cleanup(mut self) -> CleanupReport {
        let report = self.remove_all();
        self.cleaned = true;
        report
    }

    fn remove_all(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for intermediate in &self.intermediates {
            match fs::remove_file(&intermediate.path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        "failed to remove {}: {}",
                        intermediate.path.display(),
                        e
                    );
                    report.failed.push(intermediate.path.clone());
                }
            }
        }
        report
    }
}

impl Drop for CompressedSet {
    fn drop(&mut self) {
        if !self.cleaned && !self.intermediates.is_empty() {
            let report = self.remove_all();
            tracing::debug!(removed = report.removed, "removed compression intermediates");
        }
    }
}

/// Produces maximum-compression gzip siblings for eligible files.
#[derive(Debug, Clone)]
pub struct Compressor {
    extensions: Vec<String>,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl Compressor {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty() && e != "gz")
                .collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a relative path should get a gzip sibling.
    pub fn is_eligible(&self, relative: &str) -> bool {
        extension_of(relative).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// Compress every eligible file under `build_dir`.
    ///
    /// A file that fails to compress is recorded as a warning and skipped;
    /// only failing to scan the directory itself is an error. A file whose
    /// `.gz` sibling already exists is left alone so the build tree is never
    /// overwritten.
    pub fn compress(
        &self,
        build_dir: &Path,
        diag: &mut Diagnostics,
    ) -> Result<CompressedSet, CompressError> {
        let mut set = CompressedSet::empty();
        let mut sources = Vec::new();
        let mut eligible_bytes = 0u64;

        for entry in WalkDir::new(build_dir).sort_by_file_name() {
            let entry = entry.map_err(|source| CompressError::Scan {
                path: build_dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_key(build_dir, entry.path());
            if !self.is_eligible(&relative) {
                continue;
            }
            if gz_path(entry.path()).exists() {
                diag.warn(Warning::compression_skipped(format!(
                    "{relative}.gz already exists in the build; uploading {relative} uncompressed"
                )));
                continue;
            }
            eligible_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            sources.push((relative, entry.into_path()));
        }

        check_disk_space(build_dir, eligible_bytes, diag);

        for (relative, source) in sources {
            let target = gz_path(&source);
            match gzip_file(&source, &target) {
                Ok(()) => set.intermediates.push(Intermediate {
                    relative,
                    path: target,
                }),
                Err(e) => {
                    diag.warn(Warning::compression_failed(format!(
                        "failed to compress {relative}: {e}"
                    )));
                    set.failures.push(CompressionFailure {
                        relative,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            compressed = set.len(),
            failed = set.failures.len(),
            "compression finished"
        );
        Ok(set)
    }

    /// The intermediates `compress` would produce, without writing anything.
    pub fn predict(&self, build_dir: &Path) -> Result<Vec<Intermediate>, CompressError> {
        let mut predicted = Vec::new();
        for entry in WalkDir::new(build_dir).sort_by_file_name() {
            let entry = entry.map_err(|source| CompressError::Scan {
                path: build_dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_key(build_dir, entry.path());
            if self.is_eligible(&relative) && !gz_path(entry.path()).exists() {
                predicted.push(Intermediate {
                    relative,
                    path: gz_path(entry.path()),
                });
            }
        }
        Ok(predicted)
    }
}

fn gz_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `source` into a new file at `target`.
///
/// Never replaces an existing file; a partial output this call created is
/// removed on failure.
fn gzip_file(source: &Path, target: &Path) -> io::Result<()> {
    let reader = BufReader::new(File::open(source)?);
    let output = OpenOptions::new().write(true).create_new(true).open(target)?;
    let written = encode(reader, output);
    if written.is_err() {
        let _ = fs::remove_file(target);
    }
    written
}

fn encode(mut reader: impl io::Read, output: File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::best());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()
}

/// Warn when the build directory's filesystem looks too full to hold the intermediates.
fn check_disk_space(build_dir: &Path, needed: u64, diag: &mut Diagnostics) {
    match fs2::available_space(build_dir) {
        Ok(available) if available < needed.saturating_add(DISK_SPACE_MARGIN) => {
            diag.warn(Warning::low_disk_space(format!(
                "only {} MiB free next to the build directory; compression needs up to {} MiB",
                available / (1024 * 1024),
                needed / (1024 * 1024) + 1
            )));
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("could not determine free disk space: {}", e),
    }
}

/// Lowercased extension of a slash-separated relative path.
pub(crate) fn extension_of(relative: &str) -> Option<String> {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}
