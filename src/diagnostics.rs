// ABOUTME: Diagnostics accumulator for non-fatal warnings during deploy and rollback.
// ABOUTME: Collects warnings that shouldn't fail a command but should be shown to users.

/// Collects non-fatal warnings during a command.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of warnings of the given kind.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn compression_failed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::CompressionFailed, message)
    }

    pub fn compression_skipped(message: impl Into<String>) -> Self {
        Self::new(WarningKind::CompressionSkipped, message)
    }

    pub fn low_disk_space(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LowDiskSpace, message)
    }

    pub fn missing_index(message: impl Into<String>) -> Self {
        Self::new(WarningKind::MissingIndex, message)
    }

    pub fn cleanup_failed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::CleanupFailed, message)
    }

    pub fn stale_objects(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StaleObjects, message)
    }

    pub fn routing_unavailable(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RoutingUnavailable, message)
    }
}

/// Categories of warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A single file could not be gzip-compressed; its plain form is still uploaded.
    CompressionFailed,
    /// A file was not compressed because its `.gz` sibling already exists in the build.
    CompressionSkipped,
    /// Free disk space next to the build directory looks insufficient.
    LowDiskSpace,
    /// A release has no `index.html`.
    MissingIndex,
    /// Local compression intermediates could not be deleted.
    CleanupFailed,
    /// A root deploy left remote objects that are not part of the build.
    StaleObjects,
    /// The current load balancer path rewrite could not be read.
    RoutingUnavailable,
}
