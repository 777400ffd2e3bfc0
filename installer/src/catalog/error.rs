//! Error types for manifest loading and catalog construction.
//!
//! Each variant names the offending entry (by its zero-based position in the
//! manifest) and the constraint that was violated, so authors can locate the
//! problem without re-reading the whole file.

use thiserror::Error;

/// Errors arising while loading a manifest into a [`Catalog`](super::Catalog).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// An entry lacks a required field or a field fails validation.
    #[error("malformed manifest: {reason}")]
    MalformedManifest {
        /// Description of the missing or invalid field.
        reason: String,
    },

    /// Two entries share the same `(version, os, arch)` key.
    #[error("duplicate manifest entry for {version} {platform} (entries {first} and {second})")]
    DuplicateEntry {
        /// The colliding version.
        version: String,
        /// The colliding platform, rendered as `os/arch`.
        platform: String,
        /// Position of the first entry with this key.
        first: usize,
        /// Position of the colliding entry.
        second: usize,
    },

    /// The manifest source could not be read.
    #[error("failed to read manifest {source_name}: {reason}")]
    Read {
        /// Path or URL of the manifest.
        source_name: String,
        /// Description of the underlying failure.
        reason: String,
    },
}

impl CatalogError {
    /// Build a [`CatalogError::MalformedManifest`] from any displayable reason.
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedManifest {
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
