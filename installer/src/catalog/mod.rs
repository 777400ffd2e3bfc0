//! Manifest catalog: the table of published artifacts.
//!
//! A [`Catalog`] is loaded once per invocation and never mutated afterwards,
//! so it can be shared freely between threads.
//!
//! # Sub-modules
//!
//! - [`entry`] - One artifact per version and platform (`ArtifactEntry`).
//! - [`error`] - Manifest loading errors (`CatalogError`).
//! - [`manifest_parser`] - TOML manifest deserialization.
//! - [`platform`] - Operating system and architecture identifiers.
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`source`] - Artifact source locations (`SourceLocation`).

pub mod entry;
pub mod error;
pub mod manifest_parser;
pub mod platform;
pub mod sha256_digest;
pub mod source;

use self::entry::{ArtifactEntry, ArtifactKey};
use self::error::{CatalogError, Result};
use self::manifest_parser::{ParsedManifest, parse_manifest};
use self::platform::Platform;
use camino::Utf8Path;
use semver::Version;
use std::collections::HashMap;

/// An immutable, keyed collection of artifact entries.
///
/// Entries keep manifest order; lookups by `(version, os, arch)` go through
/// an index built at construction time.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::Catalog;
/// use formula_installer::catalog::platform::{Arch, Os, Platform};
///
/// let toml = format!(
///     "name = \"tool\"\n[[artifacts]]\nversion = \"1.0.0\"\nos = \"linux\"\n\
///      arch = \"amd64\"\nurl = \"https://example.test/t.tar.gz\"\nsha256 = \"{}\"\n",
///     "0".repeat(64),
/// );
/// let catalog = Catalog::parse(&toml, None).expect("valid manifest");
/// let linux = Platform::new(Os::Linux, Arch::Amd64);
/// assert!(catalog.supports(linux));
/// assert!(!catalog.supports(Platform::new(Os::MacOs, Arch::Arm64)));
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    binary: String,
    entries: Vec<ArtifactEntry>,
    index: HashMap<ArtifactKey, usize>,
}

impl Catalog {
    /// Build a catalog from validated entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateEntry`] when two entries share the
    /// same `(version, os, arch)` key.
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<String>,
        entries: Vec<ArtifactEntry>,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if let Some(first) = index.insert(entry.key(), position) {
                return Err(CatalogError::DuplicateEntry {
                    version: entry.version().to_string(),
                    platform: entry.platform().to_string(),
                    first,
                    second: position,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            binary: binary.into(),
            entries,
            index,
        })
    }

    /// Parse manifest text into a catalog.
    ///
    /// Relative artifact paths resolve against `base_dir`; see
    /// [`parse_manifest`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedManifest`] or
    /// [`CatalogError::DuplicateEntry`].
    pub fn parse(text: &str, base_dir: Option<&Utf8Path>) -> Result<Self> {
        let ParsedManifest {
            name,
            binary,
            entries,
        } = parse_manifest(text, base_dir)?;
        Self::new(name, binary, entries)
    }

    /// Parse raw manifest bytes, as returned by a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedManifest`] when the bytes are not
    /// UTF-8, plus every error [`Catalog::parse`] can return.
    pub fn from_bytes(bytes: &[u8], base_dir: Option<&Utf8Path>) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CatalogError::malformed(format!("manifest is not UTF-8: {e}")))?;
        Self::parse(text, base_dir)
    }

    /// Load a manifest from a local file.
    ///
    /// Relative artifact paths resolve against the manifest's directory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Read`] if the file cannot be read, plus every
    /// error [`Catalog::parse`] can return.
    pub fn load_file(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
            source_name: path.to_string(),
            reason: e.to_string(),
        })?;
        let base_dir = path.parent().filter(|dir| !dir.as_str().is_empty());
        log::debug!("loaded manifest {path} ({} bytes)", text.len());
        Self::parse(&text, Some(base_dir.unwrap_or_else(|| Utf8Path::new("."))))
    }

    /// Name of the packaged tool.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative path of the executable inside archive artifacts.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// All entries in manifest order.
    #[must_use]
    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for an exact `(version, platform)` key.
    #[must_use]
    pub fn get(&self, version: &Version, platform: Platform) -> Option<&ArtifactEntry> {
        let key = ArtifactKey {
            version: version.clone(),
            platform,
        };
        self.index
            .get(&key)
            .and_then(|position| self.entries.get(*position))
    }

    /// Whether any version is published for `platform`.
    #[must_use]
    pub fn supports(&self, platform: Platform) -> bool {
        self.entries.iter().any(|entry| entry.platform() == platform)
    }

    /// Entries published for `platform`, in manifest order.
    pub fn entries_for(&self, platform: Platform) -> impl Iterator<Item = &ArtifactEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.platform() == platform)
    }

    /// The highest stable version published for `platform`.
    ///
    /// Pre-release versions are only considered when no stable version
    /// exists for the platform.
    #[must_use]
    pub fn latest_for(&self, platform: Platform) -> Option<&Version> {
        let stable = self
            .entries_for(platform)
            .map(ArtifactEntry::version)
            .filter(|version| version.pre.is_empty())
            .max();
        stable.or_else(|| self.entries_for(platform).map(ArtifactEntry::version).max())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
