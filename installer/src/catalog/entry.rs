//! Catalog entries: one published artifact per version and platform.

use super::platform::{Arch, Os, Platform};
use super::sha256_digest::Sha256Digest;
use super::source::SourceLocation;
use semver::Version;
use serde::Serialize;

/// The uniqueness key of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    /// The artifact's semantic version.
    pub version: Version,
    /// The platform the artifact was built for.
    pub platform: Platform,
}

/// One downloadable artifact: a single version built for a single platform.
///
/// Entries are immutable once the catalog is loaded.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::entry::ArtifactEntry;
/// use formula_installer::catalog::platform::{Arch, Os, Platform};
/// use formula_installer::catalog::sha256_digest::Sha256Digest;
/// use formula_installer::catalog::source::SourceLocation;
///
/// let entry = ArtifactEntry::new(
///     semver::Version::new(0, 44, 0),
///     Platform::new(Os::MacOs, Arch::Arm64),
///     SourceLocation::Remote("https://example.test/x.zip".to_owned()),
///     Sha256Digest::try_from("d".repeat(64)).expect("valid digest"),
/// );
/// assert_eq!(entry.os(), Os::MacOs);
/// assert_eq!(entry.version().to_string(), "0.44.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    version: Version,
    #[serde(flatten)]
    platform: Platform,
    #[serde(rename = "url")]
    source: SourceLocation,
    #[serde(rename = "sha256")]
    digest: Sha256Digest,
}

impl ArtifactEntry {
    /// Construct an entry from validated parts.
    #[must_use]
    pub const fn new(
        version: Version,
        platform: Platform,
        source: SourceLocation,
        digest: Sha256Digest,
    ) -> Self {
        Self {
            version,
            platform,
            source,
            digest,
        }
    }

    /// The artifact's semantic version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// The platform the artifact targets.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// The artifact's operating system.
    #[must_use]
    pub const fn os(&self) -> Os {
        self.platform.os
    }

    /// The artifact's CPU architecture.
    #[must_use]
    pub const fn arch(&self) -> Arch {
        self.platform.arch
    }

    /// Where the artifact bytes are fetched from.
    #[must_use]
    pub const fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// The expected SHA-256 of the fetched bytes.
    #[must_use]
    pub const fn digest(&self) -> &Sha256Digest {
        &self.digest
    }

    /// The `(version, os, arch)` key of this entry.
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            version: self.version.clone(),
            platform: self.platform,
        }
    }
}
