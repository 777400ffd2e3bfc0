//! Platform resolution: choosing the one artifact for this host.
//!
//! Resolution is an exact `(os, arch)` match. There is deliberately no
//! fallback across architectures: an arm64 host never receives an amd64
//! artifact, even where a translation layer could run it.

use crate::catalog::Catalog;
use crate::catalog::entry::ArtifactEntry;
use crate::catalog::platform::Platform;
use semver::Version;
use thiserror::Error;

/// Which version the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    /// A specific version.
    Exact(Version),
    /// The highest version published for the host platform.
    Latest,
}

impl VersionRequest {
    /// Parse a command-line version argument.
    ///
    /// `None` and `"latest"` select [`VersionRequest::Latest`]; a leading `v`
    /// is accepted so release tags can be pasted directly.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidVersion`] when the text is not a
    /// semantic version.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::resolver::VersionRequest;
    ///
    /// let exact = VersionRequest::parse(Some("v0.44.0")).expect("valid version");
    /// assert_eq!(exact, VersionRequest::Exact(semver::Version::new(0, 44, 0)));
    /// assert_eq!(VersionRequest::parse(None).expect("latest"), VersionRequest::Latest);
    /// ```
    pub fn parse(value: Option<&str>) -> Result<Self, ResolutionError> {
        match value.map(str::trim) {
            None | Some("latest") => Ok(Self::Latest),
            Some(text) => Version::parse(text.trim_start_matches('v'))
                .map(Self::Exact)
                .map_err(|e| ResolutionError::InvalidVersion {
                    value: text.to_owned(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl std::fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(version) => write!(f, "{version}"),
            Self::Latest => f.write_str("latest"),
        }
    }
}

/// Errors arising from resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No entry of any version targets the requested platform.
    #[error("unsupported platform {platform}: no artifacts are published for it (available: {available})")]
    UnsupportedPlatform {
        /// The requested platform.
        platform: Platform,
        /// Comma-separated list of platforms that do have artifacts.
        available: String,
    },

    /// The platform is supported but the requested version is absent.
    #[error("version {version} not found for {platform}; available versions: {available}")]
    VersionNotFound {
        /// The requested version.
        version: Version,
        /// The requested platform.
        platform: Platform,
        /// Comma-separated versions published for the platform.
        available: String,
    },

    /// The running host is not one of the supported platforms.
    #[error("unsupported host {os}/{arch}; pass --os and --arch to choose a published platform")]
    UnsupportedHost {
        /// `std::env::consts::OS` of the running process.
        os: String,
        /// `std::env::consts::ARCH` of the running process.
        arch: String,
    },

    /// The requested version string is not a semantic version.
    #[error("invalid version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected text.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// The single catalog entry chosen for a host and version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    entry: ArtifactEntry,
    binary: String,
}

impl ResolvedTarget {
    /// The selected entry.
    #[must_use]
    pub fn entry(&self) -> &ArtifactEntry {
        &self.entry
    }

    /// Path of the executable inside an archive artifact.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }
}

/// Detect the host platform.
///
/// # Errors
///
/// Returns [`ResolutionError::UnsupportedHost`] when the running process is
/// neither macOS nor Linux on arm64 or amd64.
pub fn host_platform() -> Result<Platform, ResolutionError> {
    Platform::host().ok_or_else(|| ResolutionError::UnsupportedHost {
        os: std::env::consts::OS.to_owned(),
        arch: std::env::consts::ARCH.to_owned(),
    })
}

/// Select the catalog entry for `request` on `platform`.
///
/// # Errors
///
/// Returns [`ResolutionError::UnsupportedPlatform`] when no version targets
/// `platform`, or [`ResolutionError::VersionNotFound`] when the platform is
/// published but the exact version is not.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::Catalog;
/// use formula_installer::catalog::platform::{Arch, Os, Platform};
/// use formula_installer::resolver::{ResolutionError, VersionRequest, resolve};
///
/// let toml = format!(
///     "name = \"tool\"\n[[artifacts]]\nversion = \"0.44.0\"\nos = \"macos\"\n\
///      arch = \"arm64\"\nurl = \"https://example.test/x.zip\"\nsha256 = \"{}\"\n",
///     "d".repeat(64),
/// );
/// let catalog = Catalog::parse(&toml, None).expect("valid manifest");
///
/// let linux = Platform::new(Os::Linux, Arch::Amd64);
/// let err = resolve(&catalog, &VersionRequest::Latest, linux).expect_err("unsupported");
/// assert!(matches!(err, ResolutionError::UnsupportedPlatform { .. }));
/// ```
pub fn resolve(
    catalog: &Catalog,
    request: &VersionRequest,
    platform: Platform,
) -> Result<ResolvedTarget, ResolutionError> {
    if !catalog.supports(platform) {
        return Err(ResolutionError::UnsupportedPlatform {
            platform,
            available: available_platforms(catalog),
        });
    }

    let version = match request {
        VersionRequest::Exact(version) => version,
        VersionRequest::Latest => catalog.latest_for(platform).ok_or_else(|| {
            ResolutionError::UnsupportedPlatform {
                platform,
                available: available_platforms(catalog),
            }
        })?,
    };

    let entry = catalog
        .get(version, platform)
        .ok_or_else(|| ResolutionError::VersionNotFound {
            version: version.clone(),
            platform,
            available: available_versions(catalog, platform),
        })?;

    log::debug!(
        "resolved {} {} for {platform} to {}",
        catalog.name(),
        entry.version(),
        entry.source()
    );

    Ok(ResolvedTarget {
        entry: entry.clone(),
        binary: catalog.binary().to_owned(),
    })
}

fn available_platforms(catalog: &Catalog) -> String {
    let listed: Vec<String> = Platform::all()
        .filter(|platform| catalog.supports(*platform))
        .map(|platform| platform.to_string())
        .collect();
    if listed.is_empty() {
        "none".to_owned()
    } else {
        listed.join(", ")
    }
}

fn available_versions(catalog: &Catalog, platform: Platform) -> String {
    let mut versions: Vec<&Version> = catalog
        .entries_for(platform)
        .map(ArtifactEntry::version)
        .collect();
    versions.sort_unstable_by(|a, b| b.cmp(a));
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
