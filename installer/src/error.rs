//! Top-level error type for the installer CLI.
//!
//! Each pipeline layer has its own error enum; [`InstallerError`] wraps them
//! without rewording so the original diagnostic reaches the user, and maps
//! every failure to a distinct process exit code.

use crate::catalog::error::CatalogError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::install::InstallError;
use crate::payload::PayloadError;
use crate::resolver::ResolutionError;
use crate::verify::IntegrityError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during any installer command.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// No catalog entry matches the request.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The artifact or manifest could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The artifact failed its integrity check.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The executable could not be taken out of the artifact.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The executable could not be written.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A file named on the command line could not be hashed.
    #[error("failed to hash {path}: {source}")]
    Hash {
        /// The file being hashed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output.
    #[error("failed to write output: {reason}")]
    WriteFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl InstallerError {
    /// The process exit code for this failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::config::ConfigError;
    /// use formula_installer::error::InstallerError;
    ///
    /// assert_eq!(InstallerError::from(ConfigError::MissingManifest).exit_code(), 1);
    /// ```
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::MalformedManifest { .. } => 10,
                CatalogError::DuplicateEntry { .. } => 11,
                CatalogError::Read { .. } => 12,
            },
            Self::Resolution(err) => match err {
                ResolutionError::UnsupportedPlatform { .. } => 20,
                ResolutionError::VersionNotFound { .. } => 21,
                ResolutionError::UnsupportedHost { .. } => 22,
                ResolutionError::InvalidVersion { .. } => 2,
            },
            Self::Fetch(err) => match err {
                FetchError::Transport { .. } => 30,
                FetchError::Timeout { .. } => 31,
                FetchError::NotFound { .. } => 32,
                FetchError::ClientStatus { .. } => 33,
                FetchError::Io { .. } => 1,
                FetchError::Cancelled { .. } => 60,
            },
            Self::Integrity(_) => 40,
            Self::Payload(_) => 45,
            Self::Install(err) => match err {
                InstallError::PermissionDenied { .. } => 50,
                InstallError::DiskFull { .. } => 51,
                InstallError::InvalidTarget { .. } | InstallError::Io { .. } => 52,
                InstallError::Cancelled { .. } => 60,
            },
            Self::Config(_) | Self::Hash { .. } | Self::WriteFailed { .. } => 1,
        }
    }
}

/// Result type for installer operations.
pub type Result<T> = std::result::Result<T, InstallerError>;
