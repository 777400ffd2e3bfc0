//! Artifact source locations.
//!
//! A location is either a remote HTTP(S) URL or a local filesystem path.
//! `file://` URLs are treated as local paths. Relative paths are resolved
//! against a base directory (normally the manifest's own directory) when the
//! catalog is loaded.

use super::error::{CatalogError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;

/// Where an artifact (or a manifest) can be fetched from.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use formula_installer::catalog::source::SourceLocation;
///
/// let remote = SourceLocation::parse("https://example.test/x.zip", None).expect("valid");
/// assert!(remote.is_remote());
///
/// let local = SourceLocation::parse("dist/x.zip", Some(Utf8Path::new("/srv/tap")))
///     .expect("valid");
/// assert_eq!(local.to_string(), "/srv/tap/dist/x.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SourceLocation {
    /// An `http://` or `https://` URL.
    Remote(String),
    /// A path on the local filesystem.
    Local(Utf8PathBuf),
}

impl SourceLocation {
    /// Parse a location string, resolving relative paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MalformedManifest`] when the value is empty,
    /// uses an unsupported URL scheme, or is an `http(s)` URL without a host.
    pub fn parse(value: &str, base_dir: Option<&Utf8Path>) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::malformed("artifact url is empty"));
        }

        let remote_rest =
            strip_scheme(trimmed, "https://").or_else(|| strip_scheme(trimmed, "http://"));
        if let Some(rest) = remote_rest {
            if rest.is_empty() || rest.starts_with('/') {
                return Err(CatalogError::malformed(format!(
                    "url \"{trimmed}\" has no host"
                )));
            }
            return Ok(Self::Remote(trimmed.to_owned()));
        }

        if let Some(path) = strip_scheme(trimmed, "file://") {
            return Ok(Self::Local(resolve_path(Utf8Path::new(path), base_dir)));
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(CatalogError::malformed(format!(
                "unsupported url scheme \"{scheme}\" in \"{trimmed}\""
            )));
        }

        Ok(Self::Local(resolve_path(Utf8Path::new(trimmed), base_dir)))
    }

    /// Whether the location must be fetched over the network.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The final path segment, used to guess archive formats in messages.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
                .filter(|name| !name.is_empty()),
            Self::Local(path) => path.file_name(),
        }
    }
}

/// Case-insensitively strip a URL scheme prefix.
fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = value.get(..scheme.len())?;
    if prefix.eq_ignore_ascii_case(scheme) {
        value.get(scheme.len()..)
    } else {
        None
    }
}

fn resolve_path(path: &Utf8Path, base_dir: Option<&Utf8Path>) -> Utf8PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_owned(),
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{path}"),
        }
    }
}
