//! Manifest deserialization for catalog construction.
//!
//! The manifest is TOML. Every field is deserialized as optional first so a
//! missing field can be reported with the entry position and field name,
//! rather than serde's generic "missing field" message; newtype validation
//! then runs field by field. Unknown keys are rejected so a misspelt field
//! fails at load instead of silently taking its default.

use super::entry::ArtifactEntry;
use super::error::{CatalogError, Result};
use super::sha256_digest::Sha256Digest;
use super::source::SourceLocation;
use camino::Utf8Path;
use serde::Deserialize;

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: Option<String>,
    binary: Option<String>,
    artifacts: Option<Vec<RawArtifact>>,
}

/// One `[[artifacts]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtifact {
    version: Option<String>,
    os: Option<String>,
    arch: Option<String>,
    url: Option<String>,
    sha256: Option<String>,
}

/// A parsed manifest whose entries have been validated individually.
///
/// Uniqueness across entries is checked when the manifest becomes a
/// [`Catalog`](super::Catalog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    /// Name of the packaged tool.
    pub name: String,
    /// Relative path of the executable inside archive artifacts.
    pub binary: String,
    /// Validated entries in manifest order.
    pub entries: Vec<ArtifactEntry>,
}

/// Parse manifest TOML into validated entries.
///
/// Relative artifact paths are resolved against `base_dir`. When `base_dir`
/// is `None` (a manifest fetched from a URL) relative paths are rejected.
///
/// # Errors
///
/// Returns [`CatalogError::MalformedManifest`] if the TOML is invalid or any
/// entry lacks a required field or fails validation.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::manifest_parser::parse_manifest;
///
/// let toml = concat!(
///     "name = \"guilde-cli\"\n",
///     "[[artifacts]]\n",
///     "version = \"0.44.0\"\n",
///     "os = \"macos\"\n",
///     "arch = \"arm64\"\n",
///     "url = \"https://example.test/x.zip\"\n",
///     "sha256 = \"", "deadbeef", "deadbeef", "deadbeef", "deadbeef",
///     "deadbeef", "deadbeef", "deadbeef", "deadbeef", "\"\n",
/// );
/// let manifest = parse_manifest(toml, None).expect("valid manifest");
/// assert_eq!(manifest.binary, "guilde-cli");
/// assert_eq!(manifest.entries.len(), 1);
/// ```
pub fn parse_manifest(text: &str, base_dir: Option<&Utf8Path>) -> Result<ParsedManifest> {
    let raw: RawManifest = toml::from_str(text)
        .map_err(|e| CatalogError::malformed(format!("invalid TOML: {}", e.message())))?;

    let name = non_empty(raw.name, "manifest", "name")?;
    let binary = match raw.binary {
        Some(binary) if binary.trim().is_empty() => {
            return Err(CatalogError::malformed("manifest field \"binary\" is empty"));
        }
        Some(binary) => binary,
        None => name.clone(),
    };
    let artifacts = raw
        .artifacts
        .ok_or_else(|| CatalogError::malformed("manifest is missing the [[artifacts]] list"))?;

    let entries = artifacts
        .into_iter()
        .enumerate()
        .map(|(index, artifact)| parse_entry(index, artifact, base_dir))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedManifest {
        name,
        binary,
        entries,
    })
}

fn parse_entry(
    index: usize,
    raw: RawArtifact,
    base_dir: Option<&Utf8Path>,
) -> Result<ArtifactEntry> {
    let context = format!("artifact #{index}");
    let version_text = non_empty(raw.version, &context, "version")?;
    let os_text = non_empty(raw.os, &context, "os")?;
    let arch_text = non_empty(raw.arch, &context, "arch")?;
    let url_text = non_empty(raw.url, &context, "url")?;
    let digest_text = non_empty(raw.sha256, &context, "sha256")?;

    let version = semver::Version::parse(version_text.trim().trim_start_matches('v'))
        .map_err(|e| {
            CatalogError::malformed(format!("{context}: invalid version \"{version_text}\": {e}"))
        })?;
    let os = os_text.parse().map_err(|e| prefix(&context, &e))?;
    let arch = arch_text.parse().map_err(|e| prefix(&context, &e))?;
    let source = SourceLocation::parse(&url_text, base_dir).map_err(|e| prefix(&context, &e))?;
    if let SourceLocation::Local(path) = &source {
        if base_dir.is_none() && path.is_relative() {
            return Err(CatalogError::malformed(format!(
                "{context}: relative url \"{url_text}\" needs a manifest on the local filesystem"
            )));
        }
    }
    let digest = Sha256Digest::try_from(digest_text.trim()).map_err(|e| prefix(&context, &e))?;

    Ok(ArtifactEntry::new(
        version,
        super::platform::Platform::new(os, arch),
        source,
        digest,
    ))
}

/// Require a present, non-blank field.
fn non_empty(value: Option<String>, context: &str, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(CatalogError::malformed(format!(
            "{context}: field \"{field}\" is empty"
        ))),
        None => Err(CatalogError::malformed(format!(
            "{context}: missing required field \"{field}\""
        ))),
    }
}

/// Re-wrap a validation error with the entry position.
fn prefix(context: &str, err: &CatalogError) -> CatalogError {
    match err {
        CatalogError::MalformedManifest { reason } => {
            CatalogError::malformed(format!("{context}: {reason}"))
        }
        other => other.clone(),
    }
}
