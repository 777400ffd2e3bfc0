//! Output formatting for the installer CLI.
//!
//! Command results (catalog listings, resolved entries, digests) are
//! formatted here as human-readable text or JSON; `main` decides where they
//! go. Progress and diagnostics use [`write_stderr_line`].

use crate::catalog::Catalog;
use crate::catalog::entry::ArtifactEntry;
use crate::catalog::platform::Platform;
use crate::catalog::sha256_digest::Sha256Digest;
use crate::pipeline::InstallOutcome;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; nothing useful can be done on failure.
    }
}

/// Format catalog entries as an aligned text table.
///
/// When `only` is set, entries for other platforms are omitted. Entries are
/// listed newest version first.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::Catalog;
/// use formula_installer::output::format_catalog_human;
///
/// let catalog = Catalog::new("guilde-cli", "guilde-cli", Vec::new()).expect("empty catalog");
/// assert!(format_catalog_human(&catalog, None).contains("No artifacts"));
/// ```
#[must_use]
pub fn format_catalog_human(catalog: &Catalog, only: Option<Platform>) -> String {
    let entries = sorted_entries(catalog, only);
    if entries.is_empty() {
        return match only {
            Some(platform) => format!("No artifacts for {} on {platform}.", catalog.name()),
            None => format!("No artifacts published for {}.", catalog.name()),
        };
    }

    let width = entries
        .iter()
        .map(|entry| entry.version().to_string().len())
        .max()
        .unwrap_or_default();
    let mut output = format!("{} artifacts:\n", catalog.name());
    for entry in entries {
        let _ = writeln!(
            output,
            "  {:<width$}  {:<12}  {}",
            entry.version().to_string(),
            entry.platform().to_string(),
            entry.source()
        );
    }
    output
}

/// Format catalog entries as pretty-printed JSON.
#[must_use]
pub fn format_catalog_json(catalog: &Catalog, only: Option<Platform>) -> String {
    let listing = CatalogJson {
        name: catalog.name(),
        binary: catalog.binary(),
        artifacts: sorted_entries(catalog, only),
    };
    serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON representation of a catalog listing.
#[derive(Debug, Serialize)]
struct CatalogJson<'a> {
    name: &'a str,
    binary: &'a str,
    artifacts: Vec<&'a ArtifactEntry>,
}

fn sorted_entries(catalog: &Catalog, only: Option<Platform>) -> Vec<&ArtifactEntry> {
    let mut entries: Vec<&ArtifactEntry> = catalog
        .entries()
        .iter()
        .filter(|entry| only.is_none_or(|platform| entry.platform() == platform))
        .collect();
    entries.sort_by(|a, b| {
        b.version()
            .cmp(a.version())
            .then_with(|| a.platform().cmp(&b.platform()))
    });
    entries
}

/// Describe a resolved entry without fetching it.
#[must_use]
pub fn format_resolved_human(entry: &ArtifactEntry, target: &Utf8Path) -> String {
    format!(
        concat!(
            "version:  {}\n",
            "platform: {}\n",
            "source:   {}\n",
            "sha256:   {}\n",
            "target:   {}",
        ),
        entry.version(),
        entry.platform(),
        entry.source(),
        entry.digest(),
        target
    )
}

/// JSON form of [`format_resolved_human`].
#[must_use]
pub fn format_resolved_json(entry: &ArtifactEntry, target: &Utf8Path) -> String {
    let resolved = ResolvedJson { entry, target };
    serde_json::to_string_pretty(&resolved).unwrap_or_else(|_| "{}".to_owned())
}

#[derive(Debug, Serialize)]
struct ResolvedJson<'a> {
    #[serde(flatten)]
    entry: &'a ArtifactEntry,
    target: &'a Utf8Path,
}

/// Success message after an install, with the smoke-test hint.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use formula_installer::output::success_message;
///
/// let text = success_message("guilde-cli", "0.44.0", Utf8Path::new("/home/u/.local/bin/guilde-cli"));
/// assert!(text.contains("guilde-cli --version"));
/// ```
#[must_use]
pub fn success_message(name: &str, version: &str, path: &Utf8Path) -> String {
    format!("Installed {name} {version} to {path}\n\nVerify with: {path} --version")
}

/// Success message for an [`InstallOutcome`].
#[must_use]
pub fn outcome_message(name: &str, outcome: &InstallOutcome) -> String {
    success_message(
        name,
        &outcome.entry().version().to_string(),
        outcome.installed().path(),
    )
}

/// One `sha256sum`-style line.
#[must_use]
pub fn digest_line(digest: &Sha256Digest, path: &Utf8Path) -> String {
    format!("{digest}  {path}")
}

/// Report the orphaned temporary files removed by `clean`.
#[must_use]
pub fn clean_report(dir: &Utf8Path, removed: &[Utf8PathBuf]) -> String {
    if removed.is_empty() {
        return format!("No leftover temporary files in {dir}.");
    }
    let mut output = format!("Removed {} temporary file(s) from {dir}:", removed.len());
    for path in removed {
        let _ = write!(output, "\n  {path}");
    }
    output
}
