//! Payload extraction: turning verified artifact bytes into the executable.
//!
//! Release artifacts are either a bare executable or an archive holding it.
//! Archives are recognised by magic bytes and only the configured member is
//! taken out. Extraction happens in memory; nothing is unpacked to disk.

use flate2::read::GzDecoder;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";

/// Container format of a fetched artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// A gzip-compressed tarball.
    TarGz,
    /// A zstd-compressed tarball.
    TarZst,
    /// A zip archive.
    Zip,
    /// Anything else, installed verbatim.
    Raw,
}

impl PayloadFormat {
    /// Identify the format from leading magic bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::payload::PayloadFormat;
    ///
    /// assert_eq!(PayloadFormat::detect(&[0x1f, 0x8b, 0x08]), PayloadFormat::TarGz);
    /// assert_eq!(PayloadFormat::detect(b"\x7fELF"), PayloadFormat::Raw);
    /// ```
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(GZIP_MAGIC) {
            Self::TarGz
        } else if bytes.starts_with(ZSTD_MAGIC) {
            Self::TarZst
        } else if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(ZIP_EMPTY_MAGIC) {
            Self::Zip
        } else {
            Self::Raw
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
            Self::Raw => "raw binary",
        })
    }
}

/// Errors arising from payload extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The artifact is empty.
    #[error("artifact is empty")]
    Empty,

    /// The archive does not contain the configured executable.
    #[error("{format} archive does not contain \"{member}\"")]
    MemberNotFound {
        /// The member that was looked for.
        member: String,
        /// The archive format.
        format: PayloadFormat,
    },

    /// Several members share the executable's file name and none matches
    /// the full path.
    #[error("\"{member}\" is ambiguous in the archive: {candidates}")]
    AmbiguousMember {
        /// The member that was looked for.
        member: String,
        /// Comma-separated paths of the matching members.
        candidates: String,
    },

    /// An archive entry would escape the extraction root.
    #[error("archive entry \"{path}\" escapes the archive root")]
    PathTraversal {
        /// The offending entry path.
        path: String,
    },

    /// The archive could not be decoded.
    #[error("corrupt {format} archive: {reason}")]
    Corrupt {
        /// The archive format.
        format: PayloadFormat,
        /// Decoder diagnostic.
        reason: String,
    },
}

/// Extract the executable named `member` from verified artifact bytes.
///
/// Raw artifacts are returned unchanged. Archive members are matched first
/// by their full relative path (ignoring a leading `./`), then by file name
/// when exactly one member has that name.
///
/// # Errors
///
/// Returns a [`PayloadError`] when the bytes are empty, the archive is
/// corrupt, an entry escapes the archive root, or the member is missing or
/// ambiguous.
///
/// # Examples
///
/// ```
/// use formula_installer::payload::extract_executable;
///
/// let raw = extract_executable(b"#!/bin/sh\necho hi\n", "tool").expect("raw payload");
/// assert_eq!(raw, b"#!/bin/sh\necho hi\n");
/// ```
pub fn extract_executable(bytes: &[u8], member: &str) -> Result<Vec<u8>, PayloadError> {
    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }

    let format = PayloadFormat::detect(bytes);
    log::debug!("artifact format: {format}");
    let mut matcher = MemberMatcher::new(member, format);
    match format {
        PayloadFormat::Raw => return Ok(bytes.to_vec()),
        PayloadFormat::TarGz => scan_tar(GzDecoder::new(bytes), &mut matcher)?,
        PayloadFormat::TarZst => {
            let decoder = zstd::Decoder::new(bytes).map_err(|e| corrupt(format, &e))?;
            scan_tar(decoder, &mut matcher)?;
        }
        PayloadFormat::Zip => scan_zip(bytes, &mut matcher)?,
    }
    matcher.finish()
}

/// Tracks exact and file-name matches while walking an archive.
struct MemberMatcher {
    member: String,
    wanted: PathBuf,
    format: PayloadFormat,
    exact: Option<Vec<u8>>,
    by_name: Vec<(String, Vec<u8>)>,
}

impl MemberMatcher {
    fn new(member: &str, format: PayloadFormat) -> Self {
        Self {
            member: member.to_owned(),
            wanted: normalise(Path::new(member)),
            format,
            exact: None,
            by_name: Vec::new(),
        }
    }

    fn wants(&self, path: &Path) -> bool {
        self.exact.is_none()
            && (normalise(path) == self.wanted || path.file_name() == self.wanted.file_name())
    }

    fn offer(&mut self, path: &Path, content: Vec<u8>) {
        if normalise(path) == self.wanted {
            self.exact = Some(content);
        } else {
            self.by_name.push((path.display().to_string(), content));
        }
    }

    fn finish(self) -> Result<Vec<u8>, PayloadError> {
        if let Some(content) = self.exact {
            return Ok(content);
        }
        let mut by_name = self.by_name;
        match by_name.len() {
            0 => Err(PayloadError::MemberNotFound {
                member: self.member,
                format: self.format,
            }),
            1 => Ok(by_name.pop().map(|(_, content)| content).unwrap_or_default()),
            _ => Err(PayloadError::AmbiguousMember {
                member: self.member,
                candidates: by_name
                    .iter()
                    .map(|(path, _)| path.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

fn scan_tar<R: Read>(reader: R, matcher: &mut MemberMatcher) -> Result<(), PayloadError> {
    let format = matcher.format;
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| corrupt(format, &e))?;
    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| corrupt(format, &e))?;
        let path = entry.path().map_err(|e| corrupt(format, &e))?.into_owned();
        validate_entry_path(&path)?;
        if !entry.header().entry_type().is_file() || !matcher.wants(&path) {
            continue;
        }
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| corrupt(format, &e))?;
        matcher.offer(&path, content);
    }
    Ok(())
}

fn scan_zip(bytes: &[u8], matcher: &mut MemberMatcher) -> Result<(), PayloadError> {
    let format = matcher.format;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(format, &e))?;
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(|e| corrupt(format, &e))?;
        let Some(path) = file.enclosed_name() else {
            return Err(PayloadError::PathTraversal {
                path: file.name().to_owned(),
            });
        };
        if !file.is_file() || !matcher.wants(&path) {
            continue;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| corrupt(format, &e))?;
        matcher.offer(&path, content);
    }
    Ok(())
}

/// Reject absolute entry paths and `..` components.
fn validate_entry_path(path: &Path) -> Result<(), PayloadError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(PayloadError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn normalise(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn corrupt(format: PayloadFormat, err: &dyn fmt::Display) -> PayloadError {
    PayloadError::Corrupt {
        format,
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
