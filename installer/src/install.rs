//! Atomic placement of a verified executable.
//!
//! The payload is written to a temporary file in the target's own
//! directory, flushed to disk, given its permission bits, and only then
//! renamed over the target. A reader of the target path therefore sees the
//! previous file or the new one, never a partial write. An interrupted
//! install leaves at worst a temporary file whose name starts with
//! [`TEMP_PREFIX`]; [`sweep_orphans`] removes those.

use crate::cancel::CancellationToken;
use crate::catalog::sha256_digest::Sha256Digest;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use thiserror::Error;

/// File-name prefix of in-flight temporary files.
pub const TEMP_PREFIX: &str = ".formula-installer-";

/// Permission bits applied when none are configured.
pub const DEFAULT_MODE: u32 = 0o755;

/// Owner execute permission, always present on an installed file.
pub const OWNER_EXECUTE: u32 = 0o100;

const CHUNK_SIZE: usize = 64 * 1024;

/// Errors arising while placing the payload.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The process may not write to the target directory.
    #[error("permission denied writing {path}: {source}")]
    PermissionDenied {
        /// The path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The filesystem holding the target is full or over quota.
    #[error("no space left writing {path}: {source}")]
    DiskFull {
        /// The path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The target path cannot hold an executable.
    #[error("invalid install target {path}: {reason}")]
    InvalidTarget {
        /// The rejected path.
        path: Utf8PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The install was cancelled before the rename.
    #[error("install to {path} was cancelled; the previous file is unchanged")]
    Cancelled {
        /// The target path.
        path: Utf8PathBuf,
    },

    /// Any other I/O failure.
    #[error("failed to install {path}: {source}")]
    Io {
        /// The path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    /// Classify an I/O error raised while writing `path`.
    #[must_use]
    pub fn from_io(path: &Utf8Path, source: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let path = path.to_owned();
        match source.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            ErrorKind::StorageFull | ErrorKind::QuotaExceeded => Self::DiskFull { path, source },
            _ => Self::Io { path, source },
        }
    }
}

/// Result type for install operations.
pub type Result<T> = std::result::Result<T, InstallError>;

/// The on-disk result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledArtifact {
    path: Utf8PathBuf,
    mode: u32,
    digest: Sha256Digest,
    install_root: Utf8PathBuf,
}

impl InstalledArtifact {
    /// Where the executable now lives.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Permission bits applied to the file.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// SHA-256 of the installed file's content.
    #[must_use]
    pub const fn digest(&self) -> &Sha256Digest {
        &self.digest
    }

    /// The directory that owns the installed file.
    #[must_use]
    pub fn install_root(&self) -> &Utf8Path {
        &self.install_root
    }
}

/// Places payloads at a target path with fixed permission bits.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use formula_installer::cancel::CancellationToken;
/// use formula_installer::install::Installer;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let target = Utf8PathBuf::try_from(dir.path().join("tool")).expect("UTF-8 path");
/// let installed = Installer::new(0o755)
///     .install(b"#!/bin/sh\n", &target, &CancellationToken::new())
///     .expect("install");
/// assert_eq!(installed.path(), target);
/// assert_eq!(std::fs::read(&target).expect("read back"), b"#!/bin/sh\n");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installer {
    mode: u32,
}

impl Default for Installer {
    fn default() -> Self {
        Self::new(DEFAULT_MODE)
    }
}

impl Installer {
    /// Create an installer applying `mode` to installed files.
    ///
    /// [`OWNER_EXECUTE`] is added when `mode` lacks it.
    #[must_use]
    pub const fn new(mode: u32) -> Self {
        Self {
            mode: mode | OWNER_EXECUTE,
        }
    }

    /// The permission bits this installer applies.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Atomically replace `target` with `payload`.
    ///
    /// Missing parent directories are created. An existing symlink at
    /// `target` is replaced by the file, not followed.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::PermissionDenied`] or
    /// [`InstallError::DiskFull`] unchanged from the filesystem,
    /// [`InstallError::Cancelled`] when `cancel` fires before the rename,
    /// [`InstallError::InvalidTarget`] for directory targets, and
    /// [`InstallError::Io`] otherwise. On every error the previous file at
    /// `target`, if any, is left untouched.
    pub fn install(
        &self,
        payload: &[u8],
        target: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<InstalledArtifact> {
        let staged = self.stage(payload, target, cancel)?;
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled {
                path: target.to_owned(),
            });
        }
        commit(staged, target)?;

        let install_root = install_root(target);
        log::debug!("installed {} bytes to {target}", payload.len());
        Ok(InstalledArtifact {
            path: target.to_owned(),
            mode: self.mode,
            digest: Sha256Digest::of_bytes(payload),
            install_root,
        })
    }

    /// Write `payload` to a durable temporary file next to `target`.
    ///
    /// Dropping the returned file without committing it deletes it.
    fn stage(
        &self,
        payload: &[u8],
        target: &Utf8Path,
        cancel: &CancellationToken,
    ) -> Result<NamedTempFile> {
        if target.file_name().is_none() {
            return Err(InstallError::InvalidTarget {
                path: target.to_owned(),
                reason: "path has no file name".to_owned(),
            });
        }
        if target.is_dir() {
            return Err(InstallError::InvalidTarget {
                path: target.to_owned(),
                reason: "path is a directory".to_owned(),
            });
        }

        let root = install_root(target);
        fs::create_dir_all(&root).map_err(|e| InstallError::from_io(&root, e))?;
        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&root)
            .map_err(|e| InstallError::from_io(&root, e))?;
        log::trace!("staging {target} via {}", staged.path().display());

        for chunk in payload.chunks(CHUNK_SIZE) {
            if cancel.is_cancelled() {
                return Err(InstallError::Cancelled {
                    path: target.to_owned(),
                });
            }
            staged
                .write_all(chunk)
                .map_err(|e| InstallError::from_io(target, e))?;
        }
        staged
            .flush()
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| InstallError::from_io(target, e))?;
        set_mode(staged.as_file(), self.mode).map_err(|e| InstallError::from_io(target, e))?;
        Ok(staged)
    }
}

/// Rename a staged file over `target` and make the rename durable.
fn commit(staged: NamedTempFile, target: &Utf8Path) -> Result<()> {
    staged
        .persist(target)
        .map_err(|e| InstallError::from_io(target, e.error))?;
    sync_dir(&install_root(target));
    Ok(())
}

fn install_root(target: &Utf8Path) -> Utf8PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    }
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Utf8Path) {
    if let Err(e) = fs::File::open(dir).and_then(|handle| handle.sync_all()) {
        log::debug!("could not sync directory {dir}: {e}");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Utf8Path) {}

/// Remove temporary files left in `dir` by interrupted installs.
///
/// Only regular files whose names start with [`TEMP_PREFIX`] and whose last
/// modification is at least `older_than` ago are removed, so an install
/// running concurrently keeps its staging file.
///
/// # Errors
///
/// Returns an [`InstallError`] if the directory cannot be listed or a file
/// cannot be removed. A missing directory has nothing to clean.
pub fn sweep_orphans(dir: &Utf8Path, older_than: Duration) -> Result<Vec<Utf8PathBuf>> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InstallError::from_io(dir, e)),
    };

    let now = SystemTime::now();
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InstallError::from_io(dir, e))?;
        if !entry.file_name().starts_with(TEMP_PREFIX) {
            continue;
        }
        let metadata = entry
            .metadata()
            .map_err(|e| InstallError::from_io(entry.path(), e))?;
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if !metadata.is_file() || age < older_than {
            continue;
        }
        fs::remove_file(entry.path()).map_err(|e| InstallError::from_io(entry.path(), e))?;
        log::debug!("removed orphaned temporary file {}", entry.path());
        removed.push(entry.path().to_owned());
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
