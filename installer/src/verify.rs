//! Integrity verification of fetched artifact bytes.
//!
//! Verification fails closed: a mismatch is terminal and the installer is
//! never reached.

use crate::catalog::sha256_digest::Sha256Digest;
use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::io::Read;
use thiserror::Error;

/// Errors arising from integrity verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    /// The SHA-256 of the fetched bytes differs from the catalog digest.
    #[error("integrity check failed: expected sha256 {expected}, got {actual}")]
    Mismatch {
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the bytes actually fetched.
        actual: Sha256Digest,
    },
}

/// Check `bytes` against `expected`, returning the computed digest.
///
/// The digest covers exactly the bytes passed in, never a decoded or
/// extracted form of them.
///
/// # Errors
///
/// Returns [`IntegrityError::Mismatch`] when the digests differ.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::sha256_digest::Sha256Digest;
/// use formula_installer::verify::verify;
///
/// let expected = Sha256Digest::of_bytes(b"payload");
/// assert!(verify(b"payload", &expected).is_ok());
/// assert!(verify(b"tampered", &expected).is_err());
/// ```
pub fn verify(bytes: &[u8], expected: &Sha256Digest) -> Result<Sha256Digest, IntegrityError> {
    let actual = Sha256Digest::of_bytes(bytes);
    if actual != *expected {
        log::error!(
            "sha256 mismatch over {} bytes: expected {expected}, got {actual}",
            bytes.len()
        );
        return Err(IntegrityError::Mismatch {
            expected: expected.clone(),
            actual,
        });
    }
    log::debug!("sha256 verified: {actual}");
    Ok(actual)
}

/// Compute the SHA-256 of a local file, streaming it in chunks.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn digest_file(path: &Utf8Path) -> std::io::Result<Sha256Digest> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest::from_hasher(hasher))
}
