//! Reads artifacts from the local filesystem.

use super::error::{FetchError, Result};
use crate::cancel::CancellationToken;
use camino::Utf8Path;
use std::io::Read;

const CHUNK_SIZE: usize = 64 * 1024;

/// Read a local file into memory, polling `cancel` between chunks.
///
/// # Errors
///
/// Returns [`FetchError::NotFound`] when the file does not exist,
/// [`FetchError::Cancelled`] when `cancel` fires mid-read, or
/// [`FetchError::Io`] for any other read failure.
pub fn read_file(path: &Utf8Path, cancel: &CancellationToken) -> Result<Vec<u8>> {
    let io_error = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::NotFound {
            FetchError::NotFound {
                location: path.to_string(),
            }
        } else {
            FetchError::Io {
                location: path.to_string(),
                source,
            }
        }
    };

    let mut file = std::fs::File::open(path).map_err(io_error)?;
    let mut bytes = Vec::new();
    let mut chunk = vec![0_u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                location: path.to_string(),
            });
        }
        let read = file.read(&mut chunk).map_err(io_error)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }

    log::trace!("read {} bytes from {path}", bytes.len());
    Ok(bytes)
}
