//! Artifact retrieval from local paths and HTTP(S) URLs.
//!
//! Fetchers only ever return bytes in memory. Nothing here writes to the
//! install location; that is the installer's job, after verification.

mod error;
pub mod http;
pub mod local;
mod retry;

pub use error::{FetchError, Result};
pub use retry::{RetryPolicy, RetryingFetcher};

use crate::cancel::CancellationToken;
use crate::catalog::source::SourceLocation;
use http::HttpFetcher;
use std::time::Duration;

/// Retrieves the bytes behind a [`SourceLocation`].
///
/// The seam lets the pipeline be exercised without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactFetcher {
    /// Fetch the complete content at `location`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing why the content could not be
    /// retrieved.
    fn fetch(&self, location: &SourceLocation, cancel: &CancellationToken) -> Result<Vec<u8>>;
}

impl<F: ArtifactFetcher + ?Sized> ArtifactFetcher for &F {
    fn fetch(&self, location: &SourceLocation, cancel: &CancellationToken) -> Result<Vec<u8>> {
        (**self).fetch(location, cancel)
    }
}

/// Dispatches to the filesystem or to HTTP depending on the location.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http: HttpFetcher,
}

impl SourceFetcher {
    /// Create a fetcher whose HTTP requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpFetcher::new(timeout),
        }
    }
}

impl ArtifactFetcher for SourceFetcher {
    fn fetch(&self, location: &SourceLocation, cancel: &CancellationToken) -> Result<Vec<u8>> {
        match location {
            SourceLocation::Remote(url) => self.http.get(url, cancel),
            SourceLocation::Local(path) => local::read_file(path, cancel),
        }
    }
}

/// The production fetcher: source dispatch with retry.
///
/// # Examples
///
/// ```
/// use formula_installer::fetch::{RetryPolicy, default_fetcher};
/// use std::time::Duration;
///
/// let fetcher = default_fetcher(Duration::from_secs(30), RetryPolicy::default());
/// assert_eq!(fetcher.policy().max_attempts(), 3);
/// ```
#[must_use]
pub fn default_fetcher(timeout: Duration, policy: RetryPolicy) -> RetryingFetcher<SourceFetcher> {
    RetryingFetcher::new(SourceFetcher::new(timeout), policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn source_fetcher_reads_local_paths() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("tool")).expect("UTF-8 path");
        std::fs::write(&path, b"#!/bin/sh\n").expect("write");

        let fetcher = SourceFetcher::new(Duration::from_secs(1));
        let bytes = fetcher
            .fetch(&SourceLocation::Local(path), &CancellationToken::new())
            .expect("read local file");
        assert_eq!(bytes, b"#!/bin/sh\n");
    }

    #[test]
    fn missing_local_file_is_not_retried() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("absent")).expect("UTF-8 path");
        let fetcher = default_fetcher(Duration::from_secs(1), RetryPolicy::default());
        let err = fetcher
            .fetch(&SourceLocation::Local(path), &CancellationToken::new())
            .expect_err("expected failure");
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}
