//! Error types for fetch operations.

use thiserror::Error;

/// Errors arising while retrieving artifact or manifest bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("timed out after {seconds}s fetching {location}")]
    Timeout {
        /// The location being fetched.
        location: String,
        /// The timeout that elapsed, in whole seconds.
        seconds: u64,
    },

    /// The server returned HTTP 404, or the local file does not exist.
    #[error("artifact not found: {location}")]
    NotFound {
        /// The missing location.
        location: String,
    },

    /// Connection-level failure or a 5xx server response.
    #[error("transport error fetching {location}: {reason}")]
    Transport {
        /// The location being fetched.
        location: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server rejected the request with a 4xx status other than 404.
    #[error("server refused {location} with HTTP {status}")]
    ClientStatus {
        /// The location being fetched.
        location: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The fetch was cancelled before it completed.
    #[error("fetch of {location} was cancelled")]
    Cancelled {
        /// The location being fetched.
        location: String,
    },

    /// A local file exists but could not be read.
    #[error("failed to read {location}: {source}")]
    Io {
        /// The local path.
        location: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Whether another attempt may succeed.
    ///
    /// Only timeouts and transport failures are transient. Client errors,
    /// missing artifacts and cancellation are surfaced immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::fetch::FetchError;
    ///
    /// let err = FetchError::NotFound { location: "https://example.test/x".to_owned() };
    /// assert!(!err.is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
