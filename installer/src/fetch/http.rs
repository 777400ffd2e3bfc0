//! HTTP(S) retrieval using `ureq`.

use super::error::{FetchError, Result};
use crate::cancel::CancellationToken;
use std::io::Read;
use std::time::Duration;

const CHUNK_SIZE: usize = 64 * 1024;

/// Blocking HTTP client with a per-request timeout.
///
/// The timeout bounds the whole request, including reading the body.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a client whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }

    /// A client that ignores proxy environment variables, for loopback tests.
    #[cfg(test)]
    fn direct(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .proxy(None)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Download `url` into memory, polling `cancel` between chunks.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] for HTTP 404,
    /// [`FetchError::ClientStatus`] for other 4xx responses,
    /// [`FetchError::Timeout`] when the timeout elapses,
    /// [`FetchError::Cancelled`] when `cancel` fires, and
    /// [`FetchError::Transport`] for everything else.
    pub fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| self.map_ureq_error(url, &e))?;
        let mut body = response.into_body();
        let mut reader = body.as_reader();

        let mut bytes = Vec::new();
        let mut chunk = vec![0_u8; CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    location: url.to_owned(),
                });
            }
            let read = reader
                .read(&mut chunk)
                .map_err(|e| self.map_io_error(url, &e))?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(chunk.get(..read).unwrap_or_default());
        }

        log::debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(bytes)
    }

    fn map_ureq_error(&self, url: &str, err: &ureq::Error) -> FetchError {
        match err {
            ureq::Error::StatusCode(404) => FetchError::NotFound {
                location: url.to_owned(),
            },
            ureq::Error::StatusCode(status) if (400..500).contains(status) => {
                FetchError::ClientStatus {
                    location: url.to_owned(),
                    status: *status,
                }
            }
            ureq::Error::StatusCode(status) => FetchError::Transport {
                location: url.to_owned(),
                reason: format!("server responded with HTTP {status}"),
            },
            ureq::Error::Timeout(_) => self.timed_out(url),
            ureq::Error::Io(io) => self.map_io_error(url, io),
            other => FetchError::Transport {
                location: url.to_owned(),
                reason: other.to_string(),
            },
        }
    }

    fn map_io_error(&self, url: &str, err: &std::io::Error) -> FetchError {
        if err.kind() == std::io::ErrorKind::TimedOut {
            return self.timed_out(url);
        }
        FetchError::Transport {
            location: url.to_owned(),
            reason: err.to_string(),
        }
    }

    fn timed_out(&self, url: &str) -> FetchError {
        FetchError::Timeout {
            location: url.to_owned(),
            seconds: self.timeout.as_secs(),
        }
    }
}
