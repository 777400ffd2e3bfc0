//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, with the `test-support` feature, to the
//! behaviour suites under `tests/`.

use crate::cancel::CancellationToken;
use crate::catalog::sha256_digest::Sha256Digest;
use crate::catalog::source::SourceLocation;
use crate::fetch::{ArtifactFetcher, FetchError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;

/// A canned response served by [`StubFetcher`].
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// Serve these bytes.
    Bytes(Vec<u8>),
    /// Fail as if the server answered 404.
    NotFound,
    /// Fail with a transient transport error.
    Unreachable,
}

/// An [`ArtifactFetcher`] that serves canned responses per location.
///
/// Locations without a registered response behave like a 404. Every call is
/// recorded so tests can assert what was (and was not) fetched.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<SourceLocation, StubResponse>,
    calls: RefCell<Vec<SourceLocation>>,
}

impl StubFetcher {
    /// Create a fetcher with no registered responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `response` for `location`, replacing any previous one.
    pub fn serve(&mut self, location: SourceLocation, response: StubResponse) {
        self.responses.insert(location, response);
    }

    /// Locations fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<SourceLocation> {
        self.calls.borrow().clone()
    }
}

impl ArtifactFetcher for StubFetcher {
    fn fetch(&self, location: &SourceLocation, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.calls.borrow_mut().push(location.clone());
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                location: location.to_string(),
            });
        }
        match self.responses.get(location) {
            Some(StubResponse::Bytes(bytes)) => Ok(bytes.clone()),
            Some(StubResponse::Unreachable) => Err(FetchError::Transport {
                location: location.to_string(),
                reason: "connection refused".to_owned(),
            }),
            Some(StubResponse::NotFound) | None => Err(FetchError::NotFound {
                location: location.to_string(),
            }),
        }
    }
}

/// Builds manifest TOML for fixtures.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::Catalog;
/// use formula_installer::test_utils::ManifestBuilder;
///
/// let toml = ManifestBuilder::new("guilde-cli")
///     .artifact("0.44.0", "macos", "arm64", "https://example.test/a.zip", b"zip")
///     .build();
/// let catalog = Catalog::parse(&toml, None).expect("valid manifest");
/// assert_eq!(catalog.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    binary: Option<String>,
    artifacts: Vec<String>,
}

impl ManifestBuilder {
    /// Start a manifest for the tool `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            binary: None,
            artifacts: Vec::new(),
        }
    }

    /// Set the archive member path of the executable.
    #[must_use]
    pub fn binary(mut self, binary: &str) -> Self {
        self.binary = Some(binary.to_owned());
        self
    }

    /// Add an artifact whose digest is computed from `content`.
    #[must_use]
    pub fn artifact(self, version: &str, os: &str, arch: &str, url: &str, content: &[u8]) -> Self {
        let digest = Sha256Digest::of_bytes(content);
        self.artifact_with_digest(version, os, arch, url, digest.as_str())
    }

    /// Add an artifact with an explicit `sha256` value.
    #[must_use]
    pub fn artifact_with_digest(
        mut self,
        version: &str,
        os: &str,
        arch: &str,
        url: &str,
        sha256: &str,
    ) -> Self {
        self.artifacts.push(format!(
            "[[artifacts]]\nversion = \"{version}\"\nos = \"{os}\"\narch = \"{arch}\"\n\
             url = \"{url}\"\nsha256 = \"{sha256}\"\n"
        ));
        self
    }

    /// Render the manifest text.
    #[must_use]
    pub fn build(&self) -> String {
        let mut text = format!("name = \"{}\"\n", self.name);
        if let Some(binary) = &self.binary {
            let _ = writeln!(text, "binary = \"{binary}\"");
        }
        for artifact in &self.artifacts {
            text.push('\n');
            text.push_str(artifact);
        }
        text
    }
}

/// Build a gzip-compressed tarball holding `members` as regular files.
///
/// # Panics
///
/// Panics if writing to the in-memory archive fails.
#[must_use]
pub fn tar_gz(members: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        if let Err(err) = builder.append_data(&mut header, path, *content) {
            panic!("append {path}: {err}");
        }
    }
    match builder.into_inner().and_then(flate2::write::GzEncoder::finish) {
        Ok(bytes) => bytes,
        Err(err) => panic!("finish tarball: {err}"),
    }
}
