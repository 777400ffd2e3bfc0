//! Formula installer library.
//!
//! This crate resolves a release manifest to the one artifact built for the
//! host platform, fetches it, verifies its SHA-256 digest and atomically
//! installs the executable. It is used by the `formula-installer` CLI binary
//! and can be consumed programmatically by tools that ship their own
//! manifests.
//!
//! Data flows in one direction:
//!
//! ```text
//! Catalog -> Resolver -> Fetcher -> Verifier -> Installer
//! ```
//!
//! # Modules
//!
//! - [`cancel`] - Cooperative cancellation token
//! - [`catalog`] - Manifest loading and artifact lookup
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered configuration file and overrides
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Unified error type and exit codes
//! - [`fetch`] - Artifact retrieval over HTTP(S) or from local paths
//! - [`install`] - Atomic placement of the executable
//! - [`output`] - Text and JSON formatting for command results
//! - [`payload`] - Executable extraction from archive artifacts
//! - [`pipeline`] - Install state machine and stage orchestration
//! - [`resolver`] - Platform and version resolution
//! - [`verify`] - SHA-256 integrity verification

pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod install;
pub mod output;
pub mod payload;
pub mod pipeline;
pub mod resolver;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
