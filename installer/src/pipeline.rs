//! Install pipeline orchestration.
//!
//! The pipeline runs `Resolving → Fetching → Verifying → Installing` exactly
//! once each, in order, and ends in `Done` or `Failed`. No stage is retried
//! at this level (the fetcher retries its own transient failures) and a
//! failed stage never rolls forward into the next one.

use crate::cancel::CancellationToken;
use crate::catalog::Catalog;
use crate::catalog::entry::ArtifactEntry;
use crate::catalog::platform::Platform;
use crate::catalog::source::SourceLocation;
use crate::error::Result;
use crate::fetch::ArtifactFetcher;
use crate::install::{InstalledArtifact, Installer};
use crate::payload::{PayloadFormat, extract_executable};
use crate::resolver::{VersionRequest, resolve};
use crate::verify::verify;
use camino::Utf8Path;
use std::fmt;

/// Where an install request currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// Nothing has happened yet.
    Idle,
    /// Selecting the catalog entry.
    Resolving,
    /// Retrieving the artifact bytes.
    Fetching,
    /// Checking the artifact digest.
    Verifying,
    /// Extracting and placing the executable.
    Installing,
    /// The executable is in place.
    Done,
    /// A stage failed; the payload carries the reason.
    Failed(String),
}

impl InstallState {
    /// Whether `next` may follow `self`.
    ///
    /// Forward steps go one stage at a time; `Failed` is reachable from any
    /// in-progress state; no state is re-entered.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::pipeline::InstallState;
    ///
    /// assert!(InstallState::Fetching.can_advance_to(&InstallState::Verifying));
    /// assert!(!InstallState::Fetching.can_advance_to(&InstallState::Installing));
    /// assert!(InstallState::Verifying.can_advance_to(&InstallState::Failed("bad".into())));
    /// ```
    #[must_use]
    pub fn can_advance_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::Resolving)
            | (Self::Resolving, Self::Fetching)
            | (Self::Fetching, Self::Verifying)
            | (Self::Verifying, Self::Installing)
            | (Self::Installing, Self::Done) => true,
            (Self::Idle | Self::Done | Self::Failed(_), Self::Failed(_)) => false,
            (_, Self::Failed(_)) => true,
            _ => false,
        }
    }

    /// Whether the pipeline has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Resolving => f.write_str("resolving"),
            Self::Fetching => f.write_str("fetching"),
            Self::Verifying => f.write_str("verifying"),
            Self::Installing => f.write_str("installing"),
            Self::Done => f.write_str("done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Tracks the current state and reports each transition to an observer.
struct StateMachine<'o> {
    state: InstallState,
    observer: &'o mut dyn FnMut(&InstallState),
}

impl<'o> StateMachine<'o> {
    fn new(observer: &'o mut dyn FnMut(&InstallState)) -> Self {
        Self {
            state: InstallState::Idle,
            observer,
        }
    }

    fn advance(&mut self, next: InstallState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "illegal transition {} -> {next}",
            self.state
        );
        log::debug!("install state: {} -> {next}", self.state);
        (self.observer)(&next);
        self.state = next;
    }
}

/// What the caller wants installed, for which platform, and where.
#[derive(Debug, Clone, Copy)]
pub struct InstallPlan<'a> {
    /// The version to install.
    pub request: &'a VersionRequest,
    /// The platform whose artifact is selected.
    pub platform: Platform,
    /// Final path of the executable.
    pub target: &'a Utf8Path,
}

/// The result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    entry: ArtifactEntry,
    format: PayloadFormat,
    installed: InstalledArtifact,
}

impl InstallOutcome {
    /// The catalog entry that was installed.
    #[must_use]
    pub const fn entry(&self) -> &ArtifactEntry {
        &self.entry
    }

    /// The container format of the fetched artifact.
    #[must_use]
    pub const fn format(&self) -> PayloadFormat {
        self.format
    }

    /// The file now on disk.
    #[must_use]
    pub const fn installed(&self) -> &InstalledArtifact {
        &self.installed
    }
}

/// Runs install requests against a fetcher and an installer.
pub struct Pipeline<'a, F: ArtifactFetcher + ?Sized> {
    fetcher: &'a F,
    installer: Installer,
    cancel: CancellationToken,
}

impl<'a, F: ArtifactFetcher + ?Sized> Pipeline<'a, F> {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(fetcher: &'a F, installer: Installer, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            installer,
            cancel,
        }
    }

    /// Load the catalog from a manifest location.
    ///
    /// Local manifests are read directly so relative artifact paths resolve
    /// against the manifest's directory. Remote manifests go through the
    /// fetcher (and its retry policy).
    ///
    /// # Errors
    ///
    /// Returns the fetch or catalog error that prevented loading.
    pub fn load_catalog(&self, location: &SourceLocation) -> Result<Catalog> {
        match location {
            SourceLocation::Local(path) => Ok(Catalog::load_file(path)?),
            SourceLocation::Remote(_) => {
                let bytes = self.fetcher.fetch(location, &self.cancel)?;
                Ok(Catalog::from_bytes(&bytes, None)?)
            }
        }
    }

    /// Resolve, fetch, verify and install, reporting each state change.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed. When the failing
    /// stage precedes `Installing`, the target path has not been touched.
    pub fn run(
        &self,
        catalog: &Catalog,
        plan: &InstallPlan<'_>,
        observer: &mut dyn FnMut(&InstallState),
    ) -> Result<InstallOutcome> {
        let mut machine = StateMachine::new(observer);
        let result = self.drive(catalog, plan, &mut machine);
        match &result {
            Ok(_) => machine.advance(InstallState::Done),
            Err(err) => machine.advance(InstallState::Failed(err.to_string())),
        }
        result
    }

    fn drive(
        &self,
        catalog: &Catalog,
        plan: &InstallPlan<'_>,
        machine: &mut StateMachine<'_>,
    ) -> Result<InstallOutcome> {
        machine.advance(InstallState::Resolving);
        let target = resolve(catalog, plan.request, plan.platform)?;
        let entry = target.entry();

        machine.advance(InstallState::Fetching);
        let bytes = self.fetcher.fetch(entry.source(), &self.cancel)?;

        machine.advance(InstallState::Verifying);
        verify(&bytes, entry.digest()).inspect_err(|_| {
            log::error!(
                "refusing to install {} {} for {}: {} failed verification",
                catalog.name(),
                entry.version(),
                entry.platform(),
                entry.source()
            );
        })?;

        machine.advance(InstallState::Installing);
        let format = PayloadFormat::detect(&bytes);
        let executable = extract_executable(&bytes, target.binary())?;
        let installed = self
            .installer
            .install(&executable, plan.target, &self.cancel)?;

        Ok(InstallOutcome {
            entry: entry.clone(),
            format,
            installed,
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
