//! CLI argument definitions for the formula installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::catalog::platform::{Arch, Os, Platform};
use crate::config::Overrides;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Resolve, fetch, verify, and install release binaries from a manifest.
#[derive(Parser, Debug)]
#[command(name = "formula-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Resolve, fetch, verify, and install release binaries from a manifest.\n\n",
    "A manifest lists one artifact per version and platform, each with a URL ",
    "(or local path) and the SHA-256 of its bytes. The installer picks the ",
    "artifact for the host platform, downloads it, refuses it unless the digest ",
    "matches, and atomically replaces the executable in the install directory.\n\n",
    "Only macOS and Linux on arm64 and amd64 are supported. There is no fallback ",
    "between architectures.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the newest version for this machine:\n",
    "    $ formula-installer install --manifest https://example.com/guilde-cli.toml\n\n",
    "  Install a specific version into a custom directory:\n",
    "    $ formula-installer install 0.44.0 --install-dir /opt/bin\n\n",
    "  Show what would be installed without downloading:\n",
    "    $ formula-installer resolve --json\n\n",
    "  Print digests for a new manifest entry:\n",
    "    $ formula-installer hash dist/*.tar.gz\n\n",
    "LOGGING:\n",
    "  Set FORMULA_INSTALLER_LOG (e.g. `debug`) to override -v/-q.",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file [default: <config dir>/formula-installer/config.toml].
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install a version for this (or the given) platform.
    Install(InstallArgs),

    /// Show which artifact would be installed, without fetching it.
    Resolve(ResolveArgs),

    /// List the artifacts a manifest publishes.
    List(ListArgs),

    /// Print SHA-256 digests of local files.
    Hash(HashArgs),

    /// Remove temporary files left behind by interrupted installs.
    Clean(CleanArgs),
}

/// Where the manifest lives and how to fetch it.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    /// Manifest URL or path [default: from config].
    #[arg(short, long, value_name = "URL|PATH")]
    pub manifest: Option<String>,

    /// Network timeout per request, in seconds [default: 30].
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Total fetch attempts for transient failures [default: 3].
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

/// Explicit platform selection, overriding host detection.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformArgs {
    /// Operating system (`macos` or `linux`).
    #[arg(long, value_name = "OS", requires = "arch")]
    pub os: Option<Os>,

    /// CPU architecture (`arm64` or `amd64`).
    #[arg(long, value_name = "ARCH", requires = "os")]
    pub arch: Option<Arch>,
}

impl PlatformArgs {
    /// The explicitly requested platform, if both halves were given.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::catalog::platform::{Arch, Os, Platform};
    /// use formula_installer::cli::PlatformArgs;
    ///
    /// assert_eq!(PlatformArgs::default().platform(), None);
    /// let args = PlatformArgs { os: Some(Os::Linux), arch: Some(Arch::Amd64) };
    /// assert_eq!(args.platform(), Some(Platform::new(Os::Linux, Arch::Amd64)));
    /// ```
    #[must_use]
    pub fn platform(&self) -> Option<Platform> {
        Some(Platform::new(self.os?, self.arch?))
    }
}

/// Where the executable is written.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationArgs {
    /// Directory receiving the executable [default: ~/.local/bin].
    #[arg(short, long, value_name = "DIR")]
    pub install_dir: Option<Utf8PathBuf>,

    /// Exact output path, overriding --install-dir.
    #[arg(long, value_name = "PATH")]
    pub target: Option<Utf8PathBuf>,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallArgs {
    /// Version to install, or `latest` [default: latest].
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Manifest source.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Platform override.
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Install destination.
    #[command(flatten)]
    pub destination: DestinationArgs,
}

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveArgs {
    /// Version to resolve, or `latest` [default: latest].
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Manifest source.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Platform override.
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Install destination.
    #[command(flatten)]
    pub destination: DestinationArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Manifest source.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only show artifacts for the host platform.
    #[arg(long)]
    pub host: bool,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the hash command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct HashArgs {
    /// Files to hash.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<Utf8PathBuf>,
}

/// Default age, in minutes, before a temporary file counts as orphaned.
pub const DEFAULT_ORPHAN_AGE_MINUTES: u64 = 60;

/// Arguments for the clean command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CleanArgs {
    /// Directory to sweep [default: the install directory].
    #[arg(short, long, value_name = "DIR")]
    pub install_dir: Option<Utf8PathBuf>,

    /// Only remove files older than this many minutes.
    #[arg(long, value_name = "MINUTES", default_value_t = DEFAULT_ORPHAN_AGE_MINUTES)]
    pub older_than: u64,
}

impl Default for CleanArgs {
    fn default() -> Self {
        Self {
            install_dir: None,
            older_than: DEFAULT_ORPHAN_AGE_MINUTES,
        }
    }
}

impl Command {
    /// Command-line values that take precedence over the config file.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::cli::{Command, InstallArgs, SourceArgs};
    ///
    /// let command = Command::Install(InstallArgs {
    ///     source: SourceArgs { timeout: Some(5), ..SourceArgs::default() },
    ///     ..InstallArgs::default()
    /// });
    /// assert_eq!(command.overrides().timeout_secs, Some(5));
    /// ```
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        match self {
            Self::Install(args) => merge(&args.source, Some(&args.destination)),
            Self::Resolve(args) => merge(&args.source, Some(&args.destination)),
            Self::List(args) => merge(&args.source, None),
            Self::Clean(args) => Overrides {
                install_dir: args.install_dir.clone(),
                ..Overrides::default()
            },
            Self::Hash(_) => Overrides::default(),
        }
    }
}

fn merge(source: &SourceArgs, destination: Option<&DestinationArgs>) -> Overrides {
    Overrides {
        manifest: source.manifest.clone(),
        install_dir: destination.and_then(|d| d.install_dir.clone()),
        target: destination.and_then(|d| d.target.clone()),
        timeout_secs: source.timeout,
        retry_attempts: source.retries,
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
