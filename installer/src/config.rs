//! Layered configuration: built-in defaults, an optional TOML file, and
//! command-line overrides, in increasing order of precedence.

use crate::dirs::BaseDirs;
use crate::install::{DEFAULT_MODE, OWNER_EXECUTE};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// File name looked up inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default network timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of fetch attempts.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Errors arising while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config {path}: {reason}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the I/O failure.
        reason: String,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid config {path}: {reason}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// A value is out of range.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// No manifest was given on the command line or in the file.
    #[error("no manifest given; pass --manifest or set `manifest` in {CONFIG_FILE_NAME}")]
    MissingManifest,

    /// No install directory could be derived.
    #[error("cannot determine an install directory; pass --install-dir or --target")]
    MissingInstallDir,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Contents of `config.toml`. Every key is optional.
///
/// # Examples
///
/// ```
/// use formula_installer::config::FileConfig;
///
/// let config = FileConfig::parse("timeout_secs = 10\nmode = 0o700\n").expect("valid config");
/// assert_eq!(config.timeout_secs, Some(10));
/// assert_eq!(config.mode, Some(0o700));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Manifest path or URL.
    pub manifest: Option<String>,
    /// Directory the executable is installed into.
    pub install_dir: Option<Utf8PathBuf>,
    /// File name of the installed executable.
    pub binary_name: Option<String>,
    /// Network timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Total fetch attempts for transient failures.
    pub retry_attempts: Option<u32>,
    /// Permission bits of the installed executable.
    pub mode: Option<u32>,
}

impl FileConfig {
    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_at(text, Utf8Path::new(CONFIG_FILE_NAME))
    }

    fn parse_at(text: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            reason: e.message().to_owned(),
        })
    }

    /// Load an explicitly named configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, or
    /// [`ConfigError::Parse`] when it is invalid.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        log::debug!("loaded config from {path}");
        Self::parse_at(&text, path)
    }

    /// Load `path` when given, otherwise the per-user default file if it
    /// exists, otherwise an empty configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`FileConfig::load`] errors.
    pub fn discover(path: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = dirs
            .config_dir()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .map(|dir| dir.join(CONFIG_FILE_NAME));
        match default_path {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Values supplied on the command line; `None` defers to the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--manifest`.
    pub manifest: Option<String>,
    /// `--install-dir`.
    pub install_dir: Option<Utf8PathBuf>,
    /// `--target`.
    pub target: Option<Utf8PathBuf>,
    /// `--timeout`.
    pub timeout_secs: Option<u64>,
    /// `--retries`.
    pub retry_attempts: Option<u32>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    manifest: Option<String>,
    install_dir: Option<Utf8PathBuf>,
    target: Option<Utf8PathBuf>,
    binary_name: Option<String>,
    timeout: Duration,
    retry_attempts: u32,
    mode: u32,
}

impl Settings {
    /// Merge defaults, `file` and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero timeout, zero retry
    /// attempts, or permission bits outside `0o7777`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::config::{FileConfig, Overrides, Settings};
    ///
    /// let file = FileConfig { timeout_secs: Some(10), ..FileConfig::default() };
    /// let cli = Overrides { timeout_secs: Some(5), ..Overrides::default() };
    /// let settings = Settings::merge(&file, cli, None).expect("valid settings");
    /// assert_eq!(settings.timeout().as_secs(), 5);
    /// assert_eq!(settings.retry_attempts(), 3);
    /// ```
    pub fn merge(
        file: &FileConfig,
        overrides: Overrides,
        default_install_dir: Option<Utf8PathBuf>,
    ) -> Result<Self> {
        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs",
                reason: "must be at least 1 second".to_owned(),
            });
        }
        let retry_attempts = overrides
            .retry_attempts
            .or(file.retry_attempts)
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        if retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry_attempts",
                reason: "must be at least 1".to_owned(),
            });
        }
        let mode = file.mode.unwrap_or(DEFAULT_MODE);
        if mode > 0o7777 {
            return Err(ConfigError::InvalidValue {
                key: "mode",
                reason: format!("{mode:#o} is not a permission mask"),
            });
        }
        if mode & OWNER_EXECUTE == 0 {
            return Err(ConfigError::InvalidValue {
                key: "mode",
                reason: format!("{mode:#o} leaves the executable without owner execute permission"),
            });
        }

        Ok(Self {
            manifest: overrides.manifest.or_else(|| file.manifest.clone()),
            install_dir: overrides
                .install_dir
                .or_else(|| file.install_dir.clone())
                .or(default_install_dir),
            target: overrides.target,
            binary_name: file.binary_name.clone(),
            timeout: Duration::from_secs(timeout_secs),
            retry_attempts,
            mode,
        })
    }

    /// The manifest location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingManifest`] when none was configured.
    pub fn manifest(&self) -> Result<&str> {
        self.manifest.as_deref().ok_or(ConfigError::MissingManifest)
    }

    /// Where the executable is written.
    ///
    /// `--target` wins outright; otherwise the install directory is joined
    /// with the configured binary name, falling back to `default_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingInstallDir`] when neither a target nor
    /// an install directory is known.
    pub fn target_path(&self, default_name: &str) -> Result<Utf8PathBuf> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }
        let dir = self
            .install_dir
            .as_ref()
            .ok_or(ConfigError::MissingInstallDir)?;
        Ok(dir.join(self.binary_name.as_deref().unwrap_or(default_name)))
    }

    /// The configured install directory, if any.
    #[must_use]
    pub fn install_dir(&self) -> Option<&Utf8Path> {
        self.install_dir.as_deref()
    }

    /// Network timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total fetch attempts.
    #[must_use]
    pub const fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Permission bits for the installed executable.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }
}

/// The default install directory, `~/.local/bin` on both platforms.
#[must_use]
pub fn default_install_dir(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    dirs.bin_dir()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use rstest::rstest;
    use std::path::PathBuf;

    #[test]
    fn empty_file_uses_defaults() {
        let settings =
            Settings::merge(&FileConfig::default(), Overrides::default(), None).expect("valid");
        assert_eq!(settings.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(settings.retry_attempts(), DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(settings.mode(), DEFAULT_MODE);
        assert_eq!(settings.manifest(), Err(ConfigError::MissingManifest));
        assert_eq!(
            settings.target_path("guilde-cli"),
            Err(ConfigError::MissingInstallDir)
        );
    }

    #[test]
    fn command_line_beats_file_beats_default() {
        let file = FileConfig::parse(concat!(
            "manifest = \"/srv/tap/guilde-cli.toml\"\n",
            "install_dir = \"/opt/tools\"\n",
            "timeout_secs = 10\n",
            "retry_attempts = 5\n",
        ))
        .expect("valid config");
        let overrides = Overrides {
            install_dir: Some(Utf8PathBuf::from("/usr/local/bin")),
            timeout_secs: Some(2),
            ..Overrides::default()
        };

        let default_dir = Some(Utf8PathBuf::from("/home/u/.local/bin"));
        let settings = Settings::merge(&file, overrides, default_dir).expect("valid");
        assert_eq!(settings.manifest(), Ok("/srv/tap/guilde-cli.toml"));
        assert_eq!(settings.timeout(), Duration::from_secs(2));
        assert_eq!(settings.retry_attempts(), 5);
        assert_eq!(
            settings.target_path("guilde-cli"),
            Ok(Utf8PathBuf::from("/usr/local/bin/guilde-cli"))
        );
    }

    #[test]
    fn explicit_target_wins_over_install_dir() {
        let overrides = Overrides {
            target: Some(Utf8PathBuf::from("/tmp/custom-name")),
            ..Overrides::default()
        };
        let settings = Settings::merge(
            &FileConfig::default(),
            overrides,
            Some(Utf8PathBuf::from("/home/u/.local/bin")),
        )
        .expect("valid");
        assert_eq!(
            settings.target_path("guilde-cli"),
            Ok(Utf8PathBuf::from("/tmp/custom-name"))
        );
    }

    #[test]
    fn binary_name_overrides_catalog_name() {
        let file = FileConfig {
            binary_name: Some("gc".to_owned()),
            ..FileConfig::default()
        };
        let settings = Settings::merge(&file, Overrides::default(), Some(Utf8PathBuf::from("/b")))
            .expect("valid");
        assert_eq!(settings.target_path("guilde-cli"), Ok(Utf8PathBuf::from("/b/gc")));
    }

    #[rstest]
    #[case::zero_timeout("timeout_secs = 0", "timeout_secs")]
    #[case::zero_retries("retry_attempts = 0", "retry_attempts")]
    #[case::bad_mode("mode = 0o17777", "mode")]
    #[case::not_executable("mode = 0o644", "mode")]
    #[case::no_bits("mode = 0", "mode")]
    #[case::group_execute_only("mode = 0o654", "mode")]
    fn rejects_out_of_range_values(#[case] text: &str, #[case] key: &str) {
        let file = FileConfig::parse(text).expect("valid TOML");
        let err =
            Settings::merge(&file, Overrides::default(), None).expect_err("expected failure");
        assert!(
            matches!(err, ConfigError::InvalidValue { key: k, .. } if k == key),
            "got {err:?}"
        );
    }

    #[rstest]
    #[case::default_mode("", 0o755)]
    #[case::owner_only("mode = 0o700", 0o700)]
    #[case::setuid("mode = 0o4755", 0o4755)]
    fn accepts_executable_modes(#[case] text: &str, #[case] expected: u32) {
        let file = FileConfig::parse(text).expect("valid TOML");
        let settings = Settings::merge(&file, Overrides::default(), None).expect("valid");
        assert_eq!(settings.mode(), expected);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("timeout = 3\n").expect_err("expected failure");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn discover_reads_default_location() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "retry_attempts = 7\n")
            .expect("write config");
        let config_dir = dir.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir()
            .return_once(move || Some(config_dir));

        let config = FileConfig::discover(None, &dirs).expect("config loads");
        assert_eq!(config.retry_attempts, Some(7));
    }

    #[test]
    fn discover_without_file_is_empty() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir()
            .returning(|| Some(PathBuf::from("/nonexistent/formula-installer")));
        let config = FileConfig::discover(None, &dirs).expect("config loads");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dirs = MockBaseDirs::new();
        let err = FileConfig::discover(Some(Utf8Path::new("/nonexistent/config.toml")), &dirs)
            .expect_err("expected failure");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn default_install_dir_uses_bin_dir() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_bin_dir()
            .returning(|| Some(PathBuf::from("/home/u/.local/bin")));
        assert_eq!(
            default_install_dir(&dirs),
            Some(Utf8PathBuf::from("/home/u/.local/bin"))
        );
    }
}
