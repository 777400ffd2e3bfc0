//! Directory resolution abstraction for platform-specific paths.

use std::path::PathBuf;

/// Application directory name under the platform config directory.
const APP_DIR: &str = "formula-installer";

/// Supplies the per-user directories the installer reads and writes.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory for user executables (`~/.local/bin`).
    fn bin_dir(&self) -> Option<PathBuf>;

    /// Directory holding `config.toml` for this tool.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    dirs: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the current user's directories.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|dirs| Self { dirs })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn bin_dir(&self) -> Option<PathBuf> {
        // `executable_dir` is only defined on Linux; macOS users conventionally
        // use the same XDG-style location.
        self.dirs
            .executable_dir()
            .map(PathBuf::from)
            .or_else(|| Some(self.dirs.home_dir().join(".local").join("bin")))
    }

    fn config_dir(&self) -> Option<PathBuf> {
        Some(self.dirs.config_dir().join(APP_DIR))
    }
}
