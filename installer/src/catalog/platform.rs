//! Operating system and CPU architecture identifiers.
//!
//! Only the four combinations published by the release process are
//! representable: macOS and Linux on arm64 and amd64. Parsing accepts the
//! common aliases (`darwin`, `aarch64`, `x86_64`) so manifests written against
//! Go or Rust naming conventions both load.

use super::error::{CatalogError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A supported operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Apple macOS (Darwin).
    #[serde(rename = "macos")]
    MacOs,
    /// Linux with a glibc userland.
    Linux,
}

/// A supported CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM (`aarch64`).
    Arm64,
    /// 64-bit x86 (`x86_64`).
    Amd64,
}

/// An `(os, arch)` pair identifying one artifact flavour.
///
/// # Examples
///
/// ```
/// use formula_installer::catalog::platform::{Arch, Os, Platform};
///
/// let platform: Platform = "darwin/aarch64".parse().expect("valid platform");
/// assert_eq!(platform, Platform::new(Os::MacOs, Arch::Arm64));
/// assert_eq!(platform.to_string(), "macos/arm64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Platform {
    /// The operating system.
    pub os: Os,
    /// The CPU architecture.
    pub arch: Arch,
}

impl Os {
    /// All supported operating systems.
    pub const ALL: [Self; 2] = [Self::MacOs, Self::Linux];

    /// Canonical lowercase name used in manifests and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    /// Map a Rust `std::env::consts::OS` value to an [`Os`].
    #[must_use]
    pub fn from_rust_os(value: &str) -> Option<Self> {
        match value {
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }
}

impl Arch {
    /// All supported architectures.
    pub const ALL: [Self; 2] = [Self::Arm64, Self::Amd64];

    /// Canonical lowercase name used in manifests and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::Amd64 => "amd64",
        }
    }

    /// Map a Rust `std::env::consts::ARCH` value to an [`Arch`].
    #[must_use]
    pub fn from_rust_arch(value: &str) -> Option<Self> {
        match value {
            "aarch64" => Some(Self::Arm64),
            "x86_64" => Some(Self::Amd64),
            _ => None,
        }
    }
}

impl Platform {
    /// Construct a platform from its parts.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Return the platform of the machine, if it is supported.
    ///
    /// The compiled target of this binary is corrected by [`SystemHostProbe`]:
    /// an amd64 build running under Rosetta on an arm64 Mac reports arm64,
    /// the architecture of the CPU rather than of the translated process.
    #[must_use]
    pub fn host() -> Option<Self> {
        Self::detect(
            std::env::consts::OS,
            std::env::consts::ARCH,
            &SystemHostProbe,
        )
    }

    /// Map `std::env::consts` values to a [`Platform`], asking `probe`
    /// whether an amd64 macOS process is translated.
    #[must_use]
    pub fn detect(os: &str, arch: &str, probe: &dyn HostProbe) -> Option<Self> {
        let platform = Self::from_rust_consts(os, arch)?;
        if platform == Self::new(Os::MacOs, Arch::Amd64) && probe.is_translated() {
            log::debug!("amd64 process is translated; host is macos/arm64");
            return Some(Self::new(Os::MacOs, Arch::Arm64));
        }
        Some(platform)
    }

    /// Map a pair of `std::env::consts` values to a [`Platform`].
    #[must_use]
    pub fn from_rust_consts(os: &str, arch: &str) -> Option<Self> {
        Some(Self::new(Os::from_rust_os(os)?, Arch::from_rust_arch(arch)?))
    }

    /// Every supported platform, in display order.
    pub fn all() -> impl Iterator<Item = Self> {
        Os::ALL
            .into_iter()
            .flat_map(|os| Arch::ALL.into_iter().map(move |arch| Self::new(os, arch)))
    }
}

/// Reports whether the running process executes under binary translation.
#[cfg_attr(test, mockall::automock)]
pub trait HostProbe {
    /// `true` when an amd64 process is being translated on an arm64 CPU.
    fn is_translated(&self) -> bool;
}

/// [`HostProbe`] asking the operating system.
///
/// On macOS this reads the `sysctl.proc_translated` sysctl. Every other
/// system reports no translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostProbe;

impl HostProbe for SystemHostProbe {
    #[cfg(target_os = "macos")]
    fn is_translated(&self) -> bool {
        let mut value: libc::c_int = 0;
        let mut size = std::mem::size_of::<libc::c_int>();
        // SAFETY: the name is NUL-terminated, `value` and `size` outlive the
        // call and `size` matches the buffer; no new value is written.
        let status = unsafe {
            libc::sysctlbyname(
                c"sysctl.proc_translated".as_ptr(),
                (&raw mut value).cast(),
                &raw mut size,
                std::ptr::null_mut(),
                0,
            )
        };
        // ENOENT means the kernel predates Rosetta 2, so nothing is translated.
        status == 0 && value == 1
    }

    #[cfg(not(target_os = "macos"))]
    fn is_translated(&self) -> bool {
        false
    }
}

impl FromStr for Os {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(CatalogError::malformed(format!(
                "unsupported os \"{other}\"; expected one of: macos, linux"
            ))),
        }
    }
}

impl FromStr for Arch {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "amd64" | "x86_64" | "x86-64" => Ok(Self::Amd64),
            other => Err(CatalogError::malformed(format!(
                "unsupported arch \"{other}\"; expected one of: arm64, amd64"
            ))),
        }
    }
}

impl FromStr for Platform {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self> {
        let (os, arch) = value.split_once(['/', '-']).ok_or_else(|| {
            CatalogError::malformed(format!("platform \"{value}\" must look like os/arch"))
        })?;
        Ok(Self::new(os.parse()?, arch.parse()?))
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
