//! Target platform identifiers.
//!
//! The marketplace and the distribution server both key their artifacts by a
//! `<os>-<arch>` string. `PlatformId` is the closed set of targets dlvsix knows
//! how to fetch for.
//!
//! # Example
//!
//! ```
//! use dlvsix_schema::PlatformId;
//!
//! let p: PlatformId = "alpine-arm64".parse().unwrap();
//! assert_eq!(p.distribution_alias(), PlatformId::LinuxArm64);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A target platform as named by the marketplace (`linux-x64`, `darwin-arm64`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlatformId {
    /// Windows on `x86_64`.
    #[serde(rename = "win32-x64")]
    Win32X64,
    /// Windows on ARM64.
    #[serde(rename = "win32-arm64")]
    Win32Arm64,
    /// macOS on Intel.
    #[serde(rename = "darwin-x64")]
    DarwinX64,
    /// macOS on Apple Silicon.
    #[serde(rename = "darwin-arm64")]
    DarwinArm64,
    /// glibc Linux on `x86_64`.
    #[serde(rename = "linux-x64")]
    LinuxX64,
    /// glibc Linux on ARM64.
    #[serde(rename = "linux-arm64")]
    LinuxArm64,
    /// glibc Linux on 32-bit ARM (hard float).
    #[serde(rename = "linux-armhf")]
    LinuxArmhf,
    /// musl (Alpine) Linux on `x86_64`.
    #[serde(rename = "alpine-x64")]
    AlpineX64,
    /// musl (Alpine) Linux on ARM64.
    #[serde(rename = "alpine-arm64")]
    AlpineArm64,
}

impl PlatformId {
    /// Every known platform, in marketplace order.
    pub const ALL: [Self; 9] = [
        Self::Win32X64,
        Self::Win32Arm64,
        Self::DarwinX64,
        Self::DarwinArm64,
        Self::LinuxX64,
        Self::LinuxArm64,
        Self::LinuxArmhf,
        Self::AlpineX64,
        Self::AlpineArm64,
    ];

    /// Detect the platform of the running process.
    ///
    /// Returns `None` for OS/arch combinations the marketplace does not publish
    /// builds for. Alpine is never detected; musl hosts report as `linux-*`.
    pub fn current() -> Option<Self> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map a Rust `(OS, ARCH)` pair (as in `std::env::consts`) to a platform.
    pub fn from_os_arch(os: &str, arch: &str) -> Option<Self> {
        match (os, arch) {
            ("windows", "x86_64") => Some(Self::Win32X64),
            ("windows", "aarch64") => Some(Self::Win32Arm64),
            ("macos", "x86_64") => Some(Self::DarwinX64),
            ("macos", "aarch64") => Some(Self::DarwinArm64),
            ("linux", "x86_64") => Some(Self::LinuxX64),
            ("linux", "aarch64") => Some(Self::LinuxArm64),
            ("linux", "arm") => Some(Self::LinuxArmhf),
            _ => None,
        }
    }

    /// The marketplace spelling of this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32X64 => "win32-x64",
            Self::Win32Arm64 => "win32-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxArmhf => "linux-armhf",
            Self::AlpineX64 => "alpine-x64",
            Self::AlpineArm64 => "alpine-arm64",
        }
    }

    /// True for `linux-*` and `alpine-*`.
    pub fn is_linux_family(&self) -> bool {
        self.is_linux() || self.is_alpine()
    }

    /// True for `linux-*` only.
    pub fn is_linux(&self) -> bool {
        matches!(self, Self::LinuxX64 | Self::LinuxArm64 | Self::LinuxArmhf)
    }

    /// True for `alpine-*`.
    pub fn is_alpine(&self) -> bool {
        matches!(self, Self::AlpineX64 | Self::AlpineArm64)
    }

    /// True for `win32-*`.
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Win32X64 | Self::Win32Arm64)
    }

    /// True for `darwin-*`.
    pub fn is_darwin(&self) -> bool {
        matches!(self, Self::DarwinX64 | Self::DarwinArm64)
    }

    /// The platform whose distribution build serves this one.
    ///
    /// There is no separate Alpine client or server build, so `alpine-*`
    /// resolves to the matching `linux-*` artifact. Extension variants still
    /// treat Alpine as distinct.
    pub fn distribution_alias(self) -> Self {
        match self {
            Self::AlpineX64 => Self::LinuxX64,
            Self::AlpineArm64 => Self::LinuxArm64,
            other => other,
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known platforms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl std::str::FromStr for PlatformId {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Which platform a downloadable extension variant is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantTarget {
    /// Platform-independent package.
    Universal,
    /// Package built for one platform.
    Platform(PlatformId),
}

impl VariantTarget {
    /// Parse the marketplace's optional `targetPlatform` field.
    ///
    /// A missing field (or the literal `universal`) is the universal variant.
    /// Returns `None` for platforms outside [`PlatformId::ALL`] (e.g. `web`).
    pub fn from_marketplace(target: Option<&str>) -> Option<Self> {
        match target {
            None => Some(Self::Universal),
            Some(t) if t.eq_ignore_ascii_case("universal") => Some(Self::Universal),
            Some(t) => t.parse().ok().map(Self::Platform),
        }
    }

    /// Cache file suffix: empty for universal, `@<platform>` otherwise.
    pub fn file_suffix(&self) -> String {
        match self {
            Self::Universal => String::new(),
            Self::Platform(p) => format!("@{p}"),
        }
    }

    /// Returns `true` for the universal variant.
    pub fn is_universal(&self) -> bool {
        matches!(self, Self::Universal)
    }
}

impl std::fmt::Display for VariantTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Universal => f.write_str("universal"),
            Self::Platform(p) => p.fmt(f),
        }
    }
}

/// A user's choice of target: one platform, or every known platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSelection {
    /// Every platform in [`PlatformId::ALL`].
    All,
    /// A single platform.
    One(PlatformId),
}

impl TargetSelection {
    /// The platforms this selection covers.
    pub fn platforms(&self) -> BTreeSet<PlatformId> {
        match self {
            Self::All => PlatformId::ALL.into_iter().collect(),
            Self::One(p) => BTreeSet::from([*p]),
        }
    }
}

impl std::fmt::Display for TargetSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::One(p) => p.fmt(f),
        }
    }
}

impl std::str::FromStr for TargetSelection {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::One)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_marketplace_names() {
        for p in PlatformId::ALL {
            assert_eq!(p.as_str().parse::<PlatformId>().unwrap(), p);
        }
        assert!("linux-ia32".parse::<PlatformId>().is_err());
    }

    #[test]
    fn test_linux_family() {
        assert!(PlatformId::AlpineX64.is_linux_family());
        assert!(PlatformId::LinuxArmhf.is_linux_family());
        assert!(!PlatformId::DarwinArm64.is_linux_family());
        assert!(!PlatformId::Win32X64.is_linux_family());
    }

    #[test]
    fn test_alpine_aliases_linux_for_distributions() {
        assert_eq!(
            PlatformId::AlpineX64.distribution_alias(),
            PlatformId::LinuxX64
        );
        assert_eq!(
            PlatformId::DarwinX64.distribution_alias(),
            PlatformId::DarwinX64
        );
    }

    #[test]
    fn test_from_os_arch() {
        assert_eq!(
            PlatformId::from_os_arch("linux", "x86_64"),
            Some(PlatformId::LinuxX64)
        );
        assert_eq!(
            PlatformId::from_os_arch("macos", "aarch64"),
            Some(PlatformId::DarwinArm64)
        );
        assert_eq!(PlatformId::from_os_arch("freebsd", "x86_64"), None);
    }

    #[test]
    fn test_variant_target_parsing() {
        assert_eq!(
            VariantTarget::from_marketplace(None),
            Some(VariantTarget::Universal)
        );
        assert_eq!(
            VariantTarget::from_marketplace(Some("linux-x64")),
            Some(VariantTarget::Platform(PlatformId::LinuxX64))
        );
        assert_eq!(VariantTarget::from_marketplace(Some("web")), None);
        assert_eq!(VariantTarget::Universal.file_suffix(), "");
        assert_eq!(
            VariantTarget::Platform(PlatformId::Win32Arm64).file_suffix(),
            "@win32-arm64"
        );
    }

    #[test]
    fn test_target_selection() {
        assert_eq!("ALL".parse::<TargetSelection>().unwrap(), TargetSelection::All);
        assert_eq!(TargetSelection::All.platforms().len(), PlatformId::ALL.len());
        let one: TargetSelection = "win32-x64".parse().unwrap();
        assert_eq!(one.platforms(), BTreeSet::from([PlatformId::Win32X64]));
        assert_eq!(one.to_string(), "win32-x64");
        assert!("beos-x86".parse::<TargetSelection>().is_err());
    }
}
