//! Extension manifest records.

use std::collections::BTreeSet;

use crate::{ExtensionIdentity, ExtensionVersion, PlatformId};

/// Capability tag marking an extension that can run on a remote/workspace host.
pub const WORKSPACE_KIND: &str = "workspace";

/// Typed view of a package's embedded `extension.vsixmanifest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    /// Extension name (the `Id` attribute of the identity node).
    pub id: String,
    /// Exact version string.
    pub version: ExtensionVersion,
    /// Publisher name.
    pub publisher: String,
    /// Platform the package was built for, if any.
    pub target_platform: Option<String>,
    /// Extension kinds (`ui`, `workspace`, `web`).
    pub kinds: BTreeSet<String>,
}

impl PackageManifest {
    /// The `publisher.name` identity of this package.
    pub fn identity(&self) -> ExtensionIdentity {
        ExtensionIdentity::new(&self.publisher, &self.id)
    }

    /// Directory name the host editor expects: `<publisher>.<name>-<version>`, lower-cased.
    pub fn location_name(&self) -> String {
        format!("{}-{}", self.identity().key(), self.version).to_lowercase()
    }

    /// Whether the extension declares that it can run on a workspace (remote) host.
    pub fn supports_workspace(&self) -> bool {
        self.kinds.contains(WORKSPACE_KIND)
    }

    /// Whether this package may be installed on `platform`.
    ///
    /// Packages without a target platform, or targeting `universal`, apply
    /// everywhere. Otherwise the target must name `platform` exactly.
    pub fn applies_to(&self, platform: Option<PlatformId>) -> bool {
        match self.target_platform.as_deref() {
            None => true,
            Some(t) if t.eq_ignore_ascii_case("universal") => true,
            Some(t) => platform.is_some_and(|p| p.as_str() == t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(target: Option<&str>) -> PackageManifest {
        PackageManifest {
            id: "Python".to_string(),
            version: "2024.1.0".into(),
            publisher: "MS-Python".to_string(),
            target_platform: target.map(str::to_string),
            kinds: BTreeSet::from(["workspace".to_string()]),
        }
    }

    #[test]
    fn test_location_name_is_lowercase() {
        assert_eq!(manifest(None).location_name(), "ms-python.python-2024.1.0");
    }

    #[test]
    fn test_applies_to() {
        assert!(manifest(None).applies_to(Some(PlatformId::LinuxX64)));
        assert!(manifest(Some("universal")).applies_to(None));
        assert!(manifest(Some("linux-x64")).applies_to(Some(PlatformId::LinuxX64)));
        assert!(!manifest(Some("darwin-arm64")).applies_to(Some(PlatformId::LinuxX64)));
        assert!(!manifest(Some("darwin-arm64")).applies_to(None));
    }

    #[test]
    fn test_supports_workspace() {
        let mut m = manifest(None);
        assert!(m.supports_workspace());
        m.kinds.clear();
        assert!(!m.supports_workspace());
    }
}
