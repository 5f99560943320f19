//! Registry reconciler.
//!
//! Holds the host editor's `extensions.json` and `.obsolete` in memory for
//! one install session and merges newly extracted packages into them:
//!
//! 1. packages built for another platform are skipped
//! 2. on a server host, packages that cannot run on a workspace host are skipped
//! 3. the active entry for the identity is looked up; the same version means
//!    nothing to do
//! 4. a new entry is appended
//! 5. the previously active version is marked obsolete, never removed
//!
//! Steps 1-3 are [`Registry::evaluate`] and have no side effects. Steps 4-5
//! are [`Registry::commit`]. Nothing touches disk until [`Registry::flush`],
//! which rewrites only the files that changed.
//!
//! A registry is not meant to be shared between tasks; installs into one
//! extensions directory are applied one after another.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use dlvsix_schema::{
    ExtensionIdentity, ExtensionLocation, ExtensionVersion, ObsoleteLog, PackageManifest,
    PlatformId, RegistryEntry, obsolete_key,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::paths::{obsolete_file, registry_file};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt registry file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot express {} as a file URI", .0.display())]
    Location(PathBuf),
}

/// Why a package was not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Built for a platform other than the one being installed on.
    WrongPlatform(String),
    /// UI-only extension on a server host.
    UiOnly,
    /// This exact version is already the active one.
    AlreadyInstalled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPlatform(p) => write!(f, "built for {p}"),
            Self::UiOnly => f.write_str("cannot run on a server host"),
            Self::AlreadyInstalled => f.write_str("already installed"),
        }
    }
}

/// What installing a package would change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub identity: ExtensionIdentity,
    pub version: ExtensionVersion,
    /// Directory name under the extensions root.
    pub location_name: String,
    /// Version this install supersedes, if one was active.
    pub supersedes: Option<ExtensionVersion>,
}

/// Result of [`Registry::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Skip(SkipReason),
    Install(InstallPlan),
}

/// In-memory view of one extensions directory's registry.
#[derive(Debug)]
pub struct Registry {
    extensions_dir: PathBuf,
    server_mode: bool,
    platform: Option<PlatformId>,
    entries: Vec<RegistryEntry>,
    obsolete: ObsoleteLog,
    entries_dirty: bool,
    obsolete_dirty: bool,
}

fn read_optional<T: DeserializeOwned + Default>(path: &Path) -> Result<T, RegistryError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text).map_err(|source| RegistryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write compact JSON through a temp file and rename.
fn write_compact<T: Serialize>(path: &Path, value: &T) -> Result<(), RegistryError> {
    let write_err = |source| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let json = serde_json::to_vec(value).map_err(|e| write_err(e.into()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&json).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

impl Registry {
    /// Load the registry of `extensions_dir`.
    ///
    /// Missing files are empty state. Unparseable files are an error, and
    /// nothing is written in that case.
    pub fn load(
        extensions_dir: impl Into<PathBuf>,
        server_mode: bool,
        platform: Option<PlatformId>,
    ) -> Result<Self, RegistryError> {
        let extensions_dir = extensions_dir.into();
        let entries: Vec<RegistryEntry> = read_optional(&registry_file(&extensions_dir))?;
        let obsolete: ObsoleteLog = read_optional(&obsolete_file(&extensions_dir))?;

        tracing::debug!(
            "Loaded {} registry entries ({} obsolete keys) from {}",
            entries.len(),
            obsolete.len(),
            extensions_dir.display()
        );

        Ok(Self {
            extensions_dir,
            server_mode,
            platform,
            entries,
            obsolete,
            entries_dirty: false,
            obsolete_dirty: false,
        })
    }

    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }

    pub fn is_server_mode(&self) -> bool {
        self.server_mode
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn obsolete(&self) -> &ObsoleteLog {
        &self.obsolete
    }

    /// Whether anything changed since load (or the last flush).
    pub fn is_dirty(&self) -> bool {
        self.entries_dirty || self.obsolete_dirty
    }

    /// The entry the host editor would load for `identity`.
    ///
    /// The last matching entry wins. Obsolete entries are skipped unless
    /// their version is `installing`, so reinstalling an exact obsolete
    /// version is recognised rather than superseding itself.
    pub fn active_entry(
        &self,
        identity: &ExtensionIdentity,
        installing: Option<&ExtensionVersion>,
    ) -> Option<&RegistryEntry> {
        self.entries.iter().rev().find(|e| {
            e.is_for(identity)
                && (!self.obsolete.is_entry_obsolete(e) || installing == Some(&e.version))
        })
    }

    /// Active version of `identity`, if any.
    pub fn active_version(&self, identity: &ExtensionIdentity) -> Option<&ExtensionVersion> {
        self.active_entry(identity, None).map(|e| &e.version)
    }

    /// Where a package with directory name `location_name` is extracted to.
    pub fn location_dir(&self, location_name: &str) -> PathBuf {
        self.extensions_dir.join(location_name)
    }

    /// Decide what installing `manifest` would do. Pure.
    pub fn evaluate(&self, manifest: &PackageManifest) -> Evaluation {
        if !manifest.applies_to(self.platform) {
            let target = manifest.target_platform.clone().unwrap_or_default();
            return Evaluation::Skip(SkipReason::WrongPlatform(target));
        }

        if self.server_mode && !manifest.supports_workspace() {
            return Evaluation::Skip(SkipReason::UiOnly);
        }

        let identity = manifest.identity();
        let installed = self.active_entry(&identity, Some(&manifest.version));
        if installed.is_some_and(|e| e.version == manifest.version) {
            return Evaluation::Skip(SkipReason::AlreadyInstalled);
        }

        Evaluation::Install(InstallPlan {
            location_name: manifest.location_name(),
            supersedes: installed.map(|e| e.version.clone()),
            identity,
            version: manifest.version.clone(),
        })
    }

    /// Apply `plan` with the current wall-clock time.
    pub fn commit(&mut self, plan: &InstallPlan) -> Result<RegistryEntry, RegistryError> {
        self.commit_at(plan, chrono::Utc::now().timestamp_millis())
    }

    /// Apply `plan`, stamping the new entry with `installed_timestamp` (ms).
    ///
    /// Earlier entries with the same identity and version are replaced. Every
    /// other live entry of the identity is marked obsolete.
    pub fn commit_at(
        &mut self,
        plan: &InstallPlan,
        installed_timestamp: i64,
    ) -> Result<RegistryEntry, RegistryError> {
        let dir = self.location_dir(&plan.location_name);
        let absolute = std::path::absolute(&dir).map_err(|source| RegistryError::Write {
            path: dir.clone(),
            source,
        })?;
        let uri =
            Url::from_file_path(&absolute).map_err(|()| RegistryError::Location(absolute.clone()))?;

        let key = obsolete_key(&plan.identity.key(), &plan.version);

        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.is_for(&plan.identity) && e.version == plan.version));
        if self.entries.len() != before {
            tracing::debug!("Replacing stale entry for {key}");
        }
        if self.obsolete.unmark(&key) {
            self.obsolete_dirty = true;
        }

        let superseded: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.is_for(&plan.identity) && !self.obsolete.is_entry_obsolete(e))
            .map(RegistryEntry::obsolete_key)
            .collect();
        for old in superseded {
            tracing::debug!("Marking {old} obsolete");
            if self.obsolete.mark(&old) {
                self.obsolete_dirty = true;
            }
        }

        let entry = RegistryEntry::from_vsix(
            &plan.identity,
            plan.version.clone(),
            ExtensionLocation::file(uri.path()),
            plan.location_name.clone(),
            installed_timestamp,
        );
        self.entries.push(entry.clone());
        self.entries_dirty = true;

        Ok(entry)
    }

    /// Evaluate and, if warranted, commit `manifest`. The caller is
    /// responsible for having extracted the package to
    /// [`location_dir`](Self::location_dir).
    pub fn install(&mut self, manifest: &PackageManifest) -> Result<Evaluation, RegistryError> {
        let evaluation = self.evaluate(manifest);
        if let Evaluation::Install(plan) = &evaluation {
            self.commit(plan)?;
        }
        Ok(evaluation)
    }

    /// Write changed files back as compact JSON.
    ///
    /// The obsolete log is written before the entry list. An interruption in
    /// between leaves an upgraded extension with no active entry, which the
    /// next install of the same package appends again.
    pub fn flush(&mut self) -> Result<(), RegistryError> {
        if self.obsolete_dirty {
            write_compact(&obsolete_file(&self.extensions_dir), &self.obsolete)?;
            self.obsolete_dirty = false;
        }
        if self.entries_dirty {
            write_compact(&registry_file(&self.extensions_dir), &self.entries)?;
            self.entries_dirty = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn manifest(id: &str, version: &str) -> PackageManifest {
        let (publisher, name) = id.split_once('.').unwrap();
        PackageManifest {
            id: name.to_string(),
            version: version.into(),
            publisher: publisher.to_string(),
            target_platform: None,
            kinds: BTreeSet::from(["workspace".to_string()]),
        }
    }

    fn registry(dir: &Path) -> Registry {
        Registry::load(dir, false, Some(PlatformId::LinuxX64)).unwrap()
    }

    /// Count entries for `id` that are present and not obsolete.
    fn live(reg: &Registry, id: &str) -> usize {
        let id: ExtensionIdentity = id.parse().unwrap();
        reg.entries()
            .iter()
            .filter(|e| e.is_for(&id) && !reg.obsolete().is_entry_obsolete(e))
            .count()
    }

    #[test]
    fn test_missing_files_are_empty_state() {
        let dir = tempdir().unwrap();
        let mut reg = registry(dir.path());
        assert!(reg.entries().is_empty());
        assert!(reg.obsolete().is_empty());
        reg.flush().unwrap();
        assert!(!registry_file(dir.path()).exists());
        assert!(!obsolete_file(dir.path()).exists());
    }

    #[test]
    fn test_corrupt_registry_is_fatal() {
        let dir = tempdir().unwrap();
        std::fs::write(registry_file(dir.path()), "[{\"identifier\":").unwrap();
        let err = Registry::load(dir.path(), false, None).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
        assert!(err.to_string().contains("extensions.json"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut reg = registry(dir.path());
        let m = manifest("pub.name", "1.0");

        assert!(matches!(reg.install(&m).unwrap(), Evaluation::Install(_)));
        reg.flush().unwrap();
        let first = std::fs::read_to_string(registry_file(dir.path())).unwrap();

        let mut reg = registry(dir.path());
        assert_eq!(
            reg.install(&m).unwrap(),
            Evaluation::Skip(SkipReason::AlreadyInstalled)
        );
        assert!(!reg.is_dirty());
        reg.flush().unwrap();
        assert_eq!(
            std::fs::read_to_string(registry_file(dir.path())).unwrap(),
            first
        );
        assert!(!obsolete_file(dir.path()).exists());
    }

    #[test]
    fn test_upgrade_then_reinstall_old_version() {
        let dir = tempdir().unwrap();
        let mut reg = registry(dir.path());
        let id: ExtensionIdentity = "pub.name".parse().unwrap();

        reg.install(&manifest("pub.name", "1.0")).unwrap();
        let eval = reg.install(&manifest("pub.name", "2.0")).unwrap();
        let Evaluation::Install(plan) = eval else {
            panic!("expected install, got {eval:?}");
        };
        assert_eq!(plan.supersedes, Some("1.0".into()));

        assert_eq!(reg.entries().len(), 2);
        assert!(reg.obsolete().is_obsolete("pub.name-1.0"));
        assert_eq!(reg.active_version(&id), Some(&"2.0".into()));
        assert_eq!(live(&reg, "pub.name"), 1);

        let again = reg.evaluate(&manifest("pub.name", "1.0"));
        assert!(matches!(again, Evaluation::Install(ref p) if p.supersedes == Some("2.0".into())));

        reg.install(&manifest("pub.name", "1.0")).unwrap();
        assert_eq!(reg.active_version(&id), Some(&"1.0".into()));
        assert!(reg.obsolete().is_obsolete("pub.name-2.0"));
        assert!(!reg.obsolete().is_obsolete("pub.name-1.0"));
        assert_eq!(live(&reg, "pub.name"), 1);
    }

    #[test]
    fn test_platform_filter() {
        let dir = tempdir().unwrap();
        let mut reg = registry(dir.path());
        let mut m = manifest("pub.native", "1.0");
        m.target_platform = Some("darwin-arm64".to_string());

        assert_eq!(
            reg.install(&m).unwrap(),
            Evaluation::Skip(SkipReason::WrongPlatform("darwin-arm64".to_string()))
        );
        assert!(!reg.is_dirty());

        m.target_platform = Some("linux-x64".to_string());
        assert!(matches!(reg.install(&m).unwrap(), Evaluation::Install(_)));
    }

    #[test]
    fn test_server_mode_skips_ui_extensions() {
        let dir = tempdir().unwrap();
        let mut reg = Registry::load(dir.path(), true, Some(PlatformId::LinuxX64)).unwrap();
        let mut theme = manifest("pub.theme", "1.0");
        theme.kinds = BTreeSet::from(["ui".to_string()]);
        assert_eq!(
            reg.evaluate(&theme),
            Evaluation::Skip(SkipReason::UiOnly)
        );
        assert!(matches!(
            reg.evaluate(&manifest("pub.lang", "1.0")),
            Evaluation::Install(_)
        ));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let dir = tempdir().unwrap();
        let host = r#"[
            {"identifier":{"id":"pub.name"},"version":"1.0","location":{"$mid":1,"path":"/x/pub.name-1.0","scheme":"file"},"metadata":{"installedTimestamp":1}},
            {"identifier":{"id":"Pub.Name"},"version":"1.5","location":{"$mid":1,"path":"/x/pub.name-1.5","scheme":"file"},"metadata":{"installedTimestamp":2}}
        ]"#;
        std::fs::write(registry_file(dir.path()), host).unwrap();
        let mut reg = registry(dir.path());
        let id: ExtensionIdentity = "pub.name".parse().unwrap();
        assert_eq!(reg.active_version(&id), Some(&"1.5".into()));

        reg.install(&manifest("pub.name", "2.0")).unwrap();
        assert!(reg.obsolete().is_obsolete("pub.name-1.0"));
        assert!(reg.obsolete().is_obsolete("pub.name-1.5"));
        assert_eq!(live(&reg, "pub.name"), 1);
    }

    #[test]
    fn test_obsolete_same_version_counts_as_installed() {
        let dir = tempdir().unwrap();
        std::fs::write(
            registry_file(dir.path()),
            r#"[{"identifier":{"id":"pub.name"},"version":"1.0","location":{"$mid":1,"path":"/x","scheme":"file"}}]"#,
        )
        .unwrap();
        std::fs::write(obsolete_file(dir.path()), r#"{"pub.name-1.0":true}"#).unwrap();

        let reg = registry(dir.path());
        let id: ExtensionIdentity = "pub.name".parse().unwrap();
        assert_eq!(reg.active_version(&id), None);
        assert_eq!(
            reg.evaluate(&manifest("pub.name", "1.0")),
            Evaluation::Skip(SkipReason::AlreadyInstalled)
        );
        assert!(matches!(
            reg.evaluate(&manifest("pub.name", "1.1")),
            Evaluation::Install(ref p) if p.supersedes.is_none()
        ));
    }

    #[test]
    fn test_flush_writes_compact_json_and_keeps_host_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            registry_file(dir.path()),
            r#"[ {"identifier": {"id": "a.b", "uuid": "u-1"}, "version": "3.0",
                 "location": {"$mid": 1, "fsPath": "/x/a.b-3.0", "path": "/x/a.b-3.0", "scheme": "file"},
                 "relativeLocation": "a.b-3.0",
                 "metadata": {"source": "gallery", "publisherDisplayName": "AB"}} ]"#,
        )
        .unwrap();

        let mut reg = registry(dir.path());
        let entry = reg
            .commit_at(
                &InstallPlan {
                    identity: "pub.name".parse().unwrap(),
                    version: "1.0".into(),
                    location_name: "pub.name-1.0".to_string(),
                    supersedes: None,
                },
                1_700_000_000_000,
            )
            .unwrap();
        assert!(entry.location.path.ends_with("/pub.name-1.0"));
        assert_eq!(entry.location.scheme, "file");
        reg.flush().unwrap();

        let text = std::fs::read_to_string(registry_file(dir.path())).unwrap();
        assert!(!text.contains(": "));
        assert!(!text.contains('\n'));
        assert!(text.starts_with(r#"[{"identifier":{"id":"a.b","uuid":"u-1"},"version":"3.0","location":{"$mid":1,"path":"/x/a.b-3.0","scheme":"file","fsPath":"/x/a.b-3.0"}"#));
        assert!(text.contains(r#""publisherDisplayName":"AB""#));
        assert!(text.contains(r#""installedTimestamp":1700000000000,"pinned":true,"source":"vsix""#));
        assert!(!obsolete_file(dir.path()).exists());
    }

    #[test]
    fn test_flush_writes_obsolete_only_when_changed() {
        let dir = tempdir().unwrap();
        let mut reg = registry(dir.path());
        reg.install(&manifest("pub.name", "1.0")).unwrap();
        reg.flush().unwrap();
        assert!(!obsolete_file(dir.path()).exists());

        reg.install(&manifest("pub.name", "2.0")).unwrap();
        reg.flush().unwrap();
        assert_eq!(
            std::fs::read_to_string(obsolete_file(dir.path())).unwrap(),
            r#"{"pub.name-1.0":true}"#
        );
        assert!(!reg.is_dirty());
    }

    #[test]
    fn test_interrupted_flush_recovers_on_reinstall() {
        let dir = tempdir().unwrap();
        let id: ExtensionIdentity = "pub.name".parse().unwrap();
        let mut reg = registry(dir.path());
        reg.install(&manifest("pub.name", "1.0")).unwrap();
        reg.flush().unwrap();

        // Upgrade, but only the obsolete log reaches disk.
        reg.install(&manifest("pub.name", "2.0")).unwrap();
        write_compact(&obsolete_file(dir.path()), reg.obsolete()).unwrap();

        let mut reg = registry(dir.path());
        assert_eq!(reg.entries().len(), 1);
        assert_eq!(live(&reg, "pub.name"), 0);

        let eval = reg.install(&manifest("pub.name", "2.0")).unwrap();
        assert!(matches!(eval, Evaluation::Install(ref p) if p.supersedes.is_none()));
        reg.flush().unwrap();

        let reg = registry(dir.path());
        assert_eq!(live(&reg, "pub.name"), 1);
        assert_eq!(reg.active_version(&id), Some(&"2.0".into()));
        assert_eq!(
            reg.evaluate(&manifest("pub.name", "2.0")),
            Evaluation::Skip(SkipReason::AlreadyInstalled)
        );
    }

    #[test]
    fn test_interrupted_reinstall_of_obsolete_version_stays_consistent() {
        let dir = tempdir().unwrap();
        let id: ExtensionIdentity = "pub.name".parse().unwrap();
        let mut reg = registry(dir.path());
        reg.install(&manifest("pub.name", "1.0")).unwrap();
        reg.install(&manifest("pub.name", "2.0")).unwrap();
        reg.flush().unwrap();

        reg.install(&manifest("pub.name", "1.0")).unwrap();
        write_compact(&obsolete_file(dir.path()), reg.obsolete()).unwrap();

        let reg = registry(dir.path());
        assert_eq!(live(&reg, "pub.name"), 1);
        assert_eq!(reg.active_version(&id), Some(&"1.0".into()));
        assert_eq!(
            reg.evaluate(&manifest("pub.name", "1.0")),
            Evaluation::Skip(SkipReason::AlreadyInstalled)
        );
    }
}
