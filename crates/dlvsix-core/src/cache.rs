//! Fetch cache: a version-addressed directory tree of downloaded packages.
//!
//! Layout: `<root>/<id>/<version>/<id>-<version>[@<platform>].vsix`. A file at
//! its artifact path is the only cache-hit signal; downloads only ever land
//! there by an atomic rename, so an existing file is a complete one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dlvsix_schema::{ExtensionIdentity, ExtensionVersion, PlatformId, VariantTarget};

/// Package file extension.
pub const VSIX_EXT: &str = "vsix";

/// Every artifact this run found in, or added to, a cache.
///
/// Cloning shares the set, so one instance can be handed to every download
/// task. Insertion only; paths are recorded in canonical form.
#[derive(Debug, Clone, Default)]
pub struct TouchedFiles(Arc<Mutex<BTreeSet<PathBuf>>>);

impl TouchedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`.
    pub fn record(&self, path: &Path) {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&path)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the recorded paths.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Combined size of the recorded files that still exist.
    pub fn total_bytes(&self) -> u64 {
        self.snapshot()
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .filter(std::fs::Metadata::is_file)
            .map(|m| m.len())
            .sum()
    }
}

/// Extension package cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct FetchCache {
    root: PathBuf,
    touched: TouchedFiles,
}

impl FetchCache {
    pub fn new(root: impl Into<PathBuf>, touched: TouchedFiles) -> Self {
        Self {
            root: root.into(),
            touched,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn touched(&self) -> &TouchedFiles {
        &self.touched
    }

    /// `<root>/<id>`
    pub fn extension_dir(&self, identity: &ExtensionIdentity) -> PathBuf {
        self.root.join(identity.key())
    }

    /// `<root>/<id>/<version>`
    pub fn version_dir(&self, identity: &ExtensionIdentity, version: &ExtensionVersion) -> PathBuf {
        self.extension_dir(identity).join(version.as_str())
    }

    /// Where the package for `target` lives, whether or not it exists yet.
    pub fn artifact_path(
        &self,
        identity: &ExtensionIdentity,
        version: &ExtensionVersion,
        target: VariantTarget,
    ) -> PathBuf {
        let name = format!(
            "{}-{}{}.{VSIX_EXT}",
            identity.key(),
            version,
            target.file_suffix()
        );
        self.version_dir(identity, version).join(name)
    }

    /// Whether `path` exists. Hits are recorded as touched.
    pub fn check(&self, path: &Path) -> bool {
        if path.is_file() {
            self.touched.record(path);
            true
        } else {
            false
        }
    }

    /// Whether `version` is already cached for every platform in `platforms`.
    ///
    /// A universal package satisfies any request. Otherwise each requested
    /// platform needs its own package; partial coverage is a miss, and so is
    /// an empty platform set.
    pub fn is_cached(
        &self,
        identity: &ExtensionIdentity,
        version: &ExtensionVersion,
        platforms: &BTreeSet<PlatformId>,
    ) -> bool {
        if self.check(&self.artifact_path(identity, version, VariantTarget::Universal)) {
            return true;
        }
        if platforms.is_empty() {
            return false;
        }

        let paths: Vec<PathBuf> = platforms
            .iter()
            .map(|p| self.artifact_path(identity, version, VariantTarget::Platform(*p)))
            .collect();
        if !paths.iter().all(|p| p.is_file()) {
            return false;
        }
        for path in &paths {
            self.touched.record(path);
        }
        true
    }

    /// Remove every version directory of `identity` except `keep`.
    ///
    /// With `dry_run` nothing is deleted. Returns the directories that were
    /// (or would have been) removed.
    pub fn cleanup_stale_versions(
        &self,
        identity: &ExtensionIdentity,
        keep: &ExtensionVersion,
        dry_run: bool,
    ) -> std::io::Result<Vec<PathBuf>> {
        let ext_dir = self.extension_dir(identity);
        if !ext_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for entry in std::fs::read_dir(&ext_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() || *keep == *entry.file_name().to_string_lossy() {
                continue;
            }
            let path = entry.path();
            if dry_run {
                tracing::info!("Would remove {}", path.display());
            } else {
                tracing::info!("Removing old version {}", path.display());
                std::fs::remove_dir_all(&path)?;
            }
            removed.push(path);
        }
        removed.sort();
        Ok(removed)
    }
}
