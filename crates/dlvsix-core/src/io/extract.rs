//! Package extraction.
//!
//! A `.vsix` is a zip container. Only the `extension/` subtree is unpacked;
//! the root `extension.vsixmanifest` is copied alongside as `.vsixmanifest`.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

/// Manifest entry at the root of a package.
pub const MANIFEST_ENTRY: &str = "extension.vsixmanifest";

/// Name the manifest is stored under in an extracted extension.
pub const MANIFEST_FILE: &str = ".vsixmanifest";

/// Prefix of the payload subtree.
pub const PAYLOAD_PREFIX: &str = "extension/";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt package {}: {reason}", path.display())]
    CorruptPackage { path: PathBuf, reason: String },
}

impl ExtractError {
    fn corrupt(path: &Path, reason: impl ToString) -> Self {
        Self::CorruptPackage {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// A payload entry that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub name: String,
    pub reason: String,
}

/// Outcome of a best-effort extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    /// Number of payload files written.
    pub files: usize,
    /// Entries skipped because they failed.
    pub failed: Vec<FailedEntry>,
}

impl ExtractReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn open(package: &Path) -> Result<ZipArchive<File>, ExtractError> {
    let file = File::open(package)?;
    ZipArchive::new(file).map_err(|e| ExtractError::corrupt(package, e))
}

fn read_manifest_entry(
    archive: &mut ZipArchive<File>,
    package: &Path,
) -> Result<Vec<u8>, ExtractError> {
    let mut entry = archive
        .by_name(MANIFEST_ENTRY)
        .map_err(|e| ExtractError::corrupt(package, format!("{MANIFEST_ENTRY}: {e}")))?;
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(|e| ExtractError::corrupt(package, e))?;
    Ok(buf)
}

/// Read the embedded manifest without unpacking anything.
pub fn read_manifest(package: &Path) -> Result<String, ExtractError> {
    let mut archive = open(package)?;
    let bytes = read_manifest_entry(&mut archive, package)?;
    String::from_utf8(bytes).map_err(|e| ExtractError::corrupt(package, e))
}

/// Unpack `package` into `dest_dir`.
///
/// The payload is written into a staging directory next to `dest_dir` and
/// renamed into place at the end, replacing any previous contents. A package
/// that cannot be opened or has no manifest fails as a whole; individual
/// payload entries that fail are collected in the report and skipped.
pub fn extract_package(package: &Path, dest_dir: &Path) -> Result<ExtractReport, ExtractError> {
    let mut archive = open(package)?;
    let manifest = read_manifest_entry(&mut archive, package)?;

    let parent = dest_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)?;

    fs::write(staging.path().join(MANIFEST_FILE), manifest)?;

    let mut report = ExtractReport::default();

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(f) => f,
            Err(e) => {
                report.failed.push(FailedEntry {
                    name: format!("#{i}"),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let name = file.name().to_string();
        if !name.starts_with(PAYLOAD_PREFIX) {
            continue;
        }

        // Zip Slip: enclosed_name() rejects absolute and `..` paths.
        let Some(relative) = file.enclosed_name().and_then(|p| {
            let relative = p.strip_prefix("extension").ok()?.to_path_buf();
            Some(relative)
        }) else {
            report.failed.push(FailedEntry {
                name,
                reason: "unsafe path".to_string(),
            });
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = staging.path().join(&relative);
        let is_dir = file.is_dir();
        let result = if is_dir {
            fs::create_dir_all(&target)
        } else {
            let mode = file.unix_mode();
            write_entry(&mut file, &target, mode)
        };

        match result {
            Ok(()) if is_dir => {}
            Ok(()) => report.files += 1,
            Err(e) => {
                tracing::warn!("Failed to extract {name}: {e}");
                report.failed.push(FailedEntry {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if dest_dir.exists() {
        fs::remove_dir_all(dest_dir)?;
    }
    // After the rename the TempDir guard points at nothing; dropping it is a no-op.
    fs::rename(staging.path(), dest_dir)?;

    Ok(report)
}

fn write_entry(reader: &mut impl Read, target: &Path, mode: Option<u32>) -> io::Result<()> {
    if let Some(p) = target.parent() {
        fs::create_dir_all(p)?;
    }
    let mut out = File::create(target)?;
    io::copy(reader, &mut out)?;

    #[cfg(unix)]
    if let Some(mode) = mode.filter(|m| m & 0o777 != 0) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o777))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
