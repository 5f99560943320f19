//! Install session: reconcile every cached package into one extensions directory.

use std::path::{Path, PathBuf};

use dlvsix_schema::PlatformId;
use walkdir::WalkDir;

use crate::Reporter;
use crate::cache::VSIX_EXT;
use crate::io::extract::{extract_package, read_manifest};
use crate::manifest::parse_manifest;
use crate::paths::is_server_home;
use crate::registry::{Evaluation, Registry, RegistryError};

/// What an install session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Directory names of the extensions installed.
    pub installed: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
}

/// Every `.vsix` below `root`, in path order.
pub fn cached_packages(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("Skipping unreadable cache entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|ext| ext == VSIX_EXT))
        .collect()
}

/// Install one package into `registry`. Problems with the package itself are
/// reported and counted; only registry errors are returned.
pub fn install_package(
    registry: &mut Registry,
    package: &Path,
    reporter: &dyn Reporter,
    summary: &mut InstallSummary,
) -> Result<(), RegistryError> {
    let label = package
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let manifest = match read_manifest(package).map(|xml| parse_manifest(&xml)) {
        Ok(Ok(Some(m))) => m,
        Ok(Ok(None)) => {
            reporter.warning(&format!("Invalid extension manifest for {label}"));
            summary.failed += 1;
            return Ok(());
        }
        Ok(Err(e)) => {
            reporter.warning(&format!("{label}: {e}"));
            summary.failed += 1;
            return Ok(());
        }
        Err(e) => {
            reporter.warning(&e.to_string());
            summary.failed += 1;
            return Ok(());
        }
    };

    let plan = match registry.evaluate(&manifest) {
        Evaluation::Skip(reason) => {
            tracing::debug!("Skipping {label}: {reason}");
            summary.skipped += 1;
            return Ok(());
        }
        Evaluation::Install(plan) => plan,
    };

    reporter.info(&format!("Installing extension: {}", plan.location_name));
    let dest = registry.location_dir(&plan.location_name);
    match extract_package(package, &dest) {
        Ok(report) => {
            for failed in &report.failed {
                reporter.warning(&format!(
                    "{}: could not extract {}: {}",
                    plan.location_name, failed.name, failed.reason
                ));
            }
        }
        Err(e) => {
            reporter.failed(&label, &e.to_string());
            summary.failed += 1;
            return Ok(());
        }
    }

    registry.commit(&plan)?;
    if let Some(old) = &plan.supersedes {
        tracing::debug!("{} supersedes {old}", plan.location_name);
    }
    reporter.done(&label, "installed", None);
    summary.installed.push(plan.location_name);
    Ok(())
}

/// Install every package under `cache_root` into `<code_home>/extensions`.
///
/// A code home named `*-server` is a server host and only receives
/// extensions that can run on a workspace host. The registry is written once,
/// at the end, and only if something changed.
pub fn install_from_cache(
    cache_root: &Path,
    code_home: &Path,
    platform: Option<PlatformId>,
    reporter: &dyn Reporter,
) -> Result<InstallSummary, RegistryError> {
    let server_mode = is_server_home(code_home);
    let mut registry = Registry::load(code_home.join("extensions"), server_mode, platform)?;
    tracing::info!(
        "Installing extensions to {}{}",
        code_home.display(),
        if server_mode { " (server)" } else { "" }
    );

    let mut summary = InstallSummary::default();
    for package in cached_packages(cache_root) {
        install_package(&mut registry, &package, reporter, &mut summary)?;
    }

    registry.flush()?;
    Ok(summary)
}
