//! `dlvsix install`

use std::time::Instant;

use dlvsix_core::install::install_from_cache;
use dlvsix_core::{Reporter, default_code_home, extension_cache_path, work_dir};
use dlvsix_schema::PlatformId;

use crate::InstallArgs;
use crate::ops::AppError;
use crate::ui::TracingReporter;

/// Install cached packages into the selected editor data directory.
pub async fn install(args: &InstallArgs) -> Result<(), AppError> {
    let start = Instant::now();

    let code_home = match (&args.code_home, args.server, args.client) {
        (Some(path), _, _) => path.clone(),
        (None, true, _) => dirs::home_dir()
            .ok_or(AppError::NoHome)?
            .join(".vscode-server"),
        (None, false, true) => dirs::home_dir().ok_or(AppError::NoHome)?.join(".vscode"),
        (None, false, false) => default_code_home().ok_or(AppError::NoHome)?,
    };
    let cache_dir = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| extension_cache_path(&work_dir()));

    let platform = args.platform.or_else(PlatformId::current);
    if platform.is_none() {
        tracing::warn!("Unknown platform; only platform-independent packages will be installed");
    }

    let summary = tokio::task::spawn_blocking(move || {
        install_from_cache(&cache_dir, &code_home, platform, &TracingReporter)
    })
    .await
    .map_err(|e| AppError::context("Install task failed", e))??;

    let reporter = TracingReporter;
    reporter.summary(
        summary.installed.len(),
        "Installed",
        start.elapsed().as_secs_f64(),
    );
    if summary.failed > 0 {
        reporter.warning(&format!("{} packages could not be installed", summary.failed));
    }
    Ok(())
}
