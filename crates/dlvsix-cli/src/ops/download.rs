//! `dlvsix download`

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use dlvsix_core::acquire::Acquirer;
use dlvsix_core::cache::FetchCache;
use dlvsix_core::distributions::Distributions;
use dlvsix_core::inventory::{load_inventory, read_ignore_file};
use dlvsix_core::marketplace::Marketplace;
use dlvsix_core::product::{default_extensions_dir, load_product, supports_distributions};
use dlvsix_core::summary::bytes_to_human;
use dlvsix_core::{Reporter, dist_path, extension_cache_path, ignore_file_path};

use crate::DownloadArgs;
use crate::ops::{AppError, Context};
use crate::ui::TracingReporter;

/// Mirror the local editor's extensions (and, unless disabled, its
/// distributions) into the work directory.
pub async fn download(args: &DownloadArgs) -> Result<(), AppError> {
    let start = Instant::now();
    let work_dir = args.work_dir.clone().unwrap_or_else(dlvsix_core::work_dir);
    let ctx = Context::new(work_dir, Arc::new(TracingReporter))?;
    let reporter = ctx.reporter.clone();

    let product = load_product(&args.code_home)?;
    tracing::debug!("Detected editor version {} ({})", product.version, product.commit);

    let marketplace_url = args
        .marketplace_url
        .as_deref()
        .or(product.gallery_url())
        .ok_or(AppError::NoMarketplaceUrl)?;
    tracing::debug!("Using marketplace url: {marketplace_url}");

    // Settle distribution config before any network traffic.
    let update_url = if args.extensions_only {
        None
    } else {
        if !supports_distributions(&product) {
            return Err(AppError::CodiumDistributions);
        }
        let url = args
            .update_url
            .clone()
            .or_else(|| product.update_url.clone())
            .ok_or(AppError::NoUpdateUrl)?;
        tracing::debug!("Using update url: {url}");
        Some(url)
    };

    let extensions_dir = match &args.extensions_dir {
        Some(dir) => dir.clone(),
        None => default_extensions_dir(&product, &dirs::home_dir().ok_or(AppError::NoHome)?),
    };

    let mut ignored: BTreeSet<String> = args.ignored.iter().map(|s| s.to_lowercase()).collect();
    ignored.extend(read_ignore_file(&ignore_file_path(&ctx.work_dir))?);

    let inventory = load_inventory(&extensions_dir, &ignored)?;
    reporter.info(&format!(
        "Found {} extensions in {}",
        inventory.len(),
        extensions_dir.display()
    ));

    reporter.section("Extensions");
    let acquirer = Acquirer::new(
        ctx.client.clone(),
        Marketplace::new(ctx.client.clone(), marketplace_url)?,
        FetchCache::new(extension_cache_path(&ctx.work_dir), ctx.touched.clone()),
        reporter.clone(),
    )
    .dry_run(args.dry_run);
    let mut summary = acquirer
        .acquire_extensions(&inventory, &args.extension_platforms())
        .await;

    if let Some(update_url) = update_url {
        let dists = Distributions::new(
            ctx.client.clone(),
            &update_url,
            product,
            dist_path(&ctx.work_dir),
            ctx.touched.clone(),
            reporter.clone(),
        )
        .dry_run(args.dry_run);

        let mut jobs = Vec::new();
        if !args.no_download_client {
            if let Err(e) = dists.prune_other_commits() {
                tracing::warn!("Failed to remove old distributions: {e}");
            }
            jobs.extend(dists.client_jobs(args.platform));
        }
        if args.wants_server(inventory.has_remoting_extension()) {
            jobs.extend(dists.server_jobs(args.server_platform));
            jobs.extend(dists.cli_jobs(args.server_platform));
        }

        if !jobs.is_empty() {
            reporter.section("Distributions");
            summary.merge(dists.fetch_all(jobs).await);
        }
    }

    reporter.summary(
        summary.downloaded,
        "Downloaded",
        start.elapsed().as_secs_f64(),
    );
    reporter.info(&format!(
        "{} cached, {} skipped, {} failed",
        summary.cached, summary.skipped, summary.failed
    ));
    reporter.info(&format!(
        "{} files, {} total",
        ctx.touched.len(),
        bytes_to_human(ctx.touched.total_bytes())
    ));
    if summary.failed > 0 {
        reporter.warning("Some downloads failed; run again to retry them");
    }

    Ok(())
}
