//! Extension acquisition: bring the fetch cache up to date with an inventory.

use std::collections::BTreeSet;
use std::sync::Arc;

use dlvsix_schema::{PlatformId, VariantTarget};
use futures::StreamExt;
use reqwest::Client;

use crate::cache::FetchCache;
use crate::inventory::{Inventory, InventoryItem};
use crate::io::download::DownloadRequest;
use crate::marketplace::{Marketplace, RemoteVariant};
use crate::summary::FetchSummary;
use crate::{DOWNLOAD_CONCURRENCY, Reporter};

/// Downloads inventory packages into a [`FetchCache`].
pub struct Acquirer {
    client: Client,
    marketplace: Marketplace,
    cache: FetchCache,
    reporter: Arc<dyn Reporter>,
    dry_run: bool,
}

impl std::fmt::Debug for Acquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquirer")
            .field("marketplace", &self.marketplace)
            .field("cache", &self.cache)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Acquirer {
    pub fn new(
        client: Client,
        marketplace: Marketplace,
        cache: FetchCache,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            marketplace,
            cache,
            reporter,
            dry_run: false,
        }
    }

    /// Query the marketplace but neither download nor delete anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Fetch every inventory item for `platforms`. At most
    /// [`DOWNLOAD_CONCURRENCY`] items are in flight at once.
    pub async fn acquire_extensions(
        &self,
        inventory: &Inventory,
        platforms: &BTreeSet<PlatformId>,
    ) -> FetchSummary {
        let mut results = futures::stream::iter(inventory.items())
            .map(|item| self.acquire_one(item, platforms))
            .buffer_unordered(DOWNLOAD_CONCURRENCY);

        let mut summary = FetchSummary::default();
        while let Some(s) = results.next().await {
            summary.merge(s);
        }
        summary
    }

    async fn acquire_one(
        &self,
        item: &InventoryItem,
        platforms: &BTreeSet<PlatformId>,
    ) -> FetchSummary {
        let mut summary = FetchSummary::default();
        let (identity, version) = (&item.identity, &item.version);

        if self.cache.is_cached(identity, version, platforms) {
            tracing::debug!("{identity} {version} is cached");
            summary.cached += 1;
            return summary;
        }

        let variants = match self.marketplace.resolve_variants(identity, version).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to resolve {identity} {version}: {e}");
                self.reporter.failed(&identity.to_string(), &e.to_string());
                summary.failed += 1;
                return summary;
            }
        };

        let wanted: Vec<RemoteVariant> = variants
            .into_iter()
            .filter(|v| match v.target {
                VariantTarget::Universal => true,
                VariantTarget::Platform(p) => platforms.contains(&p),
            })
            .collect();
        if wanted.is_empty() {
            summary.skipped += 1;
            return summary;
        }

        for variant in &wanted {
            let dest = self.cache.artifact_path(identity, version, variant.target);
            let label = format!("{identity}-{version}{}", variant.target.file_suffix());

            if self.cache.check(&dest) {
                summary.cached += 1;
                continue;
            }
            if self.dry_run {
                tracing::info!("Would download {label} from {}", variant.url);
                summary.skipped += 1;
                continue;
            }

            match DownloadRequest::new(&self.client, &variant.url, &dest, self.reporter.as_ref())
                .execute()
                .await
            {
                Ok(_) => {
                    self.cache.touched().record(&dest);
                    summary.downloaded += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to download {label}: {e}");
                    self.reporter.failed(&label, &e.to_string());
                    summary.failed += 1;
                }
            }
        }

        if summary.downloaded > 0 || self.dry_run {
            if let Err(e) = self
                .cache
                .cleanup_stale_versions(identity, version, self.dry_run)
            {
                tracing::warn!("Failed to remove old versions of {identity}: {e}");
            }
        }

        summary
    }
}
