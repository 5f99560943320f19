//! Distribution fetcher: editor client installers, server builds and the
//! standalone CLI, pinned to the commit of the local editor.
//!
//! The update API is asked for `<updateUrl>/api/versions/commit:<commit>/<key>/stable`
//! and answers with the artifact URL and its SHA256. Artifacts land in
//! `dist/<commit>/` and an existing file there is never fetched again.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dlvsix_schema::{PlatformId, ProductJson, Sha256Digest, TargetSelection};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::TouchedFiles;
use crate::io::download::{DownloadError, DownloadRequest};
use crate::summary::FetchSummary;
use crate::{DOWNLOAD_CONCURRENCY, Reporter, naming};

#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("Update API request for {key} failed: {source}")]
    Api {
        key: String,
        source: reqwest::Error,
    },

    #[error("Download of {} failed: {source}", dest.display())]
    Download {
        dest: PathBuf,
        source: DownloadError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Update API answer for one artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVersion {
    pub url: String,
    pub sha256hash: Sha256Digest,
}

/// One artifact to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistJob {
    /// Update API key (`server-linux-x64`, `win32-x64-user`, ...).
    pub key: String,
    pub dest: PathBuf,
}

/// Client/server builds: `alpine-*` maps onto `linux-*`, and expanding `ALL`
/// leaves Alpine out since it has no build of its own.
fn editor_platforms(targets: TargetSelection) -> BTreeSet<PlatformId> {
    match targets {
        TargetSelection::All => PlatformId::ALL
            .into_iter()
            .filter(|p| !p.is_alpine())
            .collect(),
        TargetSelection::One(p) => BTreeSet::from([p.distribution_alias()]),
    }
}

/// Fetches distributions of one product build.
pub struct Distributions {
    client: Client,
    update_url: String,
    product: ProductJson,
    dist_root: PathBuf,
    touched: TouchedFiles,
    reporter: Arc<dyn Reporter>,
    dry_run: bool,
}

impl std::fmt::Debug for Distributions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distributions")
            .field("update_url", &self.update_url)
            .field("commit", &self.product.commit)
            .field("dist_root", &self.dist_root)
            .finish_non_exhaustive()
    }
}

impl Distributions {
    pub fn new(
        client: Client,
        update_url: &str,
        product: ProductJson,
        dist_root: impl Into<PathBuf>,
        touched: TouchedFiles,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            update_url: update_url.trim_end_matches('/').to_string(),
            product,
            dist_root: dist_root.into(),
            touched,
            reporter,
            dry_run: false,
        }
    }

    /// Log intended actions instead of downloading or deleting.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// `dist/<commit>`
    pub fn commit_dir(&self) -> PathBuf {
        self.dist_root.join(&self.product.commit)
    }

    fn api_url(&self, key: &str) -> String {
        format!(
            "{}/api/versions/commit:{}/{key}/stable",
            self.update_url, self.product.commit
        )
    }

    /// Jobs for the desktop client of `targets`.
    pub fn client_jobs(&self, targets: TargetSelection) -> Vec<DistJob> {
        let dir = self.commit_dir();
        editor_platforms(targets)
            .into_iter()
            .map(|p| DistJob {
                key: naming::client_distribution_key(p),
                dest: dir.join(naming::client_artifact_name(
                    p,
                    &self.product,
                    &self.product.version,
                )),
            })
            .collect()
    }

    /// Jobs for the server build of `targets`.
    pub fn server_jobs(&self, targets: TargetSelection) -> Vec<DistJob> {
        let dir = self.commit_dir();
        editor_platforms(targets)
            .into_iter()
            .map(|p| DistJob {
                key: naming::server_distribution_key(p),
                dest: dir.join(naming::server_artifact_name(
                    p,
                    &self.product.application_name,
                    &self.product.version,
                )),
            })
            .collect()
    }

    /// Jobs for the standalone CLI of `targets`. Alpine has its own CLI build.
    pub fn cli_jobs(&self, targets: TargetSelection) -> Vec<DistJob> {
        let dir = self.commit_dir();
        targets
            .platforms()
            .into_iter()
            .map(|p| DistJob {
                key: naming::cli_distribution_key(p),
                dest: dir.join(naming::cli_artifact_name(p)),
            })
            .collect()
    }

    /// Remove distribution directories of other commits.
    pub fn prune_other_commits(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        if !self.dist_root.is_dir() {
            return Ok(removed);
        }
        for entry in std::fs::read_dir(&self.dist_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() || entry.file_name() == self.product.commit.as_str() {
                continue;
            }
            let path = entry.path();
            if self.dry_run {
                tracing::info!("Would remove old dist version {}", path.display());
            } else {
                tracing::info!("Removing old dist version {}", path.display());
                std::fs::remove_dir_all(&path)?;
            }
            removed.push(path);
        }
        Ok(removed)
    }

    async fn lookup(&self, key: &str) -> Result<ApiVersion, DistributionError> {
        let api_err = |source: reqwest::Error| DistributionError::Api {
            key: key.to_string(),
            source,
        };
        self.client
            .get(self.api_url(key))
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .map_err(api_err)?
            .error_for_status()
            .map_err(api_err)?
            .json()
            .await
            .map_err(api_err)
    }

    /// Fetch one artifact unless it is already present.
    pub async fn fetch(&self, job: &DistJob) -> Result<FetchSummary, DistributionError> {
        if job.dest.is_file() {
            self.touched.record(&job.dest);
            tracing::debug!("{} is cached", job.dest.display());
            return Ok(FetchSummary {
                cached: 1,
                ..FetchSummary::default()
            });
        }

        if self.dry_run {
            tracing::info!("Would download {} -> {}", job.key, job.dest.display());
            return Ok(FetchSummary {
                skipped: 1,
                ..FetchSummary::default()
            });
        }

        let api = self.lookup(&job.key).await?;
        DownloadRequest::new(&self.client, &api.url, &job.dest, self.reporter.as_ref())
            .with_sha256(&api.sha256hash)
            .execute()
            .await
            .map_err(|source| DistributionError::Download {
                dest: job.dest.clone(),
                source,
            })?;
        self.touched.record(&job.dest);

        Ok(FetchSummary {
            downloaded: 1,
            ..FetchSummary::default()
        })
    }

    /// Fetch every job on a bounded pool. Failures are logged and counted,
    /// never fatal.
    pub async fn fetch_all(&self, jobs: Vec<DistJob>) -> FetchSummary {
        let mut results = futures::stream::iter(jobs)
            .map(|job| async move {
                let result = self.fetch(&job).await;
                (job, result)
            })
            .buffer_unordered(DOWNLOAD_CONCURRENCY);

        let mut summary = FetchSummary::default();
        while let Some((job, result)) = results.next().await {
            match result {
                Ok(s) => summary.merge(s),
                Err(e) => {
                    tracing::error!("{e}");
                    self.reporter.failed(&file_label(&job.dest), &e.to_string());
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;
    use tempfile::tempdir;

    const COMMIT: &str = "89de5a8d";
    const HELLO_SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn product() -> ProductJson {
        serde_json::from_value(serde_json::json!({
            "applicationName": "code",
            "win32DirName": "Microsoft VS Code",
            "darwinExecutable": "VSCode",
            "version": "1.90.0",
            "commit": COMMIT,
            "quality": "stable",
            "dataFolderName": ".vscode",
            "serverDataFolderName": ".vscode-server"
        }))
        .unwrap()
    }

    fn dists(url: &str, root: &Path) -> Distributions {
        Distributions::new(
            Client::new(),
            url,
            product(),
            root,
            TouchedFiles::new(),
            Arc::new(NullReporter),
        )
    }

    #[test]
    fn test_jobs_alias_alpine() {
        let d = dists("https://update", Path::new("/dist"));
        let server = d.server_jobs(TargetSelection::One(PlatformId::AlpineArm64));
        assert_eq!(
            server,
            vec![DistJob {
                key: "server-linux-arm64".to_string(),
                dest: PathBuf::from(format!(
                    "/dist/{COMMIT}/code-server-linux-arm64-1.90.0.tar.gz"
                )),
            }]
        );

        let cli = d.cli_jobs(TargetSelection::One(PlatformId::AlpineArm64));
        assert_eq!(cli[0].key, "cli-alpine-arm64");

        let all_clients = d.client_jobs(TargetSelection::All);
        assert_eq!(all_clients.len(), 7);
        assert!(all_clients.iter().all(|j| !j.key.contains("alpine")));
        assert_eq!(d.cli_jobs(TargetSelection::All).len(), 9);
    }

    #[tokio::test]
    async fn test_fetch_verifies_and_records() {
        let mut server = Server::new_async().await;
        let artifact_url = format!("{}/blob/server.tar.gz", server.url());
        let _api = server
            .mock(
                "GET",
                format!("/api/versions/commit:{COMMIT}/server-linux-x64/stable").as_str(),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "url": artifact_url,
                    "name": "1.90.0",
                    "sha256hash": HELLO_SHA
                })
                .to_string(),
            )
            .create_async()
            .await;
        let blob = server
            .mock("GET", "/blob/server.tar.gz")
            .with_status(200)
            .with_body("hello")
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let d = dists(&server.url(), dir.path());
        let jobs = d.server_jobs(TargetSelection::One(PlatformId::LinuxX64));

        let summary = d.fetch_all(jobs.clone()).await;
        assert_eq!(summary.downloaded, 1);
        assert!(jobs[0].dest.is_file());
        assert_eq!(d.touched.len(), 1);

        let again = d.fetch_all(jobs).await;
        assert_eq!(again.cached, 1);
        blob.assert_async().await;
    }

    #[tokio::test]
    async fn test_hash_mismatch_is_counted_as_failure() {
        let mut server = Server::new_async().await;
        let artifact_url = format!("{}/blob/cli.tar.gz", server.url());
        let _api = server
            .mock(
                "GET",
                format!("/api/versions/commit:{COMMIT}/cli-linux-x64/stable").as_str(),
            )
            .with_status(200)
            .with_body(
                serde_json::json!({ "url": artifact_url, "sha256hash": HELLO_SHA }).to_string(),
            )
            .create_async()
            .await;
        let _blob = server
            .mock("GET", "/blob/cli.tar.gz")
            .with_status(200)
            .with_body("corrupted")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let d = dists(&server.url(), dir.path());
        let jobs = d.cli_jobs(TargetSelection::One(PlatformId::LinuxX64));
        let summary = d.fetch_all(jobs.clone()).await;

        assert_eq!(summary.failed, 1);
        assert!(!jobs[0].dest.exists());
        assert!(d.touched.is_empty());
    }

    #[test]
    fn test_prune_other_commits() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(COMMIT)).unwrap();
        std::fs::create_dir_all(dir.path().join("0ldc0mm1t")).unwrap();

        let d = dists("https://update", dir.path()).dry_run(true);
        assert_eq!(d.prune_other_commits().unwrap().len(), 1);
        assert!(dir.path().join("0ldc0mm1t").exists());

        let d = dists("https://update", dir.path());
        d.prune_other_commits().unwrap();
        assert!(!dir.path().join("0ldc0mm1t").exists());
        assert!(dir.path().join(COMMIT).exists());
    }
}
