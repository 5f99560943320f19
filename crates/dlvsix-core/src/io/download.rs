//! Streaming downloads with optional SHA256 verification.
//!
//! Bytes go to a temporary file in the destination directory and are renamed
//! onto the destination only once the transfer (and the hash check, if any)
//! succeeded. An interrupted download leaves nothing at the destination path.

use std::path::Path;

use dlvsix_schema::Sha256Digest;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Prefix of in-flight download files.
pub const PARTIAL_PREFIX: &str = ".dlvsix-";

/// Suffix of in-flight download files.
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Request for a download operation
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    pub client: &'a Client,
    pub url: &'a str,
    pub dest: &'a Path,
    pub expected_hash: Option<&'a Sha256Digest>,
    pub reporter: &'a R,
}

impl<'a, R: Reporter + ?Sized> DownloadRequest<'a, R> {
    pub fn new(client: &'a Client, url: &'a str, dest: &'a Path, reporter: &'a R) -> Self {
        Self {
            client,
            url,
            dest,
            expected_hash: None,
            reporter,
        }
    }

    /// Verify the downloaded bytes against `digest` before committing them.
    pub fn with_sha256(mut self, digest: &'a Sha256Digest) -> Self {
        self.expected_hash = Some(digest);
        self
    }

    /// Execute the download. Returns the SHA256 of the bytes written.
    pub async fn execute(self) -> Result<String, DownloadError> {
        download_and_verify(self).await
    }
}

/// Streams `req.url` into `req.dest`, hashing as it goes.
pub async fn download_and_verify<R: Reporter + ?Sized>(
    req: DownloadRequest<'_, R>,
) -> Result<String, DownloadError> {
    let label = req
        .dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| req.url.to_string());

    let parent = req
        .dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await?;

    tracing::debug!("Downloading {} -> {}", req.url, req.dest.display());

    let response = req
        .client
        .get(req.url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length();
    req.reporter.downloading(&label, 0, total_size);

    // Dropping the TempPath on any early return removes the partial file.
    let (std_file, temp_path) = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(parent)?
        .into_parts();
    let mut file = File::from_std(std_file);

    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        req.reporter.downloading(&label, downloaded, total_size);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    let actual_hash = hex::encode(hasher.finalize());

    if let Some(expected) = req.expected_hash {
        if !expected.matches(&actual_hash) {
            req.reporter.failed(&label, "hash mismatch");
            return Err(DownloadError::HashMismatch {
                expected: expected.to_string(),
                actual: actual_hash,
            });
        }
    }

    temp_path
        .persist(req.dest)
        .map_err(|e| DownloadError::Io(e.error))?;

    req.reporter.done(&label, "downloaded", Some(downloaded));
    Ok(actual_hash)
}
