//! Asset resolver: asks the marketplace which package variants exist for an
//! extension version and picks the ones worth fetching.

use std::collections::BTreeMap;

use dlvsix_schema::{ExtensionIdentity, ExtensionVersion, VariantTarget};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

/// Asset type of the installable package in a version's file list.
pub const VSIX_ASSET_TYPE: &str = "Microsoft.VisualStudio.Services.VSIXPackage";

/// Marketplace target product filter.
const TARGET_PRODUCT: &str = "Microsoft.VisualStudio.Code";

/// Query API version the marketplace expects in `Accept`.
const ACCEPT: &str = "application/json;api-version=3.0-preview.1";

/// Criteria filter: exact extension id.
const FILTER_EXTENSION_NAME: u32 = 7;

/// Criteria filter: target product.
const FILTER_TARGET: u32 = 8;

/// Include versions and their files.
const FLAGS_VERSIONS_AND_FILES: u32 = 3;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid marketplace URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Marketplace request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    extensions: Vec<RemoteExtension>,
}

/// One extension as the marketplace describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteExtension {
    #[serde(default)]
    pub versions: Vec<RemoteVersion>,
}

/// One published build of an extension. A version string repeats once per
/// target platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVersion {
    pub version: String,
    #[serde(default)]
    pub target_platform: Option<String>,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub asset_type: String,
    pub source: String,
}

/// A downloadable package for one platform (or universal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVariant {
    pub target: VariantTarget,
    pub url: String,
}

/// Marketplace gallery client.
#[derive(Debug, Clone)]
pub struct Marketplace {
    client: Client,
    query_url: Url,
}

impl Marketplace {
    /// Create a client for the gallery at `service_url`.
    pub fn new(client: Client, service_url: &str) -> Result<Self, ResolveError> {
        let base = format!("{}/extensionquery", service_url.trim_end_matches('/'));
        let query_url = Url::parse(&base).map_err(|source| ResolveError::InvalidUrl {
            url: service_url.to_string(),
            source,
        })?;
        Ok(Self { client, query_url })
    }

    /// Look up `identity`. Returns `None` if the marketplace has no record of it.
    pub async fn query(
        &self,
        identity: &ExtensionIdentity,
    ) -> Result<Option<RemoteExtension>, ResolveError> {
        let body = json!({
            "filters": [{
                "criteria": [
                    { "filterType": FILTER_EXTENSION_NAME, "value": identity.to_string() },
                    { "filterType": FILTER_TARGET, "value": TARGET_PRODUCT },
                ]
            }],
            "flags": FLAGS_VERSIONS_AND_FILES,
        });

        let response: QueryResponse = self
            .client
            .post(self.query_url.clone())
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.extensions.into_iter().next()))
    }

    /// Resolve the variants to fetch for `identity` at exactly `version`.
    ///
    /// An extension the marketplace does not know, or a version it does not
    /// list, yields an empty set rather than an error.
    pub async fn resolve_variants(
        &self,
        identity: &ExtensionIdentity,
        version: &ExtensionVersion,
    ) -> Result<Vec<RemoteVariant>, ResolveError> {
        let Some(extension) = self.query(identity).await? else {
            tracing::warn!("Unable to find {identity} in marketplace. Skipping.");
            return Ok(Vec::new());
        };

        let variants = select_variants(&extension, version);
        if variants.is_empty() {
            tracing::warn!("No package for {identity} {version} in marketplace");
        }
        Ok(variants)
    }
}

/// Pick one package per target for `version` out of a marketplace record.
///
/// The universal package is dropped whenever a platform-specific one exists.
/// Targets outside the known platform set are ignored.
pub fn select_variants(
    extension: &RemoteExtension,
    version: &ExtensionVersion,
) -> Vec<RemoteVariant> {
    let mut sources: BTreeMap<VariantTarget, String> = BTreeMap::new();

    for v in extension.versions.iter().filter(|v| *version == *v.version) {
        let Some(target) = VariantTarget::from_marketplace(v.target_platform.as_deref()) else {
            tracing::debug!(
                "Ignoring unknown target platform {:?}",
                v.target_platform.as_deref()
            );
            continue;
        };
        if let Some(file) = v.files.iter().find(|f| f.asset_type == VSIX_ASSET_TYPE) {
            sources.insert(target, file.source.clone());
        }
    }

    if sources.len() > 1 {
        sources.remove(&VariantTarget::Universal);
    }

    sources
        .into_iter()
        .map(|(target, url)| RemoteVariant { target, url })
        .collect()
}
