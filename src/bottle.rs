//! Bottle metadata retrieval.
//!
//! Declared sizes are published as annotations on the OCI image index that
//! GitHub Packages serves for every bottle:
//!
//! ```text
//! GET https://ghcr.io/v2/homebrew/core/<image>/manifests/<version>
//! manifests[].annotations["org.opencontainers.image.ref.name"] = "<version>.<tag>"
//! manifests[].annotations["sh.brew.bottle.size"]                = download bytes
//! manifests[].annotations["sh.brew.bottle.installed_size"]      = installed bytes
//! ```

use crate::error::{RekegError, Result};
use crate::formula::BottleRef;
use colored::Colorize;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";
// Anonymous token accepted by ghcr.io for public images
const ANONYMOUS_TOKEN: &str = "QQ==";

const REF_NAME: &str = "org.opencontainers.image.ref.name";
const SIZE: &str = "sh.brew.bottle.size";
const INSTALLED_SIZE: &str = "sh.brew.bottle.installed_size";

/// Declared sizes of a bottle; either may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BottleInfo {
    pub download_size: Option<u64>,
    pub installed_size: Option<u64>,
}

/// Source of bottle metadata
#[allow(async_fn_in_trait)]
pub trait BottleFetcher {
    /// Fetch the metadata of one bottle. `quiet` suppresses progress output.
    async fn fetch(&self, name: &str, bottle: &BottleRef, quiet: bool) -> Result<BottleInfo>;
}

#[derive(Debug, Deserialize)]
struct ImageIndex {
    #[serde(default)]
    manifests: Vec<ImageManifest>,
}

#[derive(Debug, Deserialize)]
struct ImageManifest {
    #[serde(default)]
    annotations: HashMap<String, String>,
}

/// Extract the sizes for `image_ref` from an image index document
pub fn parse_image_index(json: &str, image_ref: &str) -> Result<BottleInfo> {
    let index: ImageIndex = serde_json::from_str(json)?;

    let Some(manifest) = index
        .manifests
        .iter()
        .find(|m| m.annotations.get(REF_NAME).map(String::as_str) == Some(image_ref))
    else {
        tracing::debug!("No manifest annotated with {}", image_ref);
        return Ok(BottleInfo::default());
    };

    let size = |key: &str| {
        manifest
            .annotations
            .get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    Ok(BottleInfo {
        download_size: size(SIZE),
        installed_size: size(INSTALLED_SIZE),
    })
}

/// Fetches bottle manifests from GitHub Packages, caching per manifest URL
#[derive(Clone)]
pub struct GhcrBottleFetcher {
    client: reqwest::Client,
    cache: moka::future::Cache<String, BottleInfo>,
}

impl GhcrBottleFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("rekeg/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            cache: moka::future::Cache::new(500),
        })
    }
}

impl BottleFetcher for GhcrBottleFetcher {
    async fn fetch(&self, name: &str, bottle: &BottleRef, quiet: bool) -> Result<BottleInfo> {
        let url = bottle.manifest_url();
        let key = format!("{}#{}", url, bottle.platform_tag);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        if !quiet {
            println!("  Fetching manifest for {}", name.cyan());
        }
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, INDEX_MEDIA_TYPE)
            .bearer_auth(ANONYMOUS_TOKEN)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RekegError::ManifestUnavailable {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let info = parse_image_index(&body, &bottle.image_ref())?;
        self.cache.insert(key, info).await;

        Ok(info)
    }
}
