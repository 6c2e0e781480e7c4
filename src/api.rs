//! Homebrew JSON API client with in-memory caching.
//!
//! Only per-formula lookups are needed here: the registry loader asks for the
//! metadata of every installed formula, concurrently, once per run. Results are
//! kept in a [`moka`] cache for the lifetime of the client so a formula that is
//! both a target and a dependency is requested once.

use crate::error::{RekegError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const HOMEBREW_API_BASE: &str = "https://formulae.brew.sh/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Homebrew formula metadata from JSON API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFormula {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub tap: Option<String>,
    #[serde(default)]
    pub oldnames: Vec<String>,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub bottle: Option<Bottle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub stable: Option<String>,
    #[serde(default)]
    pub bottle: bool,
}

/// Bottle file metadata for a specific platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleFile {
    pub cellar: String,
    pub url: String,
    pub sha256: String,
}

/// Bottle metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleData {
    #[serde(default)]
    pub rebuild: u32,
    #[serde(default)]
    pub root_url: Option<String>,
    pub files: HashMap<String, BottleFile>,
}

/// Bottle information from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottle {
    #[serde(default)]
    pub stable: Option<BottleData>,
}

impl ApiFormula {
    /// Stable version plus revision suffix, e.g. `3.3.2_1`
    pub fn pkg_version(&self) -> Option<String> {
        let stable = self.versions.stable.as_ref()?;
        if self.revision > 0 {
            Some(format!("{}_{}", stable, self.revision))
        } else {
            Some(stable.clone())
        }
    }

    /// Stable bottle data together with the file tag usable on this platform
    pub fn bottle_for<'a>(&'a self, platform_tag: &'a str) -> Option<(&'a BottleData, &'a str)> {
        let data = self.bottle.as_ref()?.stable.as_ref()?;
        [platform_tag, "all"]
            .into_iter()
            .find(|tag| data.files.contains_key(*tag))
            .map(|tag| (data, tag))
    }
}

/// Homebrew API client with in-memory caching
#[derive(Clone)]
pub struct BrewApi {
    client: reqwest::Client,
    formula_cache: moka::future::Cache<String, ApiFormula>,
}

impl BrewApi {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(format!("rekeg/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Lasts for the command duration
        let formula_cache = moka::future::Cache::new(1000);

        Ok(Self {
            client,
            formula_cache,
        })
    }

    /// Fetch metadata for a specific formula by name (with in-memory caching).
    ///
    /// # Errors
    ///
    /// Returns [`RekegError::FormulaNotFound`] if the API has no such formula,
    /// which is the case for formulae installed from third-party taps.
    pub async fn fetch_formula(&self, name: &str) -> Result<ApiFormula> {
        if let Some(cached) = self.formula_cache.get(name).await {
            return Ok(cached);
        }

        let url = format!("{}/formula/{}.json", HOMEBREW_API_BASE, name);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        if response.status() == 404 {
            return Err(RekegError::FormulaNotFound(name.to_string()));
        }

        let formula: ApiFormula = response.error_for_status()?.json().await?;

        self.formula_cache
            .insert(name.to_string(), formula.clone())
            .await;

        Ok(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGET_JSON: &str = r#"{
        "name": "wget",
        "full_name": "wget",
        "tap": "homebrew/core",
        "oldnames": [],
        "versions": {"stable": "1.24.5", "head": "HEAD", "bottle": true},
        "revision": 1,
        "dependencies": ["libidn2", "openssl@3"],
        "bottle": {
            "stable": {
                "rebuild": 0,
                "root_url": "https://ghcr.io/v2/homebrew/core",
                "files": {
                    "arm64_sequoia": {"cellar": "/opt/homebrew/Cellar", "url": "https://ghcr.io/x", "sha256": "ab"},
                    "x86_64_linux": {"cellar": "/home/linuxbrew/.linuxbrew/Cellar", "url": "https://ghcr.io/y", "sha256": "cd"}
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_formula() {
        let formula: ApiFormula = serde_json::from_str(WGET_JSON).unwrap();
        assert_eq!(formula.name, "wget");
        assert_eq!(formula.tap.as_deref(), Some("homebrew/core"));
        assert_eq!(formula.dependencies, vec!["libidn2", "openssl@3"]);
        assert_eq!(formula.pkg_version().as_deref(), Some("1.24.5_1"));
    }

    #[test]
    fn test_bottle_for_platform_and_all() {
        let formula: ApiFormula = serde_json::from_str(WGET_JSON).unwrap();
        let (_, tag) = formula.bottle_for("x86_64_linux").unwrap();
        assert_eq!(tag, "x86_64_linux");
        assert!(formula.bottle_for("x86_64_big_sur").is_none());

        let mut universal = formula.clone();
        let data = universal.bottle.as_mut().unwrap().stable.as_mut().unwrap();
        let file = data.files.remove("arm64_sequoia").unwrap();
        data.files.insert("all".to_string(), file);
        let (_, tag) = universal.bottle_for("x86_64_big_sur").unwrap();
        assert_eq!(tag, "all");
    }

    #[test]
    fn test_bottle_tag_outlives_borrowed_platform() {
        let formula: ApiFormula = serde_json::from_str(WGET_JSON).unwrap();
        let tag = {
            let platform = String::from("arm64_sequoia");
            formula
                .bottle_for(&platform)
                .map(|(data, tag)| (data.rebuild, tag.to_string()))
        };
        assert_eq!(tag, Some((0, "arm64_sequoia".to_string())));
    }

    #[test]
    fn test_missing_fields_default() {
        let formula: ApiFormula = serde_json::from_str(r#"{"name": "tiny"}"#).unwrap();
        assert!(formula.pkg_version().is_none());
        assert!(formula.bottle_for("arm64_sequoia").is_none());
        assert!(formula.oldnames.is_empty());
    }

    #[tokio::test]
    #[ignore] // requires network
    async fn test_fetch_formula_live() {
        let api = BrewApi::new().unwrap();
        let formula = api.fetch_formula("wget").await.unwrap();
        assert_eq!(formula.name, "wget");
        assert!(formula.pkg_version().is_some());

        let missing = api.fetch_formula("definitely-not-a-formula-xyz").await;
        assert!(matches!(missing, Err(RekegError::FormulaNotFound(_))));
    }
}
