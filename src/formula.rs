//! Package model: the queries the reinstall core makes against formulae.
//!
//! The closure builder, size aggregator and pipeline are written against the
//! [`Package`] and [`Registry`] traits. [`Formula`] and [`Formulary`] are the
//! concrete model, built by [`Formulary::load`] from the Cellar plus the
//! Homebrew JSON API.

use crate::api::{ApiFormula, BrewApi};
use crate::cellar::{self, Keg, compare_versions};
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const DEFAULT_BOTTLE_ROOT: &str = "https://ghcr.io/v2/homebrew/core";

/// Where the bottle manifest of a formula lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleRef {
    /// Registry root, e.g. `https://ghcr.io/v2/homebrew/core`
    pub root_url: String,
    /// Repository name inside the registry (`@` -> `/`, `+` -> `x`)
    pub image_name: String,
    /// Manifest tag: package version, plus `.<rebuild>` when rebuilt
    pub manifest_tag: String,
    /// Bottle tag selected for this platform (`arm64_sequoia`, `all`, ...)
    pub platform_tag: String,
}

impl BottleRef {
    pub fn new(
        formula: &str,
        pkg_version: &str,
        rebuild: u32,
        platform_tag: &str,
        root_url: Option<&str>,
    ) -> Self {
        let manifest_tag = if rebuild > 0 {
            format!("{}.{}", pkg_version, rebuild)
        } else {
            pkg_version.to_string()
        };
        Self {
            root_url: root_url
                .unwrap_or(DEFAULT_BOTTLE_ROOT)
                .trim_end_matches('/')
                .to_string(),
            image_name: formula.replace('@', "/").replace('+', "x"),
            manifest_tag,
            platform_tag: platform_tag.to_string(),
        }
    }

    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}/manifests/{}",
            self.root_url, self.image_name, self.manifest_tag
        )
    }

    /// Value of `org.opencontainers.image.ref.name` for this platform's image
    pub fn image_ref(&self) -> String {
        format!("{}.{}", self.manifest_tag, self.platform_tag)
    }
}

/// Read-only view of a formula as seen by the reinstall core
pub trait Package {
    fn name(&self) -> &str;

    /// Names of the direct runtime dependencies
    fn dependencies(&self) -> &[String];

    fn is_pinned(&self) -> bool;

    fn is_outdated(&self) -> bool;

    /// Bottle available for the current platform
    fn bottle(&self) -> Option<&BottleRef>;

    fn is_bottled(&self) -> bool {
        self.bottle().is_some()
    }

    /// Installed kegs, newest first
    fn kegs(&self) -> &[Keg];

    fn kegs_disk_usage(&self) -> u64 {
        self.kegs().iter().map(Keg::disk_usage).sum()
    }

    /// Names this formula was previously known under
    fn oldnames(&self) -> &[String] {
        &[]
    }

    fn tap(&self) -> Option<&str> {
        None
    }
}

/// Lookup of packages by name
pub trait Registry {
    type Package: Package;

    fn get(&self, name: &str) -> Option<&Self::Package>;

    /// Every package with at least one installed keg, in a stable order
    fn installed(&self) -> Vec<&Self::Package>;
}

/// A formula with its installed kegs and API metadata
#[derive(Debug, Clone)]
pub struct Formula {
    name: String,
    dependencies: Vec<String>,
    pinned: bool,
    outdated: bool,
    bottle: Option<BottleRef>,
    kegs: Vec<Keg>,
    oldnames: Vec<String>,
    tap: Option<String>,
    pkg_version: Option<String>,
}

impl Formula {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            pinned: false,
            outdated: false,
            bottle: None,
            kegs: Vec::new(),
            oldnames: Vec::new(),
            tap: None,
            pkg_version: None,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn outdated(mut self, outdated: bool) -> Self {
        self.outdated = outdated;
        self
    }

    pub fn with_bottle(mut self, bottle: BottleRef) -> Self {
        self.bottle = Some(bottle);
        self
    }

    pub fn with_keg(mut self, keg: Keg) -> Self {
        self.kegs.push(keg);
        self
    }

    pub fn with_oldnames<I, S>(mut self, oldnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.oldnames = oldnames.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tap(mut self, tap: impl Into<String>) -> Self {
        self.tap = Some(tap.into());
        self
    }

    pub fn with_pkg_version(mut self, version: impl Into<String>) -> Self {
        self.pkg_version = Some(version.into());
        self
    }

    /// Latest version known to the API, with revision
    pub fn pkg_version(&self) -> Option<&str> {
        self.pkg_version.as_deref()
    }

    /// Build the model for an installed formula.
    ///
    /// Without API metadata (tap formulae, offline) dependencies come from the
    /// newest keg's receipt and the formula is never considered outdated or
    /// bottled.
    fn from_parts(
        name: &str,
        kegs: Vec<Keg>,
        api: Option<&ApiFormula>,
        pinned: bool,
        platform_tag: &str,
    ) -> Self {
        let receipt = kegs.first().and_then(|k| k.receipt.as_ref());

        let mut formula = Formula::new(name).pinned(pinned);
        formula.tap = receipt.and_then(|r| r.tap()).map(String::from);

        match api {
            Some(api) => {
                formula.dependencies = api.dependencies.clone();
                formula.oldnames = api.oldnames.clone();
                if api.tap.is_some() {
                    formula.tap = api.tap.clone();
                }
                if let Some(pkg_version) = api.pkg_version() {
                    // HEAD builds track the repository, not a release
                    formula.outdated = kegs.first().is_some_and(|newest| {
                        !newest.version.starts_with("HEAD")
                            && compare_versions(&newest.version, &pkg_version) == Ordering::Less
                    });
                    formula.bottle = api.bottle_for(platform_tag).map(|(data, tag)| {
                        BottleRef::new(
                            name,
                            &pkg_version,
                            data.rebuild,
                            tag,
                            data.root_url.as_deref(),
                        )
                    });
                    formula.pkg_version = Some(pkg_version);
                }
            }
            None => {
                formula.dependencies = receipt
                    .map(|r| r.direct_dependencies())
                    .unwrap_or_default();
            }
        }

        formula.kegs = kegs;
        formula
    }
}

impl Package for Formula {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn is_outdated(&self) -> bool {
        self.outdated
    }

    fn bottle(&self) -> Option<&BottleRef> {
        self.bottle.as_ref()
    }

    fn kegs(&self) -> &[Keg] {
        &self.kegs
    }

    fn oldnames(&self) -> &[String] {
        &self.oldnames
    }

    fn tap(&self) -> Option<&str> {
        self.tap.as_deref()
    }
}

/// In-memory registry of formulae
#[derive(Debug, Clone, Default)]
pub struct Formulary {
    formulae: HashMap<String, Formula>,
    order: Vec<String>,
    /// Old rack name -> current formula name
    renames: HashMap<String, String>,
}

impl Formulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a formula, replacing any previous entry with the same name
    pub fn insert(&mut self, formula: Formula) {
        if !self.formulae.contains_key(formula.name()) {
            self.order.push(formula.name().to_string());
        }
        self.formulae.insert(formula.name().to_string(), formula);
    }

    pub fn len(&self) -> usize {
        self.formulae.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulae.is_empty()
    }

    /// Load every installed formula from the Cellar, with API metadata fetched
    /// concurrently.
    ///
    /// `requested` names without a rack of their own are looked up too, so a
    /// formula whose old name is still in the Cellar resolves under its new
    /// name.
    pub async fn load(
        config: &Config,
        api: &BrewApi,
        platform_tag: &str,
        requested: &[String],
        quiet: bool,
    ) -> Result<Self> {
        let mut names = cellar::installed_formula_names(&config.cellar())?;
        let racks = names.len();
        for name in requested {
            let name = cellar::short_name(name);
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!(
            "Reading {} installed formulae...",
            racks.to_string().bold()
        ));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let fetch_futures: Vec<_> = names
            .iter()
            .map(|name| async move {
                match api.fetch_formula(name).await {
                    Ok(formula) => Some((name.clone(), formula)),
                    Err(e) => {
                        tracing::debug!("No API metadata for {}: {}", name, e);
                        None
                    }
                }
            })
            .collect();
        let metadata: HashMap<String, ApiFormula> = futures::future::join_all(fetch_futures)
            .await
            .into_iter()
            .flatten()
            .collect();

        spinner.finish_and_clear();
        let formulary = Self::assemble(config, &metadata, platform_tag)?;
        tracing::debug!("Loaded {} installed formulae", formulary.len());
        Ok(formulary)
    }

    /// Build the registry from the Cellar and already fetched API metadata.
    ///
    /// A rack with no formula of its own that is listed in another formula's
    /// `oldnames` is loaded under that formula's name and can be looked up
    /// by either. Racks that cannot be read are skipped.
    pub fn assemble(
        config: &Config,
        metadata: &HashMap<String, ApiFormula>,
        platform_tag: &str,
    ) -> Result<Self> {
        let cellar = config.cellar();
        let racks = cellar::installed_formula_names(&cellar)?;
        let pinned: HashSet<String> = cellar::read_pinned(&config.pinned_file())?
            .into_iter()
            .collect();

        let has_rack = |name: &str| racks.iter().any(|r| r == name);
        let mut renamed: HashMap<&str, &ApiFormula> = HashMap::new();
        for api_formula in metadata.values() {
            if has_rack(api_formula.name.as_str()) {
                continue;
            }
            if let Some(oldname) = api_formula.oldnames.iter().find(|o| has_rack(o.as_str())) {
                tracing::debug!("{} is installed as {}", api_formula.name, oldname);
                renamed.insert(oldname.as_str(), api_formula);
            }
        }

        let mut formulary = Formulary::new();
        for rack in &racks {
            let kegs = match cellar::installed_kegs(&cellar, rack) {
                Ok(kegs) => kegs,
                Err(e) => {
                    tracing::warn!("Skipping unreadable rack {}: {}", rack, e);
                    continue;
                }
            };

            let (name, api_formula) = match renamed.get(rack.as_str()) {
                Some(api_formula) => (api_formula.name.as_str(), Some(*api_formula)),
                None => (rack.as_str(), metadata.get(rack)),
            };
            let is_pinned = pinned.contains(name) || pinned.contains(rack);
            formulary.insert(Formula::from_parts(
                name,
                kegs,
                api_formula,
                is_pinned,
                platform_tag,
            ));
            if name != rack.as_str() {
                formulary.renames.insert(rack.clone(), name.to_string());
            }
        }

        Ok(formulary)
    }
}

impl Registry for Formulary {
    type Package = Formula;

    fn get(&self, name: &str) -> Option<&Formula> {
        let name = cellar::short_name(name);
        self.formulae.get(name).or_else(|| {
            self.renames
                .get(name)
                .and_then(|current| self.formulae.get(current))
        })
    }

    fn installed(&self) -> Vec<&Formula> {
        self.order
            .iter()
            .filter_map(|name| self.formulae.get(name))
            .filter(|f| !f.kegs().is_empty())
            .collect()
    }
}
