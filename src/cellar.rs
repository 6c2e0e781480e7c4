//! Cellar access - reading installed kegs, receipts, links and pins

use crate::error::Result;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Source information from install receipt
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceInfo {
    #[serde(default)]
    pub tap: Option<String>,
}

/// Runtime dependency recorded in the install receipt
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeDependency {
    pub full_name: String,
    #[serde(default)]
    pub declared_directly: bool,
}

/// The subset of `INSTALL_RECEIPT.json` this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallReceipt {
    #[serde(default)]
    pub poured_from_bottle: bool,
    #[serde(default)]
    pub used_options: Vec<String>,
    #[serde(default)]
    pub runtime_dependencies: Vec<RuntimeDependency>,
    #[serde(default)]
    pub source: Option<SourceInfo>,
}

impl InstallReceipt {
    /// Read the INSTALL_RECEIPT.json file of a keg
    pub fn read(keg_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(keg_path.join("INSTALL_RECEIPT.json"))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn tap(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.tap.as_deref())
    }

    /// Names of the dependencies the formula declared itself
    pub fn direct_dependencies(&self) -> Vec<String> {
        self.runtime_dependencies
            .iter()
            .filter(|d| d.declared_directly)
            .map(|d| short_name(&d.full_name).to_string())
            .collect()
    }
}

/// One installed version of a formula: `Cellar/<name>/<version>`
///
/// Disk usage is measured on first use, so loading a Cellar never walks kegs
/// that are not sized.
#[derive(Debug, Clone)]
pub struct Keg {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    disk_usage: OnceLock<u64>,
    pub receipt: Option<InstallReceipt>,
}

impl Keg {
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path,
            disk_usage: OnceLock::new(),
            receipt: None,
        }
    }

    /// Read a keg from disk, along with its receipt when one is readable
    pub fn from_path(name: &str, version: &str, path: PathBuf) -> Self {
        let receipt = match InstallReceipt::read(&path) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                tracing::debug!("No readable receipt in {}: {}", path.display(), e);
                None
            }
        };
        let mut keg = Self::new(name, version, path);
        keg.receipt = receipt;
        keg
    }

    pub fn with_disk_usage(mut self, bytes: u64) -> Self {
        self.disk_usage = OnceLock::from(bytes);
        self
    }

    pub fn with_receipt(mut self, receipt: InstallReceipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    /// Bytes used by the keg, walked once and remembered
    pub fn disk_usage(&self) -> u64 {
        *self
            .disk_usage
            .get_or_init(|| calculate_dir_size(&self.path))
    }

    pub fn poured_from_bottle(&self) -> bool {
        self.receipt
            .as_ref()
            .map(|r| r.poured_from_bottle)
            .unwrap_or(false)
    }
}

/// Names of all formulae with a directory in the Cellar, sorted
pub fn installed_formula_names(cellar: &Path) -> Result<Vec<String>> {
    if !cellar.exists() {
        return Ok(vec![]);
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(cellar)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        // Skip hidden files and the symlinks left behind by renames
        if name.starts_with('.') || entry.file_type()?.is_symlink() {
            continue;
        }
        if entry.path().is_dir() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Get all kegs of a specific formula, sorted by version (newest first)
pub fn installed_kegs(cellar: &Path, formula: &str) -> Result<Vec<Keg>> {
    let formula_path = cellar.join(formula);

    if !formula_path.is_dir() {
        return Ok(vec![]);
    }

    let mut kegs = Vec::new();
    for entry in fs::read_dir(&formula_path)? {
        let entry = entry?;
        let version = entry.file_name().to_string_lossy().to_string();

        if version.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        kegs.push(Keg::from_path(formula, &version, entry.path()));
    }

    // [0] is always the newest version
    kegs.sort_by(|a, b| {
        compare_versions(&b.version, &a.version).then_with(|| b.version.cmp(&a.version))
    });
    Ok(kegs)
}

/// Version currently linked through `opt/<name>`, if any
pub fn linked_version(opt: &Path, formula: &str) -> Option<String> {
    let target = fs::read_link(opt.join(formula)).ok()?;
    target
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
}

/// Split `1.2.3_4` into (`1.2.3`, 4). Versions without a revision get 0.
pub fn split_revision(version: &str) -> (&str, u32) {
    if let Some(pos) = version.rfind('_') {
        let suffix = &version[pos + 1..];
        if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
            return (&version[..pos], suffix.parse().unwrap_or(0));
        }
    }
    (version, 0)
}

/// Compare two package versions component by component, then by revision.
///
/// Missing components count as zero, so `3.0` and `3.0.0` are equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_version, a_revision) = split_revision(a);
    let (b_version, b_revision) = split_revision(b);

    let a_parts: Vec<&str> = a_version.split('.').collect();
    let b_parts: Vec<&str> = b_version.split('.').collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let a_part = a_parts.get(i).copied().unwrap_or("0");
        let b_part = b_parts.get(i).copied().unwrap_or("0");
        match compare_component(a_part, b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    a_revision.cmp(&b_revision)
}

/// Leading digits compare as numbers, any suffix (`5a`, `0rc1`) as text
fn compare_component(a: &str, b: &str) -> Ordering {
    fn split(part: &str) -> (u64, &str) {
        let end = part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(part.len());
        (part[..end].parse().unwrap_or(0), &part[end..])
    }

    let (a_number, a_suffix) = split(a);
    let (b_number, b_suffix) = split(b);
    a_number.cmp(&b_number).then_with(|| a_suffix.cmp(b_suffix))
}

/// Read the list of pinned formulae from the tracking file
pub fn read_pinned(pinned_file: &Path) -> Result<Vec<String>> {
    if !pinned_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(pinned_file)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

pub fn write_pinned(pinned_file: &Path, pinned: &[String]) -> Result<()> {
    if let Some(parent) = pinned_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(pinned_file, pinned.join("\n"))?;
    Ok(())
}

/// Calculate the total size of a directory recursively.
///
/// Entries that cannot be read are logged and left out of the total.
pub fn calculate_dir_size(path: &Path) -> u64 {
    let mut total = 0u64;

    if !path.exists() {
        return 0;
    }

    for entry in walkdir::WalkDir::new(path).follow_links(false).max_open(64) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() {
            match entry.metadata() {
                Ok(metadata) => total += metadata.len(),
                Err(e) => tracing::warn!("Cannot size {}: {}", entry.path().display(), e),
            }
        }
    }

    total
}

/// `homebrew/core/foo` -> `foo`
pub fn short_name(full_name: &str) -> &str {
    full_name.rsplit('/').next().unwrap_or(full_name)
}
