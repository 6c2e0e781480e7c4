//! Removal of stale kegs after a reinstall, and the periodic full sweep.

use crate::cellar::{self, Keg};
use crate::config::Config;
use crate::error::Result;
use crate::sizing::format_size;
use chrono::{DateTime, TimeDelta, Utc};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

/// What a cleanup removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub freed: u64,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.removed.extend(other.removed);
        self.freed += other.freed;
    }
}

/// Kegs that can go: everything except the newest and the linked one.
///
/// `kegs` must be sorted newest first.
pub fn stale_kegs<'a>(kegs: &'a [Keg], linked: Option<&str>) -> Vec<&'a Keg> {
    kegs.iter()
        .skip(1)
        .filter(|keg| Some(keg.version.as_str()) != linked)
        .collect()
}

fn skip_reason(config: &Config, name: &str, pinned: bool) -> Option<&'static str> {
    if config.no_install_cleanup {
        Some("install cleanup disabled")
    } else if pinned {
        Some("pinned")
    } else if config.no_cleanup_formulae.iter().any(|f| f == name) {
        Some("listed in HOMEBREW_NO_CLEANUP_FORMULAE")
    } else {
        None
    }
}

/// Remove the stale kegs of one formula
pub fn cleanup_formula(config: &Config, name: &str, pinned: bool) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    if let Some(reason) = skip_reason(config, name, pinned) {
        tracing::debug!("Not cleaning up {}: {}", name, reason);
        return Ok(report);
    }

    let kegs = cellar::installed_kegs(&config.cellar(), name)?;
    let linked = cellar::linked_version(&config.opt(), name);

    for keg in stale_kegs(&kegs, linked.as_deref()) {
        let size = keg.disk_usage();
        println!(
            "  Removing {} {} ({})",
            keg.name.cyan(),
            keg.version.dimmed(),
            format_size(size).dimmed()
        );
        fs::remove_dir_all(&keg.path)?;
        report.freed += size;
        report.removed.push(keg.path.clone());
    }

    Ok(report)
}

/// `count` days as a duration; `None` past what chrono can represent
fn days(count: u64) -> Option<TimeDelta> {
    i64::try_from(count).ok().and_then(TimeDelta::try_days)
}

/// Whether the periodic sweep should run at `now`
pub fn periodic_clean_due(config: &Config, now: DateTime<Utc>) -> bool {
    if config.no_install_cleanup {
        return false;
    }

    let Ok(modified) = fs::metadata(config.cleanup_stamp()).and_then(|m| m.modified()) else {
        return true;
    };
    let last_run: DateTime<Utc> = modified.into();
    // An unrepresentable period never elapses
    days(config.cleanup_periodic_full_days).is_some_and(|period| now - last_run > period)
}

/// Delete cached downloads older than the configured maximum age
fn prune_downloads(config: &Config, now: DateTime<Utc>) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    let downloads = config.downloads_dir();
    if !downloads.is_dir() {
        return Ok(report);
    }

    let Some(max_age) = days(config.cleanup_max_age_days) else {
        tracing::debug!(
            "Keeping downloads: max age of {} days never expires",
            config.cleanup_max_age_days
        );
        return Ok(report);
    };
    for entry in fs::read_dir(&downloads)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified: DateTime<Utc> = metadata.modified()?.into();
        if now - modified > max_age {
            fs::remove_file(entry.path())?;
            report.freed += metadata.len();
            report.removed.push(entry.path());
        }
    }

    Ok(report)
}

/// Run a full sweep if one is due; `None` when nothing ran.
pub fn periodic_cleanup(config: &Config, now: DateTime<Utc>) -> Result<Option<CleanupReport>> {
    if !periodic_clean_due(config, now) {
        return Ok(None);
    }

    println!(
        "{} `rekeg` cleanup has not been run in the last {} days, running now...",
        "==>".blue().bold(),
        config.cleanup_periodic_full_days
    );
    println!("Disable this behaviour by setting HOMEBREW_NO_INSTALL_CLEANUP.");

    let pinned = cellar::read_pinned(&config.pinned_file())?;
    let mut report = CleanupReport::default();
    for name in cellar::installed_formula_names(&config.cellar())? {
        let is_pinned = pinned.contains(&name);
        report.merge(cleanup_formula(config, &name, is_pinned)?);
    }
    report.merge(prune_downloads(config, now)?);

    fs::create_dir_all(&config.cache_dir)?;
    let stamp = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(config.cleanup_stamp())?;
    stamp.set_modified(now.into())?;

    if report.removed.is_empty() {
        println!("{} Nothing to clean up", "✓".green());
    } else {
        println!(
            "{} Removed {} items, freed {}",
            "✓".green().bold(),
            report.removed.len().to_string().bold(),
            format_size(report.freed).bold()
        );
    }

    Ok(Some(report))
}
