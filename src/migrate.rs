//! Migration of kegs installed under a formula's former name.
//!
//! When a formula is renamed, existing installs stay in `Cellar/<oldname>`.
//! Before reinstalling, those kegs are moved under the new name so the
//! reinstall and the following cleanup see a single formula.

use crate::cellar;
use crate::config::Config;
use crate::error::Result;
use crate::formula::Package;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    NotNeeded,
    Migrated { from: String, kegs: Vec<String> },
    Refused { from: String, reason: String },
}

/// A real (non-symlink) Cellar directory left under a former name
fn pending_oldname<'a, P: Package>(cellar: &Path, formula: &'a P) -> Option<&'a str> {
    formula
        .oldnames()
        .iter()
        .map(String::as_str)
        .find(|old| {
            let dir = cellar.join(old);
            fs::symlink_metadata(&dir)
                .map(|m| m.is_dir())
                .unwrap_or(false)
        })
}

pub fn migrate_if_needed<P: Package>(
    config: &Config,
    formula: &P,
    force: bool,
) -> Result<MigrationOutcome> {
    let cellar = config.cellar();
    let Some(oldname) = pending_oldname(&cellar, formula) else {
        return Ok(MigrationOutcome::NotNeeded);
    };
    let newname = formula.name();

    let old_kegs = cellar::installed_kegs(&cellar, oldname)?;
    let old_tap = old_kegs
        .first()
        .and_then(|k| k.receipt.as_ref())
        .and_then(|r| r.tap());

    if let (Some(old_tap), Some(new_tap)) = (old_tap, formula.tap())
        && old_tap != new_tap
        && !force
    {
        let reason = format!(
            "{} from {} is given priority over {} from {}. Use --force to migrate anyway.",
            oldname, old_tap, newname, new_tap
        );
        println!("{} {}", "✗".red(), reason);
        return Ok(MigrationOutcome::Refused {
            from: oldname.to_string(),
            reason,
        });
    }

    println!(
        "{} Migrating formula {} to {}",
        "==>".blue().bold(),
        oldname.cyan(),
        newname.cyan()
    );

    let new_dir = cellar.join(newname);
    fs::create_dir_all(&new_dir)?;

    let mut moved = Vec::new();
    for keg in &old_kegs {
        let target = new_dir.join(&keg.version);
        if target.exists() {
            tracing::warn!(
                "{} {} already exists, leaving {} in place",
                newname,
                keg.version,
                keg.path.display()
            );
            continue;
        }
        fs::rename(&keg.path, &target)?;
        println!("  {} Moved {} {}", "✓".green(), oldname, keg.version.dimmed());
        moved.push(keg.version.clone());
    }

    let old_dir = cellar.join(oldname);
    if fs::read_dir(&old_dir)?.next().is_none() {
        fs::remove_dir(&old_dir)?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(newname, &old_dir)?;
    }

    let old_opt = config.opt().join(oldname);
    if fs::symlink_metadata(&old_opt)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
    {
        fs::remove_file(&old_opt)?;
    }

    let pinned_file = config.pinned_file();
    let mut pinned = cellar::read_pinned(&pinned_file)?;
    if pinned.iter().any(|p| p == oldname) {
        pinned.retain(|p| p != oldname && p != newname);
        pinned.push(newname.to_string());
        cellar::write_pinned(&pinned_file, &pinned)?;
    }

    Ok(MigrationOutcome::Migrated {
        from: oldname.to_string(),
        kegs: moved,
    })
}
