//! Per-formula reinstall sequence: pin check, migration, reinstall, cleanup.

use crate::backend::{Backend, CaskOptions, ReinstallOptions};
use crate::cask::Cask;
use crate::error::Result;
use crate::formula::Package;
use crate::messages::Messages;
use colored::Colorize;
use std::time::Instant;

/// What the formula pipeline did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReinstallReport {
    pub reinstalled: Vec<String>,
    pub skipped_pinned: Vec<String>,
}

/// Reinstall each target in order.
///
/// Pinned targets are reported and skipped. For every other target the
/// migration, reinstall and cleanup steps run together; the first error
/// abandons the remaining targets.
pub fn reinstall_formulae<P, B>(
    targets: &[&P],
    backend: &B,
    options: &ReinstallOptions,
    messages: &mut Messages,
) -> Result<ReinstallReport>
where
    P: Package,
    B: Backend,
{
    let mut report = ReinstallReport::default();

    for &formula in targets {
        let name = formula.name();

        if formula.is_pinned() {
            println!(
                "{} {} is pinned. You must unpin it to reinstall.",
                "⚠".yellow(),
                name.bold()
            );
            messages.record_skip(name, "pinned");
            report.skipped_pinned.push(name.to_string());
            continue;
        }

        let start = Instant::now();

        backend.migrate(formula, options.force)?;

        if !options.quiet {
            let keg = formula.kegs().first();
            let version = keg.map(|k| k.version.as_str()).unwrap_or_default();
            let receipt = keg.and_then(|k| k.receipt.as_ref());
            let used_options = receipt.map(|r| r.used_options.join(" ")).unwrap_or_default();
            let from_source = receipt.is_some() && !keg.is_some_and(|k| k.poured_from_bottle());

            let mut line = format!("  Reinstalling {} {}", name.cyan(), version.dimmed());
            if !used_options.is_empty() {
                line.push_str(&format!(" with {}", used_options));
            }
            if from_source {
                line.push_str(&format!(" {}", "(built from source)".dimmed()));
            }
            println!("{}", line);
        }

        backend.reinstall(formula, options)?;
        backend.cleanup(formula)?;

        messages.record_timing(name, start.elapsed());
        tracing::info!("Reinstalled {} in {:?}", name, start.elapsed());
        if !options.quiet {
            println!("  {} Reinstalled {}", "✓".green(), name.bold());
        }
        report.reinstalled.push(name.to_string());
    }

    Ok(report)
}

/// Hand every cask to the backend in a single call
pub fn reinstall_casks<B: Backend>(casks: &[Cask], backend: &B, options: &CaskOptions) -> Result<()> {
    if casks.is_empty() {
        return Ok(());
    }

    let tokens: Vec<&str> = casks.iter().map(|c| c.token.as_str()).collect();
    println!(
        "Reinstalling {} cask{}: {}",
        casks.len().to_string().bold(),
        if casks.len() == 1 { "" } else { "s" },
        tokens.join(", ").cyan()
    );
    backend.reinstall_casks(casks, options)
}
