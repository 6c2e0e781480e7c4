//! Download/install size estimate for a closure of formulae.

use crate::bottle::BottleFetcher;
use crate::closure::SizedSet;
use crate::error::Result;
use crate::formula::Package;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Aggregate byte counts for a set of bottles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeSummary {
    pub download: u64,
    pub installed: u64,
    /// Installed size minus what the existing kegs already use
    pub net: i64,
}

/// Spinner shown while manifests are fetched, hidden when `hidden`
fn progress_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Sum declared bottle sizes over every bottled package in `set`.
///
/// Packages without a bottle contribute nothing. The first failing fetch
/// aborts the estimate. With `verbose_fetch` each manifest request is
/// announced instead of showing a spinner; `quiet` hides the spinner too.
pub async fn aggregate<P, F>(
    set: &SizedSet<'_, P>,
    fetcher: &F,
    verbose_fetch: bool,
    quiet: bool,
) -> Result<SizeSummary>
where
    P: Package,
    F: BottleFetcher,
{
    let mut summary = SizeSummary::default();
    let spinner = progress_spinner(verbose_fetch || quiet);

    for package in set.iter() {
        let Some(bottle) = package.bottle() else {
            continue;
        };

        spinner.set_message(format!("Fetching bottle size for {}...", package.name().cyan()));
        let info = match fetcher.fetch(package.name(), bottle, !verbose_fetch).await {
            Ok(info) => info,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };

        if let Some(download) = info.download_size {
            summary.download += download;
        }
        if let Some(installed) = info.installed_size {
            summary.installed += installed;
            if !package.kegs().is_empty() {
                summary.net += installed as i64 - package.kegs_disk_usage() as i64;
            }
        }
    }

    spinner.finish_and_clear();
    Ok(summary)
}

/// Print the closure and its size estimate
pub fn print_summary<P: Package>(set: &SizedSet<'_, P>, summary: &SizeSummary) {
    println!(
        "{} Formulae ({}): {}",
        "==>".blue().bold(),
        set.len(),
        set.names().join(", ").cyan()
    );
    println!(
        "{} Download Size: {}",
        "==>".blue().bold(),
        format_size(summary.download).bold()
    );
    println!(
        "{} Install Size: {}",
        "==>".blue().bold(),
        format_size(summary.installed).bold()
    );
    if summary.net != 0 {
        println!(
            "{} Net Install Size: {}",
            "==>".blue().bold(),
            format_signed_size(summary.net).bold()
        );
    }
}

/// Format byte size as human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn format_signed_size(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_size(bytes.unsigned_abs()))
    } else {
        format_size(bytes as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottle::BottleInfo;
    use crate::cellar::Keg;
    use crate::error::RekegError;
    use crate::formula::{BottleRef, Formula};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_signed_size() {
        assert_eq!(format_signed_size(-2048), "-2.00 KB");
        assert_eq!(format_signed_size(0), "0 bytes");
        assert_eq!(format_signed_size(100), "100 bytes");
    }

    struct FixedSizes(HashMap<&'static str, BottleInfo>);

    impl BottleFetcher for FixedSizes {
        async fn fetch(&self, name: &str, _bottle: &BottleRef, _quiet: bool) -> Result<BottleInfo> {
            self.0
                .get(name)
                .copied()
                .ok_or_else(|| RekegError::FormulaNotFound(name.to_string()))
        }
    }

    fn bottled(name: &str) -> Formula {
        Formula::new(name).with_bottle(BottleRef::new(name, "1.0", 0, "all", None))
    }

    fn keg(name: &str, usage: u64) -> Keg {
        Keg::new(name, "0.9", PathBuf::from("/tmp")).with_disk_usage(usage)
    }

    fn sizes(download: Option<u64>, installed: Option<u64>) -> BottleInfo {
        BottleInfo {
            download_size: download,
            installed_size: installed,
        }
    }

    #[tokio::test]
    async fn test_aggregate_net_against_existing_kegs() {
        let upgraded = bottled("upgraded")
            .with_keg(keg("upgraded", 300))
            .with_keg(keg("upgraded", 100));
        let fresh = bottled("fresh");
        let no_installed_size = bottled("partial").with_keg(keg("partial", 50));
        let unbottled = Formula::new("source").with_keg(keg("source", 999));

        let fetcher = FixedSizes(HashMap::from([
            ("upgraded", sizes(Some(100), Some(1000))),
            ("fresh", sizes(Some(20), Some(200))),
            ("partial", sizes(Some(5), None)),
        ]));
        let set = SizedSet::from_packages([&upgraded, &fresh, &no_installed_size, &unbottled]);

        let summary = aggregate(&set, &fetcher, false, false).await.unwrap();
        assert_eq!(summary.download, 125);
        assert_eq!(summary.installed, 1200);
        assert_eq!(summary.net, 600);
    }

    #[tokio::test]
    async fn test_aggregate_unbottled_only_is_zero() {
        let a = Formula::new("a");
        let set = SizedSet::from_packages([&a]);
        let summary = aggregate(&set, &FixedSizes(HashMap::new()), false, false).await.unwrap();
        assert_eq!(summary, SizeSummary::default());
    }

    #[test]
    fn test_spinner_hidden_when_asked() {
        assert!(progress_spinner(true).is_hidden());
    }

    #[tokio::test]
    async fn test_aggregate_quiet_same_totals() {
        let a = bottled("a").with_keg(keg("a", 10));
        let fetcher = FixedSizes(HashMap::from([("a", sizes(Some(3), Some(30)))]));
        let set = SizedSet::from_packages([&a]);

        let loud = aggregate(&set, &fetcher, false, false).await.unwrap();
        let quiet = aggregate(&set, &fetcher, false, true).await.unwrap();
        assert_eq!(loud, quiet);
        assert_eq!(quiet.net, 20);
    }

    #[tokio::test]
    async fn test_aggregate_fails_on_fetch_error() {
        let a = bottled("a");
        let set = SizedSet::from_packages([&a]);
        assert!(aggregate(&set, &FixedSizes(HashMap::new()), false, false).await.is_err());
    }
}
