//! Runtime configuration read from the environment.
//!
//! All toggles are read once at startup and the resulting [`Config`] is passed
//! explicitly to the closure builder, the dependent pass and the cleanup
//! backend. Nothing below reads the environment after construction.

use std::path::PathBuf;

const DEFAULT_PERIODIC_FULL_DAYS: u64 = 30;
const DEFAULT_MAX_AGE_DAYS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Config {
    /// Homebrew prefix (contains `Cellar/`, `Caskroom/`, `opt/`, `var/`)
    pub prefix: PathBuf,
    /// Download cache and cleanup stamp location
    pub cache_dir: PathBuf,
    /// Skip the installed-dependents expansion and upgrade pass
    pub no_installed_dependents_check: bool,
    /// Skip per-formula and periodic cleanup
    pub no_install_cleanup: bool,
    /// Behave as if `--ask` was passed
    pub ask: bool,
    pub cleanup_periodic_full_days: u64,
    pub cleanup_max_age_days: u64,
    /// Formulae that cleanup must never touch
    pub no_cleanup_formulae: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let prefix = lookup("HOMEBREW_PREFIX")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_prefix);

        let cache_dir = lookup("HOMEBREW_CACHE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| lookup("XDG_CACHE_HOME").map(|c| PathBuf::from(c).join("rekeg")))
            .or_else(|| lookup("HOME").map(|h| PathBuf::from(h).join(".cache/rekeg")))
            .unwrap_or_else(|| PathBuf::from(".cache/rekeg"));

        let no_cleanup_formulae = lookup("HOMEBREW_NO_CLEANUP_FORMULAE")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            prefix,
            cache_dir,
            no_installed_dependents_check: flag(
                lookup("HOMEBREW_NO_INSTALLED_DEPENDENTS_CHECK").as_deref(),
            ),
            no_install_cleanup: flag(lookup("HOMEBREW_NO_INSTALL_CLEANUP").as_deref()),
            ask: flag(lookup("HOMEBREW_ASK").as_deref()),
            cleanup_periodic_full_days: number(
                lookup("HOMEBREW_CLEANUP_PERIODIC_FULL_DAYS").as_deref(),
                DEFAULT_PERIODIC_FULL_DAYS,
            ),
            cleanup_max_age_days: number(
                lookup("HOMEBREW_CLEANUP_MAX_AGE_DAYS").as_deref(),
                DEFAULT_MAX_AGE_DAYS,
            ),
            no_cleanup_formulae,
        }
    }

    pub fn cellar(&self) -> PathBuf {
        self.prefix.join("Cellar")
    }

    pub fn caskroom(&self) -> PathBuf {
        self.prefix.join("Caskroom")
    }

    pub fn opt(&self) -> PathBuf {
        self.prefix.join("opt")
    }

    pub fn pinned_file(&self) -> PathBuf {
        self.prefix.join("var/homebrew/pinned_formulae")
    }

    pub fn cleanup_stamp(&self) -> PathBuf {
        self.cache_dir.join(".cleaned")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join("downloads")
    }
}

/// Detect the Homebrew prefix by architecture
fn default_prefix() -> PathBuf {
    #[cfg(target_arch = "aarch64")]
    {
        PathBuf::from("/opt/homebrew")
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        PathBuf::from("/usr/local")
    }
}

fn flag(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => {
            let v = v.trim().to_ascii_lowercase();
            !matches!(v.as_str(), "" | "0" | "false" | "no" | "off")
        }
    }
}

fn number(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[("HOME", "/home/me")]);
        assert!(!config.no_installed_dependents_check);
        assert!(!config.no_install_cleanup);
        assert!(!config.ask);
        assert_eq!(config.cleanup_periodic_full_days, 30);
        assert_eq!(config.cleanup_max_age_days, 120);
        assert_eq!(config.cache_dir, PathBuf::from("/home/me/.cache/rekeg"));
        assert!(config.no_cleanup_formulae.is_empty());
    }

    #[test]
    fn test_flag_values() {
        assert!(flag(Some("1")));
        assert!(flag(Some("yes")));
        assert!(flag(Some("TRUE")));
        assert!(!flag(Some("")));
        assert!(!flag(Some("0")));
        assert!(!flag(Some("Off")));
        assert!(!flag(None));
    }

    #[test]
    fn test_toggles_and_paths() {
        let config = config_with(&[
            ("HOMEBREW_PREFIX", "/tmp/brew"),
            ("HOMEBREW_CACHE", "/tmp/cache"),
            ("HOMEBREW_NO_INSTALLED_DEPENDENTS_CHECK", "1"),
            ("HOMEBREW_NO_INSTALL_CLEANUP", "1"),
            ("HOMEBREW_ASK", "1"),
            ("HOMEBREW_CLEANUP_PERIODIC_FULL_DAYS", "7"),
            ("HOMEBREW_CLEANUP_MAX_AGE_DAYS", "not-a-number"),
            ("HOMEBREW_NO_CLEANUP_FORMULAE", "git, node,,"),
        ]);
        assert!(config.no_installed_dependents_check);
        assert!(config.no_install_cleanup);
        assert!(config.ask);
        assert_eq!(config.cleanup_periodic_full_days, 7);
        assert_eq!(config.cleanup_max_age_days, 120);
        assert_eq!(config.no_cleanup_formulae, vec!["git", "node"]);
        assert_eq!(config.cellar(), PathBuf::from("/tmp/brew/Cellar"));
        assert_eq!(
            config.pinned_file(),
            PathBuf::from("/tmp/brew/var/homebrew/pinned_formulae")
        );
        assert_eq!(config.cleanup_stamp(), PathBuf::from("/tmp/cache/.cleaned"));
    }
}
