//! The mutating steps of a reinstall, behind one trait.
//!
//! The pipeline only decides what runs and in which order; every step that
//! touches the prefix goes through a [`Backend`]. [`BrewBackend`] is the
//! production implementation: migration and cleanup are done natively, the
//! build/pour step and cask handling are delegated to `brew`.

use crate::cask::Cask;
use crate::config::Config;
use crate::error::Result;
use crate::formula::Package;
use crate::{brew, cleanup, devtools, migrate};

/// Formula options carried from the command line into each reinstall
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReinstallOptions {
    pub build_from_source: bool,
    pub force_bottle: bool,
    pub interactive: bool,
    pub keep_tmp: bool,
    pub debug_symbols: bool,
    pub force: bool,
    pub debug: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub git: bool,
    pub display_times: bool,
}

impl ReinstallOptions {
    /// Flags for `brew reinstall`
    pub fn reinstall_args(&self) -> Vec<&'static str> {
        let mut args = self.upgrade_args();
        if self.git {
            args.push("--git");
        }
        args
    }

    /// Flags for `brew upgrade` when upgrading dependents
    pub fn upgrade_args(&self) -> Vec<&'static str> {
        [
            (self.build_from_source, "--build-from-source"),
            (self.force_bottle, "--force-bottle"),
            (self.interactive, "--interactive"),
            (self.keep_tmp, "--keep-tmp"),
            (self.debug_symbols, "--debug-symbols"),
            (self.force, "--force"),
            (self.debug, "--debug"),
            (self.quiet, "--quiet"),
            (self.verbose, "--verbose"),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect()
    }
}

/// Cask options passed through to the cask reinstall
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaskOptions {
    /// `Some(false)` for `--no-binaries`, `None` when unspecified
    pub binaries: Option<bool>,
    pub require_sha: bool,
    /// `Some(false)` for `--no-quarantine`, `None` when unspecified
    pub quarantine: Option<bool>,
    pub adopt: bool,
    pub skip_cask_deps: bool,
    pub zap: bool,
    pub force: bool,
    pub verbose: bool,
}

impl CaskOptions {
    pub fn reinstall_args(&self) -> Vec<&'static str> {
        let mut args = vec!["--cask"];
        match self.binaries {
            Some(true) => args.push("--binaries"),
            Some(false) => args.push("--no-binaries"),
            None => {}
        }
        match self.quarantine {
            Some(true) => args.push("--quarantine"),
            Some(false) => args.push("--no-quarantine"),
            None => {}
        }
        args.extend(
            [
                (self.require_sha, "--require-sha"),
                (self.adopt, "--adopt"),
                (self.skip_cask_deps, "--skip-cask-deps"),
                (self.zap, "--zap"),
                (self.force, "--force"),
                (self.verbose, "--verbose"),
            ]
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag)),
        );
        args
    }
}

/// Everything the reinstall core asks the outside world to do
pub trait Backend {
    /// Whether a compiler is available for source builds
    fn developer_tools_installed(&self) -> bool;

    /// Move kegs installed under a former name of `formula`
    fn migrate<P: Package>(&self, formula: &P, force: bool) -> Result<()>;

    /// Uninstall and install `formula` again
    fn reinstall<P: Package>(&self, formula: &P, options: &ReinstallOptions) -> Result<()>;

    /// Remove stale kegs of `formula`
    fn cleanup<P: Package>(&self, formula: &P) -> Result<()>;

    /// Upgrade the given dependents in one batch
    fn upgrade_dependents(&self, dependents: &[String], options: &ReinstallOptions) -> Result<()>;

    /// Reinstall a batch of casks in one call
    fn reinstall_casks(&self, casks: &[Cask], options: &CaskOptions) -> Result<()>;

    /// Run the global cleanup if it is due
    fn periodic_cleanup(&self) -> Result<()>;
}

/// Production backend for a Homebrew prefix
pub struct BrewBackend {
    config: Config,
}

impl BrewBackend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Backend for BrewBackend {
    fn developer_tools_installed(&self) -> bool {
        devtools::installed()
    }

    fn migrate<P: Package>(&self, formula: &P, force: bool) -> Result<()> {
        let outcome = migrate::migrate_if_needed(&self.config, formula, force)?;
        tracing::debug!("Migration check for {}: {:?}", formula.name(), outcome);
        Ok(())
    }

    fn reinstall<P: Package>(&self, formula: &P, options: &ReinstallOptions) -> Result<()> {
        let name = match formula.tap() {
            Some(tap) if tap != "homebrew/core" => format!("{}/{}", tap, formula.name()),
            _ => formula.name().to_string(),
        };
        let mut args = vec!["--formula"];
        args.extend(options.reinstall_args());
        brew::run_brew("reinstall", &args, &[name])
    }

    fn cleanup<P: Package>(&self, formula: &P) -> Result<()> {
        cleanup::cleanup_formula(&self.config, formula.name(), formula.is_pinned())?;
        Ok(())
    }

    fn upgrade_dependents(&self, dependents: &[String], options: &ReinstallOptions) -> Result<()> {
        let mut args = vec!["--formula"];
        args.extend(options.upgrade_args());
        brew::run_brew("upgrade", &args, dependents)
    }

    fn reinstall_casks(&self, casks: &[Cask], options: &CaskOptions) -> Result<()> {
        let tokens: Vec<String> = casks.iter().map(|c| c.token.clone()).collect();
        brew::run_brew("reinstall", &options.reinstall_args(), &tokens)
    }

    fn periodic_cleanup(&self) -> Result<()> {
        cleanup::periodic_cleanup(&self.config, chrono::Utc::now())?;
        Ok(())
    }
}
