use crate::backend::{Backend, CaskOptions, ReinstallOptions};
use crate::bottle::BottleFetcher;
use crate::cask::{self, Cask};
use crate::cellar;
use crate::closure::build_closure;
use crate::config::Config;
use crate::confirm::{Confirmation, confirm};
use crate::dependents::run_dependent_pass;
use crate::error::{RekegError, Result};
use crate::formula::{Package, Registry};
use crate::messages::Messages;
use crate::pipeline::{self, ReinstallReport};
use crate::sizing;
use clap::Parser;
use std::io::{BufRead, Write};

const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Uninstall and then reinstall formulae and casks using the same options
/// they were originally installed with
#[derive(Parser, Debug)]
#[command(name = "rekeg", author, version)]
pub struct ReinstallArgs {
    /// Formula/cask names to reinstall
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Treat all named arguments as formulae
    #[arg(long, conflicts_with = "cask")]
    pub formula: bool,

    /// Treat all named arguments as casks
    #[arg(long)]
    pub cask: bool,

    /// Install without checking for previously installed keg-only or
    /// non-migrated versions
    #[arg(short, long)]
    pub force: bool,

    /// Compile from source even if a bottle is available
    #[arg(short = 's', long, conflicts_with = "force_bottle")]
    pub build_from_source: bool,

    /// Install from a bottle if it exists for the current platform
    #[arg(long)]
    pub force_bottle: bool,

    /// Show the dependency closure and its size, and ask before proceeding
    #[arg(long)]
    pub ask: bool,

    /// Print the verification and post-install steps
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Make some output more quiet
    #[arg(short, long)]
    pub quiet: bool,

    /// Retain temporary files created during installation
    #[arg(long)]
    pub keep_tmp: bool,

    /// Generate debug symbols on build
    #[arg(long, requires = "build_from_source")]
    pub debug_symbols: bool,

    /// Create a Git repository when building from source
    #[arg(short, long)]
    pub git: bool,

    /// Download and patch the source, then open a shell in it
    #[arg(short, long)]
    pub interactive: bool,

    /// Print install times for each package at the end of the run
    #[arg(long)]
    pub display_times: bool,

    /// Link cask binaries
    #[arg(long, conflicts_with_all = ["formula", "no_binaries"])]
    pub binaries: bool,

    /// Do not link cask binaries
    #[arg(long, conflicts_with = "formula")]
    pub no_binaries: bool,

    /// Require all casks to have a checksum
    #[arg(long, conflicts_with = "formula")]
    pub require_sha: bool,

    /// Quarantine downloaded casks
    #[arg(long, conflicts_with_all = ["formula", "no_quarantine"])]
    pub quarantine: bool,

    /// Do not quarantine downloaded casks
    #[arg(long, conflicts_with = "formula")]
    pub no_quarantine: bool,

    /// Adopt existing artifacts in the destination that are identical
    #[arg(long, conflicts_with_all = ["formula", "force"])]
    pub adopt: bool,

    /// Skip installing cask dependencies
    #[arg(long, conflicts_with = "formula")]
    pub skip_cask_deps: bool,

    /// Remove all files associated with a cask
    #[arg(long, conflicts_with = "formula")]
    pub zap: bool,
}

/// How named arguments are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    Auto,
    Formula,
    Cask,
}

impl ReinstallArgs {
    pub fn treatment(&self) -> Treatment {
        if self.formula {
            Treatment::Formula
        } else if self.cask {
            Treatment::Cask
        } else {
            Treatment::Auto
        }
    }

    pub fn options(&self) -> ReinstallOptions {
        ReinstallOptions {
            build_from_source: self.build_from_source,
            force_bottle: self.force_bottle,
            interactive: self.interactive,
            keep_tmp: self.keep_tmp,
            debug_symbols: self.debug_symbols,
            force: self.force,
            debug: self.debug,
            quiet: self.quiet,
            verbose: self.verbose,
            git: self.git,
            display_times: self.display_times,
        }
    }

    pub fn cask_options(&self) -> CaskOptions {
        CaskOptions {
            binaries: tristate(self.binaries, self.no_binaries),
            require_sha: self.require_sha,
            quarantine: tristate(self.quarantine, self.no_quarantine),
            adopt: self.adopt,
            skip_cask_deps: self.skip_cask_deps,
            zap: self.zap,
            force: self.force,
            verbose: self.verbose,
        }
    }
}

fn tristate(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Named arguments split into formulae and casks
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Targets {
    pub formulae: Vec<String>,
    pub casks: Vec<Cask>,
}

/// Names that may refer to formulae and so need the registry loaded.
///
/// Anything that is not only an installed cask counts, since an unknown name
/// may be the new name of a renamed formula.
pub fn formula_candidates(config: &Config, names: &[String], treatment: Treatment) -> Vec<String> {
    if treatment == Treatment::Cask {
        return Vec::new();
    }

    let cellar = config.cellar();
    let caskroom = config.caskroom();
    names
        .iter()
        .filter(|name| {
            let short = cellar::short_name(name);
            treatment == Treatment::Formula
                || cellar.join(short).is_dir()
                || cask::installed_cask(&caskroom, short).is_none()
        })
        .cloned()
        .collect()
}

/// Sort names into formulae and casks.
///
/// A name is a formula when it has a Cellar rack or the registry knows it as
/// an installed formula, e.g. under a former name. Without an explicit
/// treatment a formula wins over a Caskroom entry. Repeated names are kept
/// once.
pub fn resolve_targets<R: Registry>(
    config: &Config,
    registry: &R,
    names: &[String],
    treatment: Treatment,
) -> Result<Targets> {
    let cellar = config.cellar();
    let caskroom = config.caskroom();
    let mut targets = Targets::default();

    for name in names {
        let short = cellar::short_name(name);
        let is_formula = cellar.join(short).is_dir()
            || registry.get(short).is_some_and(|f| !f.kegs().is_empty());
        let installed_cask = cask::installed_cask(&caskroom, short);

        let resolved = match treatment {
            Treatment::Formula if is_formula => None,
            Treatment::Cask => match installed_cask {
                Some(cask) => Some(cask),
                None => return Err(not_installed(config, name)),
            },
            Treatment::Auto if is_formula => None,
            Treatment::Auto => match installed_cask {
                Some(cask) => Some(cask),
                None => return Err(not_installed(config, name)),
            },
            Treatment::Formula => return Err(not_installed(config, name)),
        };

        match resolved {
            Some(cask) => {
                if !targets.casks.iter().any(|c| c.token == cask.token) {
                    targets.casks.push(cask);
                }
            }
            None => {
                if !targets.formulae.iter().any(|f| cellar::short_name(f) == short) {
                    targets.formulae.push(name.clone());
                }
            }
        }
    }

    Ok(targets)
}

fn not_installed(config: &Config, name: &str) -> RekegError {
    let mut candidates = cellar::installed_formula_names(&config.cellar()).unwrap_or_default();
    candidates.extend(cask::installed_tokens(&config.caskroom()).unwrap_or_default());

    RekegError::NotInstalled {
        name: name.to_string(),
        suggestion: suggest(name, &candidates),
    }
}

/// Closest installed name, if any is similar enough
pub fn suggest(name: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (c, strsim::jaro_winkler(name, c)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c.clone())
}

/// Collaborators of a reinstall run
pub struct ReinstallContext<'a, R, F, B> {
    pub registry: &'a R,
    pub fetcher: &'a F,
    pub backend: &'a B,
    pub config: &'a Config,
}

/// A resolved reinstall request
#[derive(Debug, Clone, Default)]
pub struct ReinstallRequest {
    pub targets: Targets,
    pub options: ReinstallOptions,
    pub cask_options: CaskOptions,
    /// Show the size summary and wait for confirmation
    pub ask: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed(ReinstallReport),
    /// The user answered no at the confirmation prompt
    Declined,
}

/// Run a reinstall: formula branch, cask branch, then periodic maintenance.
pub async fn reinstall<R, F, B, I, W>(
    ctx: &ReinstallContext<'_, R, F, B>,
    request: &ReinstallRequest,
    input: &mut I,
    output: &mut W,
) -> Result<Outcome>
where
    R: Registry,
    F: BottleFetcher,
    B: Backend,
    I: BufRead,
    W: Write,
{
    let options = &request.options;

    if options.build_from_source && !ctx.backend.developer_tools_installed() {
        return Err(RekegError::DeveloperToolsMissing);
    }

    // Different spellings of one formula resolve to a single target
    let mut formulae: Vec<&R::Package> = Vec::new();
    for name in &request.targets.formulae {
        let formula = ctx.registry.get(name).ok_or_else(|| RekegError::NotInstalled {
            name: name.clone(),
            suggestion: None,
        })?;
        if !formulae.iter().any(|f| f.name() == formula.name()) {
            formulae.push(formula);
        }
    }

    let mut casks: Vec<Cask> = Vec::new();
    for cask in &request.targets.casks {
        if !casks.iter().any(|c| c.token == cask.token) {
            casks.push(cask.clone());
        }
    }

    if request.ask && !formulae.is_empty() {
        let check_dependents = !ctx.config.no_installed_dependents_check;
        let closure = build_closure(ctx.registry, &formulae, check_dependents);
        let summary =
            sizing::aggregate(&closure, ctx.fetcher, options.verbose, options.quiet).await?;
        sizing::print_summary(&closure, &summary);

        if confirm(input, output)? == Confirmation::Abort {
            tracing::info!("Reinstall declined");
            return Ok(Outcome::Declined);
        }
    }

    let mut messages = Messages::new();
    let mut report = ReinstallReport::default();

    if !formulae.is_empty() {
        report = pipeline::reinstall_formulae(&formulae, ctx.backend, options, &mut messages)?;

        let names: Vec<&str> = formulae.iter().map(|f| f.name()).collect();
        run_dependent_pass(ctx.registry, ctx.backend, &names, options, ctx.config)?;
    }

    pipeline::reinstall_casks(&casks, ctx.backend, &request.cask_options)?;

    ctx.backend.periodic_cleanup()?;

    messages.display(options.display_times);
    Ok(Outcome::Completed(report))
}
