use clap::Parser;
use rekeg::{
    api::BrewApi,
    backend::BrewBackend,
    bottle::GhcrBottleFetcher,
    commands::{self, Outcome, ReinstallArgs, ReinstallContext, ReinstallRequest},
    config::Config,
    formula::Formulary,
    platform,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ReinstallArgs::parse();

    // RUST_LOG wins over the command line flags
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    tracing::debug!("Using prefix {}", config.prefix.display());

    let candidates = commands::formula_candidates(&config, &args.names, args.treatment());
    let registry = if candidates.is_empty() {
        Formulary::new()
    } else {
        let api = BrewApi::new()?;
        let platform_tag = platform::detect_bottle_tag()?;
        tracing::debug!("Bottle tag: {}", platform_tag);
        Formulary::load(
            &config,
            &api,
            &platform_tag,
            &candidates,
            args.quiet || args.verbose,
        )
        .await?
    };

    let targets = commands::resolve_targets(&config, &registry, &args.names, args.treatment())?;

    let fetcher = GhcrBottleFetcher::new()?;
    let backend = BrewBackend::new(config.clone());
    let ctx = ReinstallContext {
        registry: &registry,
        fetcher: &fetcher,
        backend: &backend,
        config: &config,
    };
    let request = ReinstallRequest {
        targets,
        options: args.options(),
        cask_options: args.cask_options(),
        ask: args.ask || config.ask,
    };

    let mut stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout();
    match commands::reinstall(&ctx, &request, &mut stdin, &mut stdout).await? {
        Outcome::Completed(report) => {
            tracing::info!(
                "Reinstalled {} formulae, skipped {} pinned",
                report.reinstalled.len(),
                report.skipped_pinned.len()
            );
        }
        Outcome::Declined => {}
    }

    Ok(())
}
