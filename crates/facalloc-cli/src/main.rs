use anyhow::Result;
use clap::Parser;
use facalloc_algo::InstanceParams;
use facalloc_cli::{load_config, Cli, Commands};
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Solve {
            instance,
            out,
            solver,
            relax,
        } => commands::solve::handle(
            &config,
            instance,
            out.as_deref(),
            solver.as_deref(),
            *relax,
        ),
        Commands::Inspect { instance } => commands::inspect::handle(instance),
        Commands::Validate { instance } => commands::validate::handle(instance),
        Commands::Generate {
            out,
            clients,
            facilities,
            horizon,
            tiers,
            tier_step,
            max_demand,
            seed,
        } => commands::generate::handle(
            out,
            InstanceParams {
                num_clients: *clients,
                num_facilities: *facilities,
                horizon: *horizon,
                num_tiers: *tiers,
                tier_step: *tier_step,
                max_demand: *max_demand,
                seed: *seed,
                ..InstanceParams::default()
            },
        ),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
