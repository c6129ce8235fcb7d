use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Facility sizing and multi-period flow allocation", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to ~/.facalloc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve an instance and report the allocation
    Solve {
        /// Instance file (TOML or JSON)
        instance: PathBuf,
        /// Write the allocation as JSON to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// LP backend (overrides the configuration file)
        #[arg(long)]
        solver: Option<String>,
        /// Solve the LP relaxation instead of the integer program
        #[arg(long)]
        relax: bool,
    },
    /// Print model statistics without solving
    Inspect {
        /// Instance file (TOML or JSON)
        instance: PathBuf,
    },
    /// Check an instance file for structural problems
    Validate {
        /// Instance file (TOML or JSON)
        instance: PathBuf,
    },
    /// Write a seeded random instance
    Generate {
        /// Output file; `.json` selects JSON, anything else TOML
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 3)]
        clients: usize,
        #[arg(long, default_value_t = 2)]
        facilities: usize,
        #[arg(long, default_value_t = 4)]
        horizon: usize,
        /// Tiers per facility; tier c holds c * tier-step units
        #[arg(long, default_value_t = 4)]
        tiers: u32,
        #[arg(long, default_value_t = 5)]
        tier_step: u32,
        /// Largest demand drawn per client pair and period
        #[arg(long, default_value_t = 5)]
        max_demand: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}
