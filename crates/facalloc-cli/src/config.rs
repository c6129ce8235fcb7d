//! Configuration for the facalloc command line
//! Looked up at `--config` or ~/.facalloc/config.toml

use anyhow::{Context, Result};
use facalloc_algo::{AllocationConfig, LpBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CliConfig {
    #[serde(default)]
    pub solver: SolverSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverSection {
    /// LP backend name: microlp, highs, clarabel
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Solve the LP relaxation instead of the integer program
    #[serde(default)]
    pub relax_integrality: bool,
    /// Values at or below this magnitude are reported as zero
    #[serde(default = "default_zero_tolerance")]
    pub zero_tolerance: f64,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            relax_integrality: false,
            zero_tolerance: default_zero_tolerance(),
        }
    }
}

fn default_backend() -> String {
    LpBackend::default().as_str().to_string()
}

fn default_zero_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSection {
    /// Pretty-print JSON results
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

impl CliConfig {
    /// Backend named in the configuration
    pub fn backend(&self) -> Result<LpBackend> {
        self.solver
            .backend
            .parse()
            .with_context(|| format!("solver.backend = '{}'", self.solver.backend))
    }

    pub fn allocation_config(&self) -> AllocationConfig {
        AllocationConfig {
            relax_integrality: self.solver.relax_integrality,
            zero_tolerance: self.solver.zero_tolerance,
            ..AllocationConfig::default()
        }
    }
}

/// Location of the per-user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".facalloc").join("config.toml"))
}

/// Load configuration from `explicit`, falling back to the per-user file and
/// then to defaults. An explicit path must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<CliConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(CliConfig::default()),
        },
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(config)
}
