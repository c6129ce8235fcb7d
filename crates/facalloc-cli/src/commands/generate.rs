//! `facalloc generate`

use anyhow::{Context, Result};
use facalloc_algo::{random_instance, InstanceParams};
use facalloc_cli::{write_instance, InstanceFile};
use std::path::Path;

pub fn handle(out: &Path, params: InstanceParams) -> Result<()> {
    let problem = random_instance(&params);
    let instance = InstanceFile::from_problem(&problem);
    write_instance(out, &instance)
        .with_context(|| format!("writing instance {}", out.display()))?;

    println!(
        "Generated instance: {} clients, {} facilities, horizon {} (seed {})",
        params.num_clients, params.num_facilities, params.horizon, params.seed
    );
    println!("  {} demand entries", instance.demand.len());
    println!("Written to {}", out.display());
    Ok(())
}
