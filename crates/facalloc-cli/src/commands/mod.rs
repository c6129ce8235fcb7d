pub mod generate;
pub mod inspect;
pub mod solve;
pub mod validate;

use anyhow::{Context, Result};
use facalloc_cli::load_instance;
use facalloc_core::ProblemData;
use std::path::Path;

/// Read an instance file and convert it into problem data
pub fn load_problem(path: &Path) -> Result<ProblemData> {
    let instance =
        load_instance(path).with_context(|| format!("loading instance {}", path.display()))?;
    instance
        .to_problem()
        .with_context(|| format!("converting instance {}", path.display()))
}
