//! `facalloc validate`

use anyhow::Result;
use std::path::Path;

use super::load_problem;

pub fn handle(instance: &Path) -> Result<()> {
    let problem = load_problem(instance)?;
    problem.validate()?;

    println!("Instance is valid");
    println!("  {} clients", problem.num_clients());
    println!("  {} facilities", problem.num_facilities());
    println!("  horizon {}", problem.horizon);

    for facility in &problem.facilities {
        if facility.max_capacity() == 0 {
            println!("  Warning: {} has no tier with positive capacity", facility.id);
        }
    }
    let final_demand: f64 = problem
        .client_ids()
        .flat_map(|i| problem.client_ids().map(move |j| (i, j)))
        .filter_map(|(i, j)| problem.demand.get(i, j, problem.final_step()))
        .sum();
    if final_demand > 0.0 {
        println!(
            "  Warning: {:.0} units of final-period demand will be treated as zero",
            final_demand
        );
    }

    Ok(())
}
