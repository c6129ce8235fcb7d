//! `facalloc inspect`: model statistics without solving

use anyhow::{Context, Result};
use facalloc_algo::ModelBuilder;
use facalloc_core::ConstraintClass;
use std::io::Write;
use std::path::Path;
use tabwriter::TabWriter;

use super::load_problem;

pub fn handle(instance: &Path) -> Result<()> {
    let problem = load_problem(instance)?;
    let model = ModelBuilder::new(&problem)
        .context("building model")?
        .build();
    let stats = model.stats();

    println!(
        "Instance: {} clients, {} facilities, horizon {}",
        problem.num_clients(),
        problem.num_facilities(),
        problem.horizon
    );
    println!(
        "Demand: {:.0} units before the final period",
        problem
            .time_steps()
            .flat_map(|t| problem.client_ids().map(move |i| (i, t)))
            .map(|(i, t)| problem.outbound_demand(i, t))
            .sum::<f64>()
    );
    println!(
        "Max capacity: {} units across all facilities\n",
        problem.total_max_capacity()
    );

    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "Class\tRows")?;
    for class in ConstraintClass::all() {
        let rows = stats.constraints_by_class.get(class).copied().unwrap_or(0);
        writeln!(writer, "{}\t{}", class, rows)?;
    }
    writeln!(writer, "total\t{}", stats.num_constraints())?;
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    println!("{table}");

    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "Domain\tVariables")?;
    writeln!(writer, "binary\t{}", stats.binary_vars)?;
    writeln!(writer, "integer\t{}", stats.integer_vars)?;
    writeln!(writer, "continuous\t{}", stats.continuous_vars)?;
    writeln!(writer, "total\t{}", stats.num_variables())?;
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    println!("{table}");
    println!("Nonzeros: {}", stats.nonzeros);

    Ok(())
}
