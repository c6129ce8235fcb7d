//! `facalloc solve`

use anyhow::{Context, Result};
use facalloc_algo::{solve_allocation, AllocationSolution, FlowRecord, GoodLpSolver, LpBackend};
use facalloc_cli::CliConfig;
use facalloc_core::{ClientId, FacilityId, TimeStep};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::load_problem;

/// Result file format (JSON)
#[derive(Debug, Serialize)]
struct SolveOutput {
    status: String,
    constraint_violations: usize,
    backend: String,
    objective_value: f64,
    sizing_cost: f64,
    flow_cost: f64,
    open_facilities: Vec<OpenFacilityOutput>,
    dispatches: BTreeMap<TimeStep, Vec<FlowOutput>>,
    returns: BTreeMap<TimeStep, Vec<FlowOutput>>,
    facility_occupancy: BTreeMap<FacilityId, Vec<f64>>,
    client_residency: BTreeMap<ClientId, Vec<f64>>,
    solve_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct OpenFacilityOutput {
    facility: usize,
    tier: usize,
    capacity: u32,
}

#[derive(Debug, Serialize)]
struct FlowOutput {
    client: usize,
    facility: usize,
    quantity: f64,
}

fn flow_outputs(records: &BTreeMap<TimeStep, Vec<FlowRecord>>) -> BTreeMap<TimeStep, Vec<FlowOutput>> {
    records
        .iter()
        .map(|(time, list)| {
            let list: Vec<FlowOutput> = list
                .iter()
                .map(|r| FlowOutput {
                    client: r.client.value(),
                    facility: r.facility.value(),
                    quantity: r.quantity,
                })
                .collect();
            (*time, list)
        })
        .collect()
}

/// Run status reported in the result file
fn status_label(solution: &AllocationSolution) -> &'static str {
    match (solution.relaxed, solution.constraint_violations > 0) {
        (false, false) => "optimal",
        (false, true) => "optimal_with_violations",
        (true, false) => "relaxed",
        (true, true) => "relaxed_with_violations",
    }
}

impl From<&AllocationSolution> for SolveOutput {
    fn from(solution: &AllocationSolution) -> Self {
        Self {
            status: status_label(solution).to_string(),
            constraint_violations: solution.constraint_violations,
            backend: solution.backend.clone(),
            objective_value: solution.objective_value,
            sizing_cost: solution.sizing_cost,
            flow_cost: solution.flow_cost,
            open_facilities: solution
                .result
                .open_facilities
                .iter()
                .filter_map(|open| {
                    let capacity = *solution.open_capacity.get(&open.facility)?;
                    (capacity > 0).then(|| OpenFacilityOutput {
                        facility: open.facility.value(),
                        tier: open.tier.value(),
                        capacity,
                    })
                })
                .collect(),
            dispatches: flow_outputs(&solution.result.dispatches),
            returns: flow_outputs(&solution.result.returns),
            facility_occupancy: solution.facility_occupancy.clone(),
            client_residency: solution.client_residency.clone(),
            solve_time_ms: solution.solve_time.as_millis() as u64,
        }
    }
}

pub fn handle(
    config: &CliConfig,
    instance: &Path,
    out: Option<&Path>,
    solver: Option<&str>,
    relax: bool,
) -> Result<()> {
    let problem = load_problem(instance)?;
    info!(
        clients = problem.num_clients(),
        facilities = problem.num_facilities(),
        horizon = problem.horizon,
        "instance loaded"
    );

    let backend: LpBackend = match solver {
        Some(name) => name.parse().context("selecting solver backend")?,
        None => config.backend()?,
    };
    let mut allocation_config = config.allocation_config();
    allocation_config.relax_integrality |= relax;

    let solution = solve_allocation(&problem, &GoodLpSolver::new(backend), &allocation_config)
        .context("solving allocation problem")?;

    print!("{}", solution.summary());

    if let Some(out_path) = out {
        let output = SolveOutput::from(&solution);
        let json = if config.output.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        }
        .context("serializing solution")?;
        let mut file = File::create(out_path)
            .with_context(|| format!("creating output file {}", out_path.display()))?;
        file.write_all(json.as_bytes()).context("writing output")?;
        println!("\nResults written to {}", out_path.display());
    }

    Ok(())
}
