//! End-to-end pipeline: problem → model → solver → extraction

use crate::balance::{occupancy, resident};
use crate::builder::ModelBuilder;
use crate::extract::ResultExtractor;
use crate::solution::AllocationSolution;
use crate::solver::AllocationSolver;
use facalloc_core::{AllocResult, ProblemData, TimeStep};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Knobs for one optimization run
#[derive(Debug, Clone)]
pub struct AllocationConfig {
    /// Solve the LP relaxation instead of the integer program
    pub relax_integrality: bool,
    /// Values at or below this magnitude are treated as zero when extracting
    pub zero_tolerance: f64,
    /// Tolerance used when checking the returned assignment against the model
    pub feasibility_tolerance: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            relax_integrality: false,
            zero_tolerance: 1e-6,
            feasibility_tolerance: 1e-6,
        }
    }
}

/// Build, solve and extract one problem instance.
///
/// Malformed input fails before the solver is called. Infeasible and unbounded
/// verdicts from the solver are returned unchanged.
pub fn solve_allocation(
    problem: &ProblemData,
    solver: &dyn AllocationSolver,
    config: &AllocationConfig,
) -> AllocResult<AllocationSolution> {
    let span = info_span!("solve_allocation", backend = solver.id());
    let _guard = span.enter();

    let builder = ModelBuilder::new(problem)?.relax_integrality(config.relax_integrality);
    let model = builder.build();
    let model_stats = model.stats();
    info!(
        variables = model_stats.num_variables(),
        constraints = model_stats.num_constraints(),
        "model built"
    );
    if config.relax_integrality {
        warn!("integrality relaxed; flows and tier choices may be fractional");
    }

    let start = Instant::now();
    let assignment = solver.solve(&model)?;
    let solve_time = start.elapsed();
    info!(elapsed = ?solve_time, "solver finished");

    let violations = model.violations(&assignment, config.feasibility_tolerance);
    if !violations.is_empty() {
        warn!(
            count = violations.len(),
            first = %violations[0].label,
            "solver assignment violates model constraints"
        );
    }

    let result = ResultExtractor::with_tolerance(config.zero_tolerance).extract(&model, &assignment)?;

    let sizing_cost = builder.sizing_cost().evaluate(&assignment);
    let flow_cost = builder.flow_cost().evaluate(&assignment);
    let vars = builder.flow_variables();
    let boundaries: Vec<TimeStep> = (0..=problem.horizon).map(TimeStep::new).collect();

    let open_capacity = problem
        .facilities
        .iter()
        .map(|facility| {
            let capacity = result
                .tier_of(facility.id)
                .and_then(|tier| facility.capacity(tier))
                .unwrap_or(0);
            (facility.id, capacity)
        })
        .collect();

    let facility_occupancy = problem
        .facility_ids()
        .map(|k| {
            let profile = boundaries
                .iter()
                .map(|&t| occupancy(vars, k, t).evaluate(&assignment))
                .collect();
            (k, profile)
        })
        .collect();

    let client_residency: BTreeMap<_, Vec<f64>> = problem
        .client_ids()
        .map(|i| {
            let profile = boundaries
                .iter()
                .map(|&t| resident(problem, vars, i, t).evaluate(&assignment))
                .collect();
            (i, profile)
        })
        .collect();

    let solution = AllocationSolution {
        result,
        objective_value: model.objective_value(&assignment),
        sizing_cost,
        flow_cost,
        open_capacity,
        facility_occupancy,
        client_residency,
        backend: solver.id().to_string(),
        relaxed: config.relax_integrality,
        constraint_violations: violations.len(),
        solve_time,
        model_stats,
    };
    info!(
        objective = solution.objective_value,
        opened = solution.facilities_opened(),
        "allocation solved"
    );
    Ok(solution)
}
