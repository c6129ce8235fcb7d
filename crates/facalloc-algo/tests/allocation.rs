//! End-to-end allocation tests against the pure-Rust MILP backend

use facalloc_algo::{
    random_instance, solve_allocation, AllocationConfig, AllocationSolver, GoodLpSolver,
    InstanceParams, ModelBuilder,
};
use facalloc_core::{
    AllocError, AllocResult, Assignment, ClientId, ConstraintClass, FacilityId, ModelDescription,
    ProblemBuilder, ProblemData, TimeStep, VarId,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn solve(problem: &ProblemData) -> AllocResult<facalloc_algo::AllocationSolution> {
    solve_allocation(problem, &GoodLpSolver::default(), &AllocationConfig::default())
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// One client, one facility, no demand anywhere
#[test]
fn test_no_demand_keeps_facility_closed() {
    let problem = ProblemBuilder::new(2)
        .client(1.0, 1.0)
        .facility(0.0, 0.0, 1.0, vec![0, 10])
        .default_demand(0.0)
        .build();

    let solution = solve(&problem).expect("empty instance should solve");

    assert_close(solution.objective_value, 0.0);
    assert_eq!(solution.open_capacity[&FacilityId::new(0)], 0);
    assert!(solution.result.dispatches.is_empty());
    assert!(solution.result.returns.is_empty());
}

/// A single client needs 5 units in period 0; one facility sits on top of it
/// and another is 10 away.
#[test]
fn test_nearest_facility_serves_round_trip() {
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .facility(10.0, 0.0, 1.0, vec![0, 5])
        .demand(0, 0, 0, 5.0)
        .default_demand(0.0)
        .build();

    let solution = solve(&problem).expect("round trip should solve");
    let (client, near, far) = (ClientId::new(0), FacilityId::new(0), FacilityId::new(1));

    assert_eq!(solution.open_capacity[&near], 5);
    assert_eq!(solution.open_capacity[&far], 0);
    assert_close(solution.result.dispatched(client, near, TimeStep::new(0)), 5.0);
    assert_close(solution.result.returned(client, near, TimeStep::new(1)), 5.0);
    assert_close(solution.sizing_cost, 5.0);
    assert_close(solution.flow_cost, 5.0);
    assert_close(solution.objective_value, 10.0);

    assert_eq!(solution.facility_occupancy[&near], vec![5.0, 0.0, 5.0]);
    assert_eq!(solution.client_residency[&client], vec![0.0, 5.0, 0.0]);
}

#[test]
fn test_literal_final_period_demand_is_ignored() {
    // Same round trip, but the table also asks for 5 units in the last period
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .facility(10.0, 0.0, 1.0, vec![0, 5])
        .default_demand(5.0)
        .build();

    let solution = solve(&problem).expect("terminal demand is overridden");
    assert_close(solution.objective_value, 10.0);
    assert_close(solution.result.total_dispatched(), 5.0);
    assert_close(solution.result.total_returned(), 5.0);
}

#[test]
fn test_demand_beyond_total_capacity_is_infeasible() {
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .client(1.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 2])
        .facility(1.0, 0.0, 1.0, vec![0, 2])
        .demand(0, 1, 0, 5.0)
        .default_demand(0.0)
        .build();

    let err = solve(&problem).unwrap_err();
    assert!(matches!(err, AllocError::Infeasible(_)), "got {:?}", err);
}

#[test]
fn test_single_period_horizon() {
    let problem = ProblemBuilder::new(1)
        .client(0.0, 0.0)
        .client(3.0, 4.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .demand(0, 1, 0, 3.0)
        .default_demand(0.0)
        .build();

    let model = ModelBuilder::new(&problem).unwrap().build();
    assert_eq!(
        model
            .constraints_of(ConstraintClass::TerminalCapacity)
            .count(),
        2
    );

    let solution = solve(&problem).expect("single period instance should solve");
    assert_close(solution.objective_value, 0.0);
    assert_eq!(solution.facility_occupancy[&FacilityId::new(0)].len(), 2);
}

#[test]
fn test_units_travel_between_clients() {
    // Three units go from client 0 to client 1 in period 0 and must be
    // returned before the horizon ends.
    let problem = ProblemBuilder::new(3)
        .client(0.0, 0.0)
        .client(1.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 3, 6])
        .demand(0, 1, 0, 3.0)
        .default_demand(0.0)
        .build();

    let solution = solve(&problem).expect("transfer should solve");
    let facility = FacilityId::new(0);

    assert_eq!(solution.open_capacity[&facility], 3);
    assert_close(
        solution
            .result
            .dispatched(ClientId::new(0), facility, TimeStep::new(0)),
        3.0,
    );
    assert_close(solution.result.total_returned(), 3.0);
    assert!(solution
        .result
        .returns
        .values()
        .flatten()
        .all(|r| r.client == ClientId::new(1)));
    assert_close(solution.objective_value, 6.0);
    assert_close(solution.client_residency[&ClientId::new(1)][1], 3.0);
}

#[test]
fn test_every_facility_selects_at_most_one_tier() {
    let problem = random_instance(&InstanceParams {
        max_demand: 2,
        seed: 11,
        ..InstanceParams::default()
    });
    let solution = solve(&problem).expect("generated instance should solve");

    let mut seen = std::collections::BTreeSet::new();
    for open in &solution.result.open_facilities {
        assert!(seen.insert(open.facility), "{} opened twice", open.facility);
    }
}

#[test]
fn test_solved_assignment_satisfies_model() {
    let problem = random_instance(&InstanceParams {
        max_demand: 2,
        seed: 3,
        ..InstanceParams::default()
    });
    let model = ModelBuilder::new(&problem).unwrap().build();
    let assignment = GoodLpSolver::default()
        .solve(&model)
        .expect("generated instance should solve");

    let violations = model.violations(&assignment, 1e-6);
    assert!(violations.is_empty(), "violated: {:?}", violations);

    let solution = solve(&problem).unwrap();
    assert_eq!(solution.constraint_violations, 0);
    assert_close(
        solution.result.total_dispatched(),
        solution.result.total_returned(),
    );
    for profile in solution.facility_occupancy.values() {
        assert!(profile.iter().all(|&units| units >= -1e-6));
    }
}

#[test]
fn test_relaxation_never_costs_more() {
    let problem = random_instance(&InstanceParams {
        max_demand: 2,
        seed: 5,
        ..InstanceParams::default()
    });
    let integral = solve(&problem).unwrap();
    let relaxed = solve_allocation(
        &problem,
        &GoodLpSolver::default(),
        &AllocationConfig {
            relax_integrality: true,
            ..AllocationConfig::default()
        },
    )
    .unwrap();

    assert!(relaxed.relaxed);
    assert!(relaxed.objective_value <= integral.objective_value + 1e-6);
}

/// Counts calls and answers with a fixed outcome
struct ScriptedSolver {
    calls: AtomicUsize,
    outcome: fn(&ModelDescription) -> AllocResult<Assignment>,
}

impl ScriptedSolver {
    fn new(outcome: fn(&ModelDescription) -> AllocResult<Assignment>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome,
        }
    }
}

impl AllocationSolver for ScriptedSolver {
    fn id(&self) -> &str {
        "scripted"
    }

    fn solve(&self, model: &ModelDescription) -> AllocResult<Assignment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)(model)
    }
}

fn tiny_problem() -> ProblemData {
    ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .default_demand(0.0)
        .build()
}

#[test]
fn test_unknown_variable_from_solver_is_fatal() {
    let solver = ScriptedSolver::new(|model| {
        Ok([(VarId::new(model.num_variables() + 3), 1.0)]
            .into_iter()
            .collect())
    });

    let err = solve_allocation(&tiny_problem(), &solver, &AllocationConfig::default()).unwrap_err();
    assert!(matches!(err, AllocError::Extraction(_)), "got {:?}", err);
}

#[test]
fn test_infeasible_assignment_is_counted() {
    let solver = ScriptedSolver::new(|model| {
        Ok(model.variables().iter().map(|decl| (decl.id, 0.0)).collect())
    });
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .demand(0, 0, 0, 5.0)
        .default_demand(0.0)
        .build();

    let solution = solve_allocation(&problem, &solver, &AllocationConfig::default()).unwrap();
    assert!(solution.constraint_violations > 0);
    assert!(solution.summary().contains("Constraint Violations"));
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_solver_verdicts_pass_through_unchanged() {
    let solver = ScriptedSolver::new(|_| Err(AllocError::Unbounded("scripted".to_string())));

    let err = solve_allocation(&tiny_problem(), &solver, &AllocationConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), AllocError::Unbounded("scripted".to_string()).to_string());
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_malformed_input_never_reaches_solver() {
    let solver = ScriptedSolver::new(|_| Ok(Assignment::new()));
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .facility(0.0, 0.0, 1.0, vec![])
        .default_demand(0.0)
        .build();

    let err = solve_allocation(&problem, &solver, &AllocationConfig::default()).unwrap_err();
    assert!(matches!(err, AllocError::MalformedInput(_)));
    assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_missing_demand_entry_is_malformed() {
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .client(1.0, 1.0)
        .facility(0.0, 0.0, 1.0, vec![0, 5])
        .demand(0, 1, 0, 1.0)
        .build();

    let err = solve(&problem).unwrap_err();
    assert!(matches!(err, AllocError::MalformedInput(_)));
}

#[test]
fn test_out_of_range_demand_never_reaches_solver() {
    let solver = ScriptedSolver::new(|_| Ok(Assignment::new()));
    let problem = ProblemBuilder::new(2)
        .client(0.0, 0.0)
        .client(1.0, 1.0)
        .facility(0.0, 0.0, 1.0, vec![0, 20])
        .default_demand(0.0)
        .demand(0, 2, 0, 7.0)
        .build();

    let err = solve_allocation(&problem, &solver, &AllocationConfig::default()).unwrap_err();
    assert!(matches!(err, AllocError::MalformedInput(_)));
    assert!(err.to_string().contains("outside"));
    assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
}
