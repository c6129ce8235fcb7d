//! Solved allocation data structures

use crate::extract::AllocationResult;
use facalloc_core::{ClientId, FacilityId, ModelStats, TimeStep};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Complete outcome of one optimization run
#[derive(Debug, Clone, Serialize)]
pub struct AllocationSolution {
    /// Roster and time-indexed flow records
    pub result: AllocationResult,
    /// Objective value (sizing + weighted flow cost)
    pub objective_value: f64,
    /// Sizing component `Σ cap · unit_cost · size`
    pub sizing_cost: f64,
    /// Weighted flow component
    pub flow_cost: f64,
    /// Capacity of the selected tier of every facility (0 when closed)
    pub open_capacity: BTreeMap<FacilityId, u32>,
    /// Occupancy of each facility at boundaries `0..=horizon`
    pub facility_occupancy: BTreeMap<FacilityId, Vec<f64>>,
    /// Resident units at each client at boundaries `0..=horizon`
    pub client_residency: BTreeMap<ClientId, Vec<f64>>,
    /// Identifier of the backend that produced the assignment
    pub backend: String,
    /// Whether integrality was relaxed for this run
    pub relaxed: bool,
    /// Model rows the returned assignment violates beyond the feasibility tolerance
    pub constraint_violations: usize,
    /// Wall-clock time spent inside the solver
    pub solve_time: Duration,
    pub model_stats: ModelStats,
}

impl AllocationSolution {
    /// Number of facilities that selected a non-zero capacity
    pub fn facilities_opened(&self) -> usize {
        self.open_capacity.values().filter(|&&cap| cap > 0).count()
    }

    pub fn total_capacity(&self) -> u64 {
        self.open_capacity.values().map(|&cap| u64::from(cap)).sum()
    }

    /// Occupancy of `facility` immediately before `time`
    pub fn occupancy_at(&self, facility: FacilityId, time: TimeStep) -> Option<f64> {
        self.facility_occupancy
            .get(&facility)
            .and_then(|profile| profile.get(time.value()).copied())
    }

    /// Resident units at `client` immediately before `time`
    pub fn residency_at(&self, client: ClientId, time: TimeStep) -> Option<f64> {
        self.client_residency
            .get(&client)
            .and_then(|profile| profile.get(time.value()).copied())
    }

    /// Generate a human-readable report
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Allocation Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!(
            "Backend: {}{}\n",
            self.backend,
            if self.relaxed { " (LP relaxation)" } else { "" }
        ));
        s.push_str(&format!("Objective: {:.2}\n", self.objective_value));
        s.push_str(&format!("  Sizing: {:.2}\n", self.sizing_cost));
        s.push_str(&format!("  Flow: {:.2}\n", self.flow_cost));
        s.push_str(&format!(
            "Facilities Opened: {} ({} units of capacity)\n",
            self.facilities_opened(),
            self.total_capacity()
        ));
        s.push_str(&format!(
            "Units Dispatched: {:.0}, Returned: {:.0}\n",
            self.result.total_dispatched(),
            self.result.total_returned()
        ));
        s.push_str(&format!(
            "Model: {} variables, {} constraints\n",
            self.model_stats.num_variables(),
            self.model_stats.num_constraints()
        ));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));
        if self.constraint_violations > 0 {
            s.push_str(&format!(
                "Constraint Violations: {}\n",
                self.constraint_violations
            ));
        }

        if !self.open_capacity.is_empty() {
            s.push_str("\nFacilities:\n");
            for (facility, &capacity) in &self.open_capacity {
                match self.result.tier_of(*facility) {
                    Some(tier) if capacity > 0 => s.push_str(&format!(
                        "  [OPEN]   {} {} - {} units\n",
                        facility, tier, capacity
                    )),
                    _ => s.push_str(&format!("  [CLOSED] {}\n", facility)),
                }
            }
        }

        if !self.result.dispatches.is_empty() || !self.result.returns.is_empty() {
            s.push_str("\nFlows:\n");
            let periods: BTreeSet<&TimeStep> = self
                .result
                .dispatches
                .keys()
                .chain(self.result.returns.keys())
                .collect();
            for time in periods {
                for record in self.result.dispatches_at(*time) {
                    s.push_str(&format!(
                        "  {} {} -> {}: {:.0}\n",
                        time, record.facility, record.client, record.quantity
                    ));
                }
                for record in self.result.returns_at(*time) {
                    s.push_str(&format!(
                        "  {} {} <- {}: {:.0}\n",
                        time, record.facility, record.client, record.quantity
                    ));
                }
            }
        }

        s
    }
}
