//! Cumulative flow balance
//!
//! Occupancy is never stored as a variable. It is re-derived from the complete
//! flow-variable set for every (location, boundary) pair:
//!
//! ```text
//! resident(i, t)  = Σ_{τ<t} Σ_k ( out[i,k,τ] − in[i,k,τ] )
//!                 + Σ_{τ<t} Σ_j ( demand[j,i,τ] − demand[i,j,τ] )
//!
//! occupancy(k, t) = Σ_c cap[k,c] · size[k,c]
//!                 + Σ_{τ<t} Σ_i ( in[i,k,τ] − out[i,k,τ] )
//! ```
//!
//! The boundary `t` means "immediately before period t": only periods τ < t
//! contribute. At `t = 0` both sums are empty, leaving zero residency and the
//! bare selected capacity. Boundaries past the horizon are clamped to it.

use facalloc_core::{ClientId, FacilityId, LinearExpr, ProblemData, TimeStep, VarId};

/// Dense handle tables for every decision variable of a model.
///
/// Flow handles are laid out as `[time][client][facility]`.
#[derive(Debug, Clone)]
pub struct FlowVariables {
    num_clients: usize,
    num_facilities: usize,
    horizon: usize,
    tiers: Vec<Vec<(VarId, u32)>>,
    flow_out: Vec<VarId>,
    flow_in: Vec<VarId>,
}

impl FlowVariables {
    pub(crate) fn new(
        num_clients: usize,
        num_facilities: usize,
        horizon: usize,
        tiers: Vec<Vec<(VarId, u32)>>,
        flow_out: Vec<VarId>,
        flow_in: Vec<VarId>,
    ) -> Self {
        debug_assert_eq!(tiers.len(), num_facilities);
        debug_assert_eq!(flow_out.len(), num_clients * num_facilities * horizon);
        debug_assert_eq!(flow_in.len(), flow_out.len());
        Self {
            num_clients,
            num_facilities,
            horizon,
            tiers,
            flow_out,
            flow_in,
        }
    }

    #[inline]
    fn index(&self, client: ClientId, facility: FacilityId, time: TimeStep) -> usize {
        (time.value() * self.num_clients + client.value()) * self.num_facilities + facility.value()
    }

    /// Units facility `facility` sends to `client` in period `time`
    pub fn flow_out(&self, client: ClientId, facility: FacilityId, time: TimeStep) -> VarId {
        self.flow_out[self.index(client, facility, time)]
    }

    /// Units `client` returns to `facility` in period `time`
    pub fn flow_in(&self, client: ClientId, facility: FacilityId, time: TimeStep) -> VarId {
        self.flow_in[self.index(client, facility, time)]
    }

    /// Tier-selection handles of a facility with the capacity each tier holds
    pub fn tiers(&self, facility: FacilityId) -> &[(VarId, u32)] {
        &self.tiers[facility.value()]
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    fn clients(&self) -> impl Iterator<Item = ClientId> {
        (0..self.num_clients).map(ClientId::new)
    }

    fn facilities(&self) -> impl Iterator<Item = FacilityId> {
        (0..self.num_facilities).map(FacilityId::new)
    }

    fn periods_before(&self, boundary: TimeStep) -> impl Iterator<Item = TimeStep> {
        (0..boundary.value().min(self.horizon)).map(TimeStep::new)
    }
}

/// Capacity of the tier selected for `facility`: `Σ_c cap[k,c] · size[k,c]`
pub fn selected_capacity(vars: &FlowVariables, facility: FacilityId) -> LinearExpr {
    let mut expr = LinearExpr::new();
    for &(var, capacity) in vars.tiers(facility) {
        expr.add_term(var, f64::from(capacity));
    }
    expr
}

/// Total units `client` receives from all facilities in period `time`
pub fn inbound_from_facilities(vars: &FlowVariables, client: ClientId, time: TimeStep) -> LinearExpr {
    LinearExpr::sum(vars.facilities().map(|k| vars.flow_out(client, k, time)))
}

/// Total units `client` returns to all facilities in period `time`
pub fn returned_to_facilities(vars: &FlowVariables, client: ClientId, time: TimeStep) -> LinearExpr {
    LinearExpr::sum(vars.facilities().map(|k| vars.flow_in(client, k, time)))
}

/// Total units `facility` dispatches to all clients in period `time`
pub fn dispatched_by(vars: &FlowVariables, facility: FacilityId, time: TimeStep) -> LinearExpr {
    LinearExpr::sum(vars.clients().map(|i| vars.flow_out(i, facility, time)))
}

/// Net units sitting at `client` immediately before period `boundary`.
pub fn resident(
    problem: &ProblemData,
    vars: &FlowVariables,
    client: ClientId,
    boundary: TimeStep,
) -> LinearExpr {
    let mut expr = LinearExpr::new();
    for tau in vars.periods_before(boundary) {
        for k in vars.facilities() {
            expr.add_term(vars.flow_out(client, k, tau), 1.0);
            expr.add_term(vars.flow_in(client, k, tau), -1.0);
        }
        for j in problem.client_ids() {
            let arriving = problem.effective_demand(j, client, tau);
            let departing = problem.effective_demand(client, j, tau);
            expr.add_constant(arriving - departing);
        }
    }
    expr
}

/// Net units held at `facility` immediately before period `boundary`.
pub fn occupancy(vars: &FlowVariables, facility: FacilityId, boundary: TimeStep) -> LinearExpr {
    let mut expr = selected_capacity(vars, facility);
    for tau in vars.periods_before(boundary) {
        for i in vars.clients() {
            expr.add_term(vars.flow_in(i, facility, tau), 1.0);
            expr.add_term(vars.flow_out(i, facility, tau), -1.0);
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use facalloc_core::{Assignment, ProblemBuilder};

    fn two_by_two(horizon: usize) -> ProblemData {
        ProblemBuilder::new(horizon)
            .client(0.0, 0.0)
            .client(4.0, 0.0)
            .facility(1.0, 0.0, 1.0, vec![0, 3, 6])
            .facility(3.0, 0.0, 2.0, vec![0, 4])
            .default_demand(0.0)
            .demand(0, 1, 0, 2.0)
            .demand(1, 0, 1, 1.0)
            .build()
    }

    #[test]
    fn test_base_case_is_empty_history() {
        let problem = two_by_two(3);
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();

        for i in problem.client_ids() {
            let r = resident(&problem, vars, i, TimeStep::new(0));
            assert!(r.is_empty());
            assert_eq!(r.constant_term(), 0.0);
        }

        // occupancy(k, 0) is exactly the selected capacity
        for k in problem.facility_ids() {
            let occ = occupancy(vars, k, TimeStep::new(0)).normalized();
            assert_eq!(occ, selected_capacity(vars, k).normalized());
        }
    }

    #[test]
    fn test_occupancy_base_equals_selected_capacity_value() {
        let problem = two_by_two(3);
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();

        let k = FacilityId::new(0);
        let mut a = Assignment::new();
        a.insert(vars.tiers(k)[2].0, 1.0);
        assert_eq!(occupancy(vars, k, TimeStep::new(0)).evaluate(&a), 6.0);
        assert_eq!(occupancy(vars, FacilityId::new(1), TimeStep::new(0)).evaluate(&a), 0.0);
    }

    #[test]
    fn test_resident_accumulates_prior_periods_only() {
        let problem = two_by_two(3);
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();
        let (c0, c1) = (ClientId::new(0), ClientId::new(1));
        let (k0, k1) = (FacilityId::new(0), FacilityId::new(1));

        let mut a = Assignment::new();
        a.insert(vars.flow_out(c0, k0, TimeStep::new(0)), 2.0);
        a.insert(vars.flow_in(c1, k1, TimeStep::new(1)), 2.0);
        a.insert(vars.flow_out(c1, k1, TimeStep::new(1)), 1.0);

        // Before period 1: client 0 received 2 and sent 2 away as demand
        assert_eq!(resident(&problem, vars, c0, TimeStep::new(1)).evaluate(&a), 0.0);
        // Client 1 gained the 2 demand units
        assert_eq!(resident(&problem, vars, c1, TimeStep::new(1)).evaluate(&a), 2.0);
        // Period-1 flows do not count at boundary 1
        let at_one = resident(&problem, vars, c1, TimeStep::new(1));
        assert_eq!(at_one.coefficient(vars.flow_in(c1, k1, TimeStep::new(1))), 0.0);
        // Before period 2: client 1 received 1, returned 2, sent 1 to client 0
        assert_eq!(resident(&problem, vars, c1, TimeStep::new(2)).evaluate(&a), 0.0);
        assert_eq!(resident(&problem, vars, c0, TimeStep::new(2)).evaluate(&a), 1.0);
    }

    #[test]
    fn test_occupancy_tracks_dispatch_and_returns() {
        let problem = two_by_two(3);
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();
        let k0 = FacilityId::new(0);

        let mut a = Assignment::new();
        a.insert(vars.tiers(k0)[1].0, 1.0);
        a.insert(vars.flow_out(ClientId::new(0), k0, TimeStep::new(0)), 2.0);
        a.insert(vars.flow_in(ClientId::new(1), k0, TimeStep::new(1)), 1.0);

        assert_eq!(occupancy(vars, k0, TimeStep::new(1)).evaluate(&a), 1.0);
        assert_eq!(occupancy(vars, k0, TimeStep::new(2)).evaluate(&a), 2.0);
    }

    #[test]
    fn test_boundary_past_horizon_is_clamped() {
        let problem = two_by_two(2);
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();
        let c = ClientId::new(1);
        assert_eq!(
            resident(&problem, vars, c, TimeStep::new(2)).normalized(),
            resident(&problem, vars, c, TimeStep::new(10)).normalized()
        );
    }

    #[test]
    fn test_single_period_horizon_has_no_history() {
        let problem = ProblemBuilder::new(1)
            .client(0.0, 0.0)
            .facility(0.0, 0.0, 1.0, vec![0, 2])
            .demand(0, 0, 0, 7.0)
            .build();
        let builder = ModelBuilder::new(&problem).unwrap();
        let vars = builder.flow_variables();

        let r = resident(&problem, vars, ClientId::new(0), TimeStep::new(0));
        assert!(r.is_empty());
        let full = resident(&problem, vars, ClientId::new(0), TimeStep::new(1));
        // The only period is final, so its demand is overridden to zero
        assert_eq!(full.constant_term(), 0.0);
    }
}
