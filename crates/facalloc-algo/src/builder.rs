//! Model construction
//!
//! Derives the full variable set, the seven constraint families and the
//! objective from a validated [`ProblemData`].
//!
//! ## Formulation
//!
//! ```text
//! minimize    Σ_k Σ_c cap[k,c] · f[k] · size[k,c]
//!           + α · Σ_t Σ_i Σ_k ( in[i,k,t] + d[i,k] · out[i,k,t] )
//!
//! subject to:
//!   Σ_c size[k,c] ≤ 1                                        sizing exclusivity
//!   in[i,k,T-1] ≤ Σ_c cap[k,c] · size[k,c]                   terminal capacity
//!   Σ_k in[i,k,t] = resident(i,t) + Σ_k out[i,k,t] − D(i,t)  client balance
//!   D(i,t) ≤ Σ_k out[i,k,t] + resident(i,t)                  demand coverage
//!   Σ_i out[i,k,t] ≤ occupancy(k,t)                          dispatch ceiling
//!   occupancy(k,t) ≤ Σ_c cap[k,c] · size[k,c]                capacity envelope
//!   Σ_t Σ_i Σ_k ( out[i,k,t] − in[i,k,t] ) = 0                global conservation
//! ```
//!
//! where `D(i,t) = Σ_j demand[i,j,t]` and `resident`/`occupancy` are the
//! closed-form sums from [`crate::balance`]. Capacity ceilings are inclusive
//! and only periods strictly before `t` contribute to the cumulative terms.

use crate::balance::{
    dispatched_by, inbound_from_facilities, occupancy, resident, returned_to_facilities,
    selected_capacity, FlowVariables,
};
use facalloc_core::{
    AllocResult, ClientId, ConstraintClass, FacilityId, LinearConstraint, LinearExpr,
    ModelDescription, Objective, ProblemData, Relation, Sense, TierIndex, TimeStep, VarDomain,
    VarId, VarKey, VariableDecl,
};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

/// Builds the model description for one problem instance.
///
/// Construction validates the input eagerly and declares every variable, so
/// the handle tables are available before [`ModelBuilder::build`] runs.
pub struct ModelBuilder<'a> {
    problem: &'a ProblemData,
    variables: Vec<VariableDecl>,
    handles: FlowVariables,
    relax_integrality: bool,
}

impl<'a> ModelBuilder<'a> {
    /// Validate `problem` and declare all decision variables.
    pub fn new(problem: &'a ProblemData) -> AllocResult<Self> {
        problem.validate()?;

        let mut variables = Vec::with_capacity(
            problem
                .facilities
                .iter()
                .map(|f| f.num_tiers())
                .sum::<usize>()
                + 2 * problem.num_clients() * problem.num_facilities() * problem.horizon,
        );

        let mut declare = |key: VarKey, domain: VarDomain, upper: Option<f64>| -> VarId {
            let id = VarId::new(variables.len());
            variables.push(VariableDecl {
                id,
                key,
                name: key.name(),
                domain,
                lower: 0.0,
                upper,
            });
            id
        };

        let tiers: Vec<Vec<(VarId, u32)>> = problem
            .facilities
            .iter()
            .map(|facility| {
                facility
                    .tiers
                    .iter()
                    .enumerate()
                    .map(|(c, &capacity)| {
                        let key = VarKey::TierSelected {
                            facility: facility.id,
                            tier: TierIndex::new(c),
                        };
                        (declare(key, VarDomain::Binary, Some(1.0)), capacity)
                    })
                    .collect()
            })
            .collect();

        // Every unit in the system sits either at a facility or at a client, so
        // no single flow can exceed the largest total capacity
        let flow_bound = Some(problem.total_max_capacity() as f64);
        let flow_len = problem.num_clients() * problem.num_facilities() * problem.horizon;
        let mut flow_out = Vec::with_capacity(flow_len);
        let mut flow_in = Vec::with_capacity(flow_len);
        for time in problem.time_steps() {
            for client in problem.client_ids() {
                for facility in problem.facility_ids() {
                    flow_out.push(declare(
                        VarKey::FlowOut {
                            client,
                            facility,
                            time,
                        },
                        VarDomain::Integer,
                        flow_bound,
                    ));
                    flow_in.push(declare(
                        VarKey::FlowIn {
                            client,
                            facility,
                            time,
                        },
                        VarDomain::Integer,
                        flow_bound,
                    ));
                }
            }
        }

        let handles = FlowVariables::new(
            problem.num_clients(),
            problem.num_facilities(),
            problem.horizon,
            tiers,
            flow_out,
            flow_in,
        );

        debug!(
            variables = variables.len(),
            clients = problem.num_clients(),
            facilities = problem.num_facilities(),
            horizon = problem.horizon,
            "declared model variables"
        );

        Ok(Self {
            problem,
            variables,
            handles,
            relax_integrality: false,
        })
    }

    /// Declare every variable continuous (LP relaxation)
    pub fn relax_integrality(mut self, relax: bool) -> Self {
        self.relax_integrality = relax;
        self
    }

    pub fn problem(&self) -> &ProblemData {
        self.problem
    }

    /// Handle tables of the declared variables
    pub fn flow_variables(&self) -> &FlowVariables {
        &self.handles
    }

    /// `Σ_k Σ_c cap[k,c] · unit_cost[k] · size[k,c]`
    pub fn sizing_cost(&self) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for facility in &self.problem.facilities {
            for &(var, capacity) in self.handles.tiers(facility.id) {
                expr.add_term(var, f64::from(capacity) * facility.unit_cost);
            }
        }
        expr
    }

    /// `α · Σ_t Σ_i Σ_k ( in[i,k,t] + d[i,k] · out[i,k,t] )`
    pub fn flow_cost(&self) -> LinearExpr {
        let weight = self.problem.flow_weight;
        let mut expr = LinearExpr::new();
        for t in self.problem.time_steps() {
            for i in self.problem.client_ids() {
                for k in self.problem.facility_ids() {
                    let distance = self.problem.distance(i, k);
                    expr.add_term(self.handles.flow_in(i, k, t), weight);
                    expr.add_term(self.handles.flow_out(i, k, t), weight * distance);
                }
            }
        }
        expr
    }

    /// Emit the complete model description.
    pub fn build(&self) -> ModelDescription {
        let mut constraints = Vec::new();

        for k in self.problem.facility_ids() {
            constraints.push(self.sizing_exclusivity(k));
        }

        let steps: Vec<TimeStep> = self.problem.time_steps().collect();
        #[cfg(feature = "parallel")]
        let blocks: Vec<Vec<LinearConstraint>> =
            steps.into_par_iter().map(|t| self.period_block(t)).collect();
        #[cfg(not(feature = "parallel"))]
        let blocks: Vec<Vec<LinearConstraint>> =
            steps.into_iter().map(|t| self.period_block(t)).collect();
        constraints.extend(blocks.into_iter().flatten());

        constraints.push(self.global_conservation());

        let objective = Objective {
            sense: Sense::Minimize,
            expr: (self.sizing_cost() + self.flow_cost()).normalized(),
        };

        let variables = if self.relax_integrality {
            self.variables
                .iter()
                .cloned()
                .map(|mut v| {
                    v.domain = VarDomain::Continuous;
                    v
                })
                .collect()
        } else {
            self.variables.clone()
        };

        debug!(
            variables = variables.len(),
            constraints = constraints.len(),
            relaxed = self.relax_integrality,
            "built model description"
        );

        ModelDescription::new(variables, constraints, objective)
    }

    /// All rows that belong to period `t`. Each block depends only on the
    /// fixed input and the handle tables, so blocks can be built in any order.
    fn period_block(&self, t: TimeStep) -> Vec<LinearConstraint> {
        let mut rows = Vec::with_capacity(
            2 * self.problem.num_clients() + 2 * self.problem.num_facilities(),
        );

        for i in self.problem.client_ids() {
            let held = resident(self.problem, &self.handles, i, t);
            rows.push(self.client_balance(i, t, held.clone()));
            rows.push(self.demand_coverage(i, t, held));
        }

        for k in self.problem.facility_ids() {
            let held = occupancy(&self.handles, k, t);
            rows.push(self.dispatch_ceiling(k, t, held.clone()));
            rows.push(self.capacity_envelope(k, t, held));
        }

        if t == self.problem.final_step() {
            for i in self.problem.client_ids() {
                for k in self.problem.facility_ids() {
                    rows.push(self.terminal_capacity(i, k, t));
                }
            }
        }

        rows
    }

    fn sizing_exclusivity(&self, k: FacilityId) -> LinearConstraint {
        LinearConstraint::new(
            ConstraintClass::SizingExclusivity,
            format!("sizing[{}]", k.value()),
            LinearExpr::sum(self.handles.tiers(k).iter().map(|(v, _)| *v)),
            Relation::Le,
            LinearExpr::constant(1.0),
        )
    }

    fn terminal_capacity(&self, i: ClientId, k: FacilityId, t: TimeStep) -> LinearConstraint {
        LinearConstraint::new(
            ConstraintClass::TerminalCapacity,
            format!("terminal[{},{}]", i.value(), k.value()),
            LinearExpr::term(self.handles.flow_in(i, k, t), 1.0),
            Relation::Le,
            selected_capacity(&self.handles, k),
        )
    }

    fn client_balance(&self, i: ClientId, t: TimeStep, held: LinearExpr) -> LinearConstraint {
        let outbound = LinearExpr::constant(self.problem.outbound_demand(i, t));
        LinearConstraint::new(
            ConstraintClass::ClientBalance,
            format!("balance[{},{}]", i.value(), t.value()),
            returned_to_facilities(&self.handles, i, t),
            Relation::Eq,
            held + inbound_from_facilities(&self.handles, i, t) - outbound,
        )
    }

    fn demand_coverage(&self, i: ClientId, t: TimeStep, held: LinearExpr) -> LinearConstraint {
        LinearConstraint::new(
            ConstraintClass::DemandCoverage,
            format!("coverage[{},{}]", i.value(), t.value()),
            LinearExpr::constant(self.problem.outbound_demand(i, t)),
            Relation::Le,
            inbound_from_facilities(&self.handles, i, t) + held,
        )
    }

    fn dispatch_ceiling(&self, k: FacilityId, t: TimeStep, held: LinearExpr) -> LinearConstraint {
        LinearConstraint::new(
            ConstraintClass::DispatchCeiling,
            format!("dispatch[{},{}]", k.value(), t.value()),
            dispatched_by(&self.handles, k, t),
            Relation::Le,
            held,
        )
    }

    fn capacity_envelope(&self, k: FacilityId, t: TimeStep, held: LinearExpr) -> LinearConstraint {
        LinearConstraint::new(
            ConstraintClass::CapacityEnvelope,
            format!("envelope[{},{}]", k.value(), t.value()),
            held,
            Relation::Le,
            selected_capacity(&self.handles, k),
        )
    }

    fn global_conservation(&self) -> LinearConstraint {
        let mut expr = LinearExpr::new();
        for t in self.problem.time_steps() {
            for i in self.problem.client_ids() {
                for k in self.problem.facility_ids() {
                    expr.add_term(self.handles.flow_out(i, k, t), 1.0);
                    expr.add_term(self.handles.flow_in(i, k, t), -1.0);
                }
            }
        }
        LinearConstraint::new(
            ConstraintClass::GlobalConservation,
            "conservation",
            expr,
            Relation::Eq,
            LinearExpr::new(),
        )
    }
}
