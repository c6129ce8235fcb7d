//! Solver-agnostic model description
//!
//! This is the boundary between model construction and any solver backend:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ModelDescription                                                │
//! │    variables   : [VariableDecl { key, domain, lower, upper }]    │
//! │    constraints : [LinearConstraint { Σ a·x  (≤ | ≥ | =)  rhs }]  │
//! │    objective   : Objective { sense, Σ c·x + c0 }                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Variables are addressed by dense [`VarId`] handles; every handle also
//! carries the [`VarKey`] it was created for, so a solved [`Assignment`] can be
//! mapped back to facilities, clients and periods.

use crate::{ClientId, FacilityId, TierIndex, TimeStep};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Coefficients smaller than this are dropped when expressions are normalized
const COEFFICIENT_EPSILON: f64 = 1e-12;

/// Handle of a declared variable (its position in the declaration list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn new(value: usize) -> Self {
        VarId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Variable domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarDomain {
    Binary,
    Integer,
    Continuous,
}

impl VarDomain {
    pub fn is_integral(&self) -> bool {
        matches!(self, VarDomain::Binary | VarDomain::Integer)
    }
}

/// What a variable stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarKey {
    /// Facility is sized at the given tier
    TierSelected {
        facility: FacilityId,
        tier: TierIndex,
    },
    /// Units the facility dispatches to the client in a period
    FlowOut {
        client: ClientId,
        facility: FacilityId,
        time: TimeStep,
    },
    /// Units the client returns to the facility in a period
    FlowIn {
        client: ClientId,
        facility: FacilityId,
        time: TimeStep,
    },
}

impl VarKey {
    /// Stable, human-readable variable name
    pub fn name(&self) -> String {
        match self {
            VarKey::TierSelected { facility, tier } => {
                format!("size[{},{}]", facility.value(), tier.value())
            }
            VarKey::FlowOut {
                client,
                facility,
                time,
            } => format!("out[{},{},{}]", client.value(), facility.value(), time.value()),
            VarKey::FlowIn {
                client,
                facility,
                time,
            } => format!("in[{},{},{}]", client.value(), facility.value(), time.value()),
        }
    }
}

/// A declared decision variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub id: VarId,
    pub key: VarKey,
    pub name: String,
    pub domain: VarDomain,
    pub lower: f64,
    /// `None` means unbounded above
    pub upper: Option<f64>,
}

/// Assignment of numeric values to variables, as returned by a solver.
///
/// Variables absent from the map read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    values: BTreeMap<VarId, f64>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, var: VarId, value: f64) {
        self.values.insert(var, value);
    }

    pub fn get(&self, var: VarId) -> Option<f64> {
        self.values.get(&var).copied()
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.get(var).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(VarId, f64)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Affine expression `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    /// Sum of the given variables with unit coefficients
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// `self += factor * other`
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        self.terms
            .extend(other.terms.iter().map(|(v, c)| (*v, c * factor)));
        self.constant += other.constant * factor;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge duplicate variables, drop zero coefficients and order by handle
    pub fn normalized(&self) -> LinearExpr {
        let mut merged: BTreeMap<VarId, f64> = BTreeMap::new();
        for (var, coef) in &self.terms {
            *merged.entry(*var).or_insert(0.0) += coef;
        }
        LinearExpr {
            terms: merged
                .into_iter()
                .filter(|(_, c)| c.abs() > COEFFICIENT_EPSILON)
                .collect(),
            constant: self.constant,
        }
    }

    /// Coefficient of `var` after merging duplicates
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }

    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * assignment.value(*v))
            .sum::<f64>()
            + self.constant
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.add_scaled(&rhs, 1.0);
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self.add_scaled(&rhs, -1.0);
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        let mut out = LinearExpr::new();
        out.add_scaled(&self, -1.0);
        out
    }
}

/// Relational operator of a constraint row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

impl Relation {
    pub fn holds(&self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Relation::Le => lhs <= rhs + tolerance,
            Relation::Ge => lhs >= rhs - tolerance,
            Relation::Eq => (lhs - rhs).abs() <= tolerance,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => write!(f, "<="),
            Relation::Ge => write!(f, ">="),
            Relation::Eq => write!(f, "=="),
        }
    }
}

/// The constraint families emitted by the model builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintClass {
    /// At most one tier per facility
    SizingExclusivity,
    /// Final-period returns bounded by selected capacity
    TerminalCapacity,
    /// Exact conservation at each client in each period
    ClientBalance,
    /// Outbound demand coverable by what is present at the client
    DemandCoverage,
    /// A facility cannot dispatch more than it holds
    DispatchCeiling,
    /// Occupancy never exceeds selected capacity
    CapacityEnvelope,
    /// Everything dispatched is returned by the end of the horizon
    GlobalConservation,
}

impl ConstraintClass {
    pub fn all() -> &'static [ConstraintClass] {
        &[
            ConstraintClass::SizingExclusivity,
            ConstraintClass::TerminalCapacity,
            ConstraintClass::ClientBalance,
            ConstraintClass::DemandCoverage,
            ConstraintClass::DispatchCeiling,
            ConstraintClass::CapacityEnvelope,
            ConstraintClass::GlobalConservation,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConstraintClass::SizingExclusivity => "sizing-exclusivity",
            ConstraintClass::TerminalCapacity => "terminal-capacity",
            ConstraintClass::ClientBalance => "client-balance",
            ConstraintClass::DemandCoverage => "demand-coverage",
            ConstraintClass::DispatchCeiling => "dispatch-ceiling",
            ConstraintClass::CapacityEnvelope => "capacity-envelope",
            ConstraintClass::GlobalConservation => "global-conservation",
        }
    }
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A linear row `expr (relation) rhs`, with all constants folded into `rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub class: ConstraintClass,
    pub label: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Build `lhs (relation) rhs` from two affine sides.
    pub fn new(
        class: ConstraintClass,
        label: impl Into<String>,
        lhs: LinearExpr,
        relation: Relation,
        rhs: LinearExpr,
    ) -> Self {
        let mut expr = (lhs - rhs).normalized();
        let rhs = -expr.constant;
        expr.constant = 0.0;
        Self {
            class,
            label: label.into(),
            expr,
            relation,
            rhs,
        }
    }

    /// Left-hand side value under an assignment
    pub fn activity(&self, assignment: &Assignment) -> f64 {
        self.expr.evaluate(assignment)
    }

    pub fn is_satisfied(&self, assignment: &Assignment, tolerance: f64) -> bool {
        self.relation
            .holds(self.activity(assignment), self.rhs, tolerance)
    }
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Linear objective with a direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

/// Size breakdown of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelStats {
    pub binary_vars: usize,
    pub integer_vars: usize,
    pub continuous_vars: usize,
    pub constraints_by_class: BTreeMap<ConstraintClass, usize>,
    pub nonzeros: usize,
}

impl ModelStats {
    pub fn num_variables(&self) -> usize {
        self.binary_vars + self.integer_vars + self.continuous_vars
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints_by_class.values().sum()
    }
}

/// Complete, immutable model handed to a solver
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescription {
    variables: Vec<VariableDecl>,
    constraints: Vec<LinearConstraint>,
    objective: Objective,
    #[serde(skip)]
    key_index: HashMap<VarKey, VarId>,
}

impl ModelDescription {
    /// Assemble a model. Variable handles must match declaration positions.
    pub fn new(
        variables: Vec<VariableDecl>,
        constraints: Vec<LinearConstraint>,
        objective: Objective,
    ) -> Self {
        debug_assert!(variables
            .iter()
            .enumerate()
            .all(|(idx, v)| v.id.value() == idx));
        let key_index = variables.iter().map(|v| (v.key, v.id)).collect();
        Self {
            variables,
            constraints,
            objective,
            key_index,
        }
    }

    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable(&self, id: VarId) -> Option<&VariableDecl> {
        self.variables.get(id.value())
    }

    /// Handle of the variable created for `key`
    pub fn find(&self, key: VarKey) -> Option<VarId> {
        self.key_index.get(&key).copied()
    }

    pub fn constraints_of(&self, class: ConstraintClass) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.class == class)
    }

    pub fn objective_value(&self, assignment: &Assignment) -> f64 {
        self.objective.expr.evaluate(assignment)
    }

    /// Constraints not satisfied by `assignment` within `tolerance`
    pub fn violations(&self, assignment: &Assignment, tolerance: f64) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(assignment, tolerance))
            .collect()
    }

    pub fn stats(&self) -> ModelStats {
        let mut stats = ModelStats::default();
        for var in &self.variables {
            match var.domain {
                VarDomain::Binary => stats.binary_vars += 1,
                VarDomain::Integer => stats.integer_vars += 1,
                VarDomain::Continuous => stats.continuous_vars += 1,
            }
        }
        for c in &self.constraints {
            *stats.constraints_by_class.entry(c.class).or_insert(0) += 1;
            stats.nonzeros += c.expr.terms().len();
        }
        stats
    }
}
