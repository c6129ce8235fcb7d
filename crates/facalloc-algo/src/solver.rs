//! Solver seam and good_lp backends
//!
//! The core only ever talks to an [`AllocationSolver`]. [`GoodLpSolver`]
//! translates a [`ModelDescription`] into a good_lp problem for one of the
//! compiled-in backends and maps the outcome back into an [`Assignment`].

use facalloc_core::{
    AllocError, AllocResult, Assignment, ModelDescription, Relation, Sense, VarDomain, VarId,
};
use good_lp::solvers::Solver as LpSolver;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Anything that can turn a model description into a variable assignment.
///
/// Implementations report infeasibility and unboundedness through
/// [`AllocError::Infeasible`] and [`AllocError::Unbounded`].
pub trait AllocationSolver: Send + Sync {
    /// Short identifier used in logs and reports
    fn id(&self) -> &str;

    fn solve(&self, model: &ModelDescription) -> AllocResult<Assignment>;
}

/// good_lp backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LpBackend {
    /// Pure-Rust MILP solver, always available
    #[default]
    Microlp,
    #[cfg(feature = "solver-highs")]
    Highs,
    /// Interior-point conic solver; integrality is relaxed
    #[cfg(feature = "solver-clarabel")]
    Clarabel,
}

const AVAILABLE_LP_BACKENDS: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-highs")]
    "highs",
    #[cfg(feature = "solver-clarabel")]
    "clarabel",
];

impl LpBackend {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_LP_BACKENDS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LpBackend::Microlp => "microlp",
            #[cfg(feature = "solver-highs")]
            LpBackend::Highs => "highs",
            #[cfg(feature = "solver-clarabel")]
            LpBackend::Clarabel => "clarabel",
        }
    }

    /// Whether the backend honours integer and binary domains
    pub fn supports_integers(&self) -> bool {
        match self {
            LpBackend::Microlp => true,
            #[cfg(feature = "solver-highs")]
            LpBackend::Highs => true,
            #[cfg(feature = "solver-clarabel")]
            LpBackend::Clarabel => false,
        }
    }
}

impl fmt::Display for LpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unknown_backend_error(label: &str) -> AllocError {
    AllocError::Config(format!(
        "unknown lp solver '{}'; supported values: {}",
        label,
        LpBackend::available().join(", ")
    ))
}

impl FromStr for LpBackend {
    type Err = AllocError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" | "default" => Ok(LpBackend::Microlp),
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(LpBackend::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_backend_error(&normalized))
                }
            }
            "clarabel" => {
                #[cfg(feature = "solver-clarabel")]
                {
                    Ok(LpBackend::Clarabel)
                }
                #[cfg(not(feature = "solver-clarabel"))]
                {
                    Err(unknown_backend_error(&normalized))
                }
            }
            other => Err(unknown_backend_error(other)),
        }
    }
}

/// [`AllocationSolver`] backed by good_lp
#[derive(Debug, Clone, Default)]
pub struct GoodLpSolver {
    backend: LpBackend,
}

impl GoodLpSolver {
    pub fn new(backend: LpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> LpBackend {
        self.backend
    }
}

impl AllocationSolver for GoodLpSolver {
    fn id(&self) -> &str {
        self.backend.as_str()
    }

    fn solve(&self, model: &ModelDescription) -> AllocResult<Assignment> {
        let integral = self.backend.supports_integers();
        if !integral && model.variables().iter().any(|v| v.domain.is_integral()) {
            warn!(
                backend = self.backend.as_str(),
                "backend has no integer support; solving the LP relaxation"
            );
        }

        match self.backend {
            LpBackend::Microlp => solve_with(model, good_lp::solvers::microlp::microlp, integral),
            #[cfg(feature = "solver-highs")]
            LpBackend::Highs => solve_with(model, good_lp::solvers::highs::highs, integral),
            #[cfg(feature = "solver-clarabel")]
            LpBackend::Clarabel => solve_with(model, good_lp::solvers::clarabel::clarabel, integral),
        }
    }
}

fn solve_with<S>(model: &ModelDescription, solver: S, integral: bool) -> AllocResult<Assignment>
where
    S: LpSolver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .variables()
        .iter()
        .map(|decl| {
            let mut def = variable().min(decl.lower);
            if let Some(upper) = decl.upper {
                def = def.max(upper);
            }
            if integral && decl.domain.is_integral() {
                def = def.integer();
            }
            vars.add(def.name(decl.name.clone()))
        })
        .collect();

    let objective = to_expression(&handles, model.objective().expr.terms(), "objective")?
        + model.objective().expr.constant_term();
    let mut problem = match model.objective().sense {
        Sense::Minimize => vars.minimise(objective),
        Sense::Maximize => vars.maximise(objective),
    }
    .using(solver);

    let mut emitted = 0usize;
    for row in model.constraints() {
        let rhs = row.rhs;
        if row.expr.is_empty() {
            if !row.relation.holds(0.0, rhs, 1e-9) {
                return Err(AllocError::Infeasible(format!(
                    "constraint {} reduces to 0 {} {}",
                    row.label, row.relation, rhs
                )));
            }
            continue;
        }
        let lhs = to_expression(&handles, row.expr.terms(), &row.label)?;
        problem = match row.relation {
            Relation::Le => problem.with(constraint!(lhs <= rhs)),
            Relation::Ge => problem.with(constraint!(lhs >= rhs)),
            Relation::Eq => problem.with(constraint!(lhs == rhs)),
        };
        emitted += 1;
    }

    debug!(
        variables = handles.len(),
        constraints = emitted,
        integral,
        "handing model to good_lp"
    );

    let solution = problem.solve().map_err(map_resolution_error)?;

    Ok(model
        .variables()
        .iter()
        .zip(&handles)
        .map(|(decl, var)| {
            let value = solution.value(*var);
            let value = match decl.domain {
                VarDomain::Binary | VarDomain::Integer if integral => value.round(),
                _ => value,
            };
            (decl.id, value)
        })
        .collect())
}

fn to_expression(
    handles: &[Variable],
    terms: &[(VarId, f64)],
    context: &str,
) -> AllocResult<Expression> {
    let mut expr = Expression::from(0.0);
    for &(var, coef) in terms {
        let handle = handles.get(var.value()).ok_or_else(|| {
            AllocError::Solver(format!(
                "{} references undeclared variable {} ({} declared)",
                context,
                var,
                handles.len()
            ))
        })?;
        expr += coef * *handle;
    }
    Ok(expr)
}

fn map_resolution_error(err: ResolutionError) -> AllocError {
    match err {
        ResolutionError::Infeasible => {
            AllocError::Infeasible("no assignment satisfies every constraint".to_string())
        }
        ResolutionError::Unbounded => {
            AllocError::Unbounded("objective has no finite optimum".to_string())
        }
        other => AllocError::Solver(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facalloc_core::{
        ConstraintClass, FacilityId, LinearConstraint, LinearExpr, Objective, TierIndex, VarKey,
        VariableDecl,
    };

    fn binary(id: usize) -> VariableDecl {
        let key = VarKey::TierSelected {
            facility: FacilityId::new(id),
            tier: TierIndex::new(0),
        };
        VariableDecl {
            id: VarId::new(id),
            key,
            name: key.name(),
            domain: VarDomain::Binary,
            lower: 0.0,
            upper: Some(1.0),
        }
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("microlp".parse::<LpBackend>().unwrap(), LpBackend::Microlp);
        assert_eq!("MicroLP".parse::<LpBackend>().unwrap(), LpBackend::Microlp);
        assert_eq!(LpBackend::default().as_str(), "microlp");
    }

    #[test]
    fn test_unknown_backend_lists_supported_values() {
        let err = "gurobi".parse::<LpBackend>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown lp solver 'gurobi'"));
        assert!(msg.contains("microlp"));
    }

    #[cfg(not(feature = "solver-highs"))]
    #[test]
    fn test_disabled_backend_is_rejected() {
        assert!("highs".parse::<LpBackend>().is_err());
    }

    #[test]
    fn test_microlp_picks_cheapest_binary() {
        // min 3a + 2b  s.t. a + b >= 1
        let (a, b) = (VarId::new(0), VarId::new(1));
        let model = ModelDescription::new(
            vec![binary(0), binary(1)],
            vec![LinearConstraint::new(
                ConstraintClass::SizingExclusivity,
                "cover",
                LinearExpr::sum([a, b]),
                Relation::Ge,
                LinearExpr::constant(1.0),
            )],
            Objective {
                sense: Sense::Minimize,
                expr: LinearExpr::term(a, 3.0) + LinearExpr::term(b, 2.0),
            },
        );

        let assignment = GoodLpSolver::default().solve(&model).unwrap();
        assert_eq!(assignment.value(a), 0.0);
        assert_eq!(assignment.value(b), 1.0);
        assert_eq!(assignment.len(), 2);
    }

    #[test]
    fn test_infeasible_model_is_reported() {
        let a = VarId::new(0);
        let model = ModelDescription::new(
            vec![binary(0)],
            vec![LinearConstraint::new(
                ConstraintClass::DemandCoverage,
                "too-much",
                LinearExpr::term(a, 1.0),
                Relation::Ge,
                LinearExpr::constant(2.0),
            )],
            Objective {
                sense: Sense::Minimize,
                expr: LinearExpr::term(a, 1.0),
            },
        );

        let err = GoodLpSolver::default().solve(&model).unwrap_err();
        assert!(matches!(err, AllocError::Infeasible(_)));
    }

    #[test]
    fn test_trivially_violated_row_is_infeasible() {
        let model = ModelDescription::new(
            vec![binary(0)],
            vec![LinearConstraint::new(
                ConstraintClass::DemandCoverage,
                "coverage[0,0]",
                LinearExpr::constant(5.0),
                Relation::Le,
                LinearExpr::new(),
            )],
            Objective {
                sense: Sense::Minimize,
                expr: LinearExpr::new(),
            },
        );

        let err = GoodLpSolver::default().solve(&model).unwrap_err();
        assert!(err.to_string().contains("coverage[0,0]"));
    }

    #[test]
    fn test_undeclared_variable_in_row_is_solver_error() {
        let model = ModelDescription::new(
            vec![binary(0)],
            vec![LinearConstraint::new(
                ConstraintClass::DemandCoverage,
                "coverage[1,0]",
                LinearExpr::term(VarId::new(5), 1.0),
                Relation::Ge,
                LinearExpr::constant(1.0),
            )],
            Objective {
                sense: Sense::Minimize,
                expr: LinearExpr::term(VarId::new(0), 1.0),
            },
        );

        let err = GoodLpSolver::default().solve(&model).unwrap_err();
        assert!(matches!(err, AllocError::Solver(_)));
        let msg = err.to_string();
        assert!(msg.contains("coverage[1,0]"));
        assert!(msg.contains("undeclared variable v5"));
    }

    #[test]
    fn test_undeclared_variable_in_objective_is_solver_error() {
        let model = ModelDescription::new(
            vec![binary(0)],
            vec![],
            Objective {
                sense: Sense::Minimize,
                expr: LinearExpr::term(VarId::new(3), 2.0),
            },
        );

        let err = GoodLpSolver::default().solve(&model).unwrap_err();
        assert!(matches!(err, AllocError::Solver(_)));
        assert!(err.to_string().contains("undeclared variable v3"));
    }
}
