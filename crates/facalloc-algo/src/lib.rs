//! # facalloc-algo: Facility Sizing and Multi-Period Flow Allocation
//!
//! This crate turns a [`ProblemData`](facalloc_core::ProblemData) instance into a
//! mixed-integer model, hands it to a solver and reads the answer back as a
//! facility roster plus time-indexed flow records.
//!
//! ## Pipeline
//!
//! | Stage | Type | Role |
//! |-------|------|------|
//! | Build | [`ModelBuilder`] | Variables, seven constraint families, objective |
//! | Account | [`balance`] | Closed-form resident/occupancy sums per boundary |
//! | Solve | [`AllocationSolver`] / [`GoodLpSolver`] | Model description → assignment |
//! | Extract | [`ResultExtractor`] | Assignment → roster and flow records |
//!
//! [`solve_allocation`] chains all four stages and wraps the outcome in an
//! [`AllocationSolution`].
//!
//! ## Solver Backends
//!
//! | Backend | Feature | Integer support |
//! |---------|---------|-----------------|
//! | [`LpBackend::Microlp`] | always on | yes |
//! | `LpBackend::Highs` | `solver-highs` | yes |
//! | `LpBackend::Clarabel` | `solver-clarabel` | no (LP relaxation) |
//!
//! ## Example
//!
//! ```
//! use facalloc_algo::{solve_allocation, AllocationConfig, GoodLpSolver};
//! use facalloc_core::{FacilityId, ProblemBuilder};
//!
//! let problem = ProblemBuilder::new(2)
//!     .client(0.0, 0.0)
//!     .facility(0.0, 0.0, 1.0, vec![0, 5])
//!     .facility(10.0, 0.0, 1.0, vec![0, 5])
//!     .demand(0, 0, 0, 5.0)
//!     .default_demand(0.0)
//!     .build();
//!
//! let solution = solve_allocation(&problem, &GoodLpSolver::default(), &AllocationConfig::default())?;
//! assert_eq!(solution.open_capacity[&FacilityId::new(0)], 5);
//! # Ok::<(), facalloc_core::AllocError>(())
//! ```

pub mod balance;
pub mod builder;
pub mod demand;
pub mod extract;
pub mod generate;
pub mod pipeline;
pub mod solution;
pub mod solver;

pub use balance::FlowVariables;
pub use builder::ModelBuilder;
pub use demand::DemandGenerator;
pub use extract::{extract, AllocationResult, FlowRecord, OpenFacility, ResultExtractor};
pub use generate::{random_instance, InstanceParams};
pub use pipeline::{solve_allocation, AllocationConfig};
pub use solution::AllocationSolution;
pub use solver::{AllocationSolver, GoodLpSolver, LpBackend};
