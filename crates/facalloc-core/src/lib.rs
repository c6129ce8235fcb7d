//! # facalloc-core: Facility Sizing Data Model
//!
//! Provides the immutable input data and the solver-agnostic model description
//! used by multi-period capacitated facility sizing and flow allocation.
//!
//! ## Design Philosophy
//!
//! A run is described by:
//! - **Clients**: fixed 2-D locations that originate and receive demand
//! - **Facilities**: candidate sites with a unit holding cost and a discrete
//!   list of capacity tiers
//! - **Demand**: a fixed (origin, destination, time) table sampled once per run
//!
//! Decision variables, constraints and the objective live in [`model`]. They
//! carry no solver types, so any backend that accepts binary, integer and
//! continuous variables with linear rows can execute them.
//!
//! ## Quick Start
//!
//! ```rust
//! use facalloc_core::*;
//!
//! let problem = ProblemBuilder::new(2)
//!     .client(0.0, 0.0)
//!     .facility(0.0, 0.0, 1.0, vec![0, 5])
//!     .facility(10.0, 0.0, 1.0, vec![0, 5])
//!     .demand(0, 0, 0, 5.0)
//!     .build();
//!
//! assert!(problem.validate().is_ok());
//! assert_eq!(problem.final_step(), TimeStep::new(1));
//! assert_eq!(problem.effective_demand(ClientId::new(0), ClientId::new(0), TimeStep::new(1)), 0.0);
//! ```
//!
//! ## ID System
//!
//! Every entity has a 0-based newtype ID (`ClientId`, `FacilityId`,
//! `TierIndex`, `TimeStep`) so client and facility indices cannot be swapped
//! by accident when indexing flow variables.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod geometry;
pub mod model;
pub mod problem;

pub use error::{AllocError, AllocResult};
pub use geometry::{distance, Metric, Point};
pub use model::{
    Assignment, ConstraintClass, LinearConstraint, LinearExpr, ModelDescription, ModelStats,
    Objective, Relation, Sense, VarDomain, VarId, VarKey, VariableDecl,
};
pub use problem::{Client, DemandTable, Facility, ProblemBuilder, ProblemData};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierIndex(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStep(usize);

impl ClientId {
    #[inline]
    pub fn new(value: usize) -> Self {
        ClientId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl FacilityId {
    #[inline]
    pub fn new(value: usize) -> Self {
        FacilityId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl TierIndex {
    #[inline]
    pub fn new(value: usize) -> Self {
        TierIndex(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl TimeStep {
    #[inline]
    pub fn new(value: usize) -> Self {
        TimeStep(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "facility#{}", self.0)
    }
}

impl fmt::Display for TierIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier#{}", self.0)
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}
