//! Result extraction
//!
//! Turns a raw [`Assignment`] into the open-facility roster and the
//! time-indexed dispatch and return records. Feasibility is not re-checked.

use facalloc_core::{
    AllocError, AllocResult, Assignment, ClientId, FacilityId, ModelDescription, TierIndex,
    TimeStep, VarKey,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// A facility together with the tier the solver selected for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct OpenFacility {
    pub facility: FacilityId,
    pub tier: TierIndex,
}

/// One non-zero flow between a client and a facility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRecord {
    pub client: ClientId,
    pub facility: FacilityId,
    pub quantity: f64,
}

/// Structured view of a solved assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationResult {
    /// Every tier-selection variable with a non-zero value
    pub open_facilities: Vec<OpenFacility>,
    /// Facility-to-client sends, keyed by period
    pub dispatches: BTreeMap<TimeStep, Vec<FlowRecord>>,
    /// Client-to-facility returns, keyed by period
    pub returns: BTreeMap<TimeStep, Vec<FlowRecord>>,
}

impl AllocationResult {
    /// Selected tier of `facility`, if it was opened
    pub fn tier_of(&self, facility: FacilityId) -> Option<TierIndex> {
        self.open_facilities
            .iter()
            .find(|open| open.facility == facility)
            .map(|open| open.tier)
    }

    pub fn dispatches_at(&self, time: TimeStep) -> &[FlowRecord] {
        self.dispatches.get(&time).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn returns_at(&self, time: TimeStep) -> &[FlowRecord] {
        self.returns.get(&time).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sum of all dispatched units across the horizon
    pub fn total_dispatched(&self) -> f64 {
        self.dispatches.values().flatten().map(|r| r.quantity).sum()
    }

    /// Sum of all returned units across the horizon
    pub fn total_returned(&self) -> f64 {
        self.returns.values().flatten().map(|r| r.quantity).sum()
    }

    /// Quantity sent by `facility` to `client` in `time`, zero when absent
    pub fn dispatched(&self, client: ClientId, facility: FacilityId, time: TimeStep) -> f64 {
        find_quantity(self.dispatches_at(time), client, facility)
    }

    /// Quantity returned by `client` to `facility` in `time`, zero when absent
    pub fn returned(&self, client: ClientId, facility: FacilityId, time: TimeStep) -> f64 {
        find_quantity(self.returns_at(time), client, facility)
    }
}

fn find_quantity(records: &[FlowRecord], client: ClientId, facility: FacilityId) -> f64 {
    records
        .iter()
        .filter(|r| r.client == client && r.facility == facility)
        .map(|r| r.quantity)
        .sum()
}

/// Converts assignments of one model into [`AllocationResult`]s.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor {
    tolerance: f64,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl ResultExtractor {
    /// Values with magnitude at or below `tolerance` count as zero
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn extract(
        &self,
        model: &ModelDescription,
        assignment: &Assignment,
    ) -> AllocResult<AllocationResult> {
        let mut result = AllocationResult::default();

        for (var, raw) in assignment.iter() {
            let decl = model.variable(var).ok_or_else(|| {
                AllocError::Extraction(format!(
                    "assignment references {} but the model declares only {} variables",
                    var,
                    model.num_variables()
                ))
            })?;
            if !raw.is_finite() {
                return Err(AllocError::Extraction(format!(
                    "non-finite value {} for {}",
                    raw, decl.name
                )));
            }

            let value = if decl.domain.is_integral() {
                raw.round()
            } else {
                raw
            };
            if value.abs() <= self.tolerance {
                continue;
            }

            match decl.key {
                VarKey::TierSelected { facility, tier } => {
                    result.open_facilities.push(OpenFacility { facility, tier });
                }
                VarKey::FlowOut {
                    client,
                    facility,
                    time,
                } => result.dispatches.entry(time).or_default().push(FlowRecord {
                    client,
                    facility,
                    quantity: value,
                }),
                VarKey::FlowIn {
                    client,
                    facility,
                    time,
                } => result.returns.entry(time).or_default().push(FlowRecord {
                    client,
                    facility,
                    quantity: value,
                }),
            }
        }

        result.open_facilities.sort();
        Ok(result)
    }
}

/// Extract with the default tolerance
pub fn extract(model: &ModelDescription, assignment: &Assignment) -> AllocResult<AllocationResult> {
    ResultExtractor::default().extract(model, assignment)
}
