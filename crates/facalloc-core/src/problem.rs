//! Problem input data
//!
//! Defines the immutable input of one optimization run: client and facility
//! locations, facility capacity tiers and unit costs, the demand table and the
//! horizon. Everything here is fixed before model construction begins.

use crate::geometry::{Metric, Point};
use crate::{AllocError, AllocResult, ClientId, FacilityId, TierIndex, TimeStep};
use serde::{Deserialize, Serialize};

/// A client location that originates and receives demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub location: Point,
}

/// A candidate facility site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub location: Point,
    /// Cost of holding one unit of capacity at this site
    pub unit_cost: f64,
    /// Number of units each tier can hold. Tier 0 is the "closed" or smallest
    /// option; at most one tier is selected per facility.
    pub tiers: Vec<u32>,
}

impl Facility {
    pub fn new(id: usize, location: impl Into<Point>, unit_cost: f64, tiers: Vec<u32>) -> Self {
        Self {
            id: FacilityId::new(id),
            location: location.into(),
            unit_cost,
            tiers,
        }
    }

    /// Capacity of a tier, if the tier exists
    pub fn capacity(&self, tier: TierIndex) -> Option<u32> {
        self.tiers.get(tier.value()).copied()
    }

    /// Largest capacity any tier offers (0 for a facility without tiers)
    pub fn max_capacity(&self) -> u32 {
        self.tiers.iter().copied().max().unwrap_or(0)
    }

    pub fn num_tiers(&self) -> usize {
        self.tiers.len()
    }
}

/// Dense (origin, destination, time) demand table.
///
/// Entries may be left undefined; [`ProblemData::validate`] rejects undefined
/// entries for every period except the final one, whose demand is always
/// overridden to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTable {
    num_clients: usize,
    horizon: usize,
    entries: Vec<Option<f64>>,
}

impl DemandTable {
    /// Create a table with every entry undefined
    pub fn new(num_clients: usize, horizon: usize) -> Self {
        Self {
            num_clients,
            horizon,
            entries: vec![None; num_clients * num_clients * horizon],
        }
    }

    /// Create a table with every entry set to `quantity`
    pub fn filled(num_clients: usize, horizon: usize, quantity: f64) -> Self {
        Self {
            num_clients,
            horizon,
            entries: vec![Some(quantity); num_clients * num_clients * horizon],
        }
    }

    /// Sample every entry once from `f(origin, destination, time)`
    pub fn from_fn<F>(num_clients: usize, horizon: usize, mut f: F) -> Self
    where
        F: FnMut(ClientId, ClientId, TimeStep) -> f64,
    {
        let mut table = Self::new(num_clients, horizon);
        for t in 0..horizon {
            for i in 0..num_clients {
                for j in 0..num_clients {
                    let (origin, destination, time) =
                        (ClientId::new(i), ClientId::new(j), TimeStep::new(t));
                    table.set(origin, destination, time, f(origin, destination, time));
                }
            }
        }
        table
    }

    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    fn index(&self, origin: ClientId, destination: ClientId, time: TimeStep) -> Option<usize> {
        let (i, j, t) = (origin.value(), destination.value(), time.value());
        if i >= self.num_clients || j >= self.num_clients || t >= self.horizon {
            return None;
        }
        Some((t * self.num_clients + i) * self.num_clients + j)
    }

    /// Quantity demanded from `origin` to `destination` in period `time`
    ///
    /// Returns `None` for undefined or out-of-range entries.
    pub fn get(&self, origin: ClientId, destination: ClientId, time: TimeStep) -> Option<f64> {
        self.index(origin, destination, time)
            .and_then(|idx| self.entries[idx])
    }

    /// Set a single entry. Out-of-range coordinates are ignored and reported
    /// through the return value.
    pub fn set(
        &mut self,
        origin: ClientId,
        destination: ClientId,
        time: TimeStep,
        quantity: f64,
    ) -> bool {
        match self.index(origin, destination, time) {
            Some(idx) => {
                self.entries[idx] = Some(quantity);
                true
            }
            None => false,
        }
    }

    /// Fill every undefined entry with `quantity`
    pub fn fill_undefined(&mut self, quantity: f64) {
        for entry in self.entries.iter_mut().filter(|e| e.is_none()) {
            *entry = Some(quantity);
        }
    }

    /// Sum of all defined entries
    pub fn total(&self) -> f64 {
        self.entries.iter().flatten().sum()
    }
}

/// Complete input for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemData {
    pub clients: Vec<Client>,
    pub facilities: Vec<Facility>,
    pub demand: DemandTable,
    /// Number of discrete periods
    pub horizon: usize,
    /// Weight of the flow cost relative to the sizing cost
    pub flow_weight: f64,
    /// Metric used for client-facility distances
    #[serde(default)]
    pub metric: Metric,
    /// Demand entries handed to the builder with coordinates outside the table
    #[serde(skip)]
    pub rejected_demand: Vec<(ClientId, ClientId, TimeStep)>,
}

impl ProblemData {
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn num_facilities(&self) -> usize {
        self.facilities.len()
    }

    /// The last period of the horizon
    pub fn final_step(&self) -> TimeStep {
        TimeStep::new(self.horizon.saturating_sub(1))
    }

    pub fn time_steps(&self) -> impl Iterator<Item = TimeStep> {
        (0..self.horizon).map(TimeStep::new)
    }

    pub fn client_ids(&self) -> impl Iterator<Item = ClientId> {
        (0..self.clients.len()).map(ClientId::new)
    }

    pub fn facility_ids(&self) -> impl Iterator<Item = FacilityId> {
        (0..self.facilities.len()).map(FacilityId::new)
    }

    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(id.value())
    }

    /// Demand as seen by the model.
    ///
    /// Demand in the final period is always zero so every unit can drain back
    /// to a facility before the horizon ends. Undefined entries read as zero;
    /// validation rejects them before a model is built.
    pub fn effective_demand(&self, origin: ClientId, destination: ClientId, time: TimeStep) -> f64 {
        if time >= self.final_step() {
            return 0.0;
        }
        self.demand.get(origin, destination, time).unwrap_or(0.0)
    }

    /// Total demand leaving `client` in period `time`
    pub fn outbound_demand(&self, client: ClientId, time: TimeStep) -> f64 {
        self.client_ids()
            .map(|j| self.effective_demand(client, j, time))
            .sum()
    }

    /// Distance between a client and a facility under the configured metric
    pub fn distance(&self, client: ClientId, facility: FacilityId) -> f64 {
        let a = self.clients[client.value()].location;
        let b = self.facilities[facility.value()].location;
        self.metric.distance(a, b)
    }

    /// Capacity available if every facility picked its largest tier
    pub fn total_max_capacity(&self) -> u64 {
        self.facilities
            .iter()
            .map(|f| u64::from(f.max_capacity()))
            .sum()
    }

    /// Check every structural rule the model builder relies on.
    pub fn validate(&self) -> AllocResult<()> {
        if self.horizon == 0 {
            return Err(AllocError::malformed("horizon must be at least one period"));
        }
        if !self.flow_weight.is_finite() || self.flow_weight < 0.0 {
            return Err(AllocError::malformed(format!(
                "flow weight must be finite and non-negative, got {}",
                self.flow_weight
            )));
        }

        for (idx, client) in self.clients.iter().enumerate() {
            if client.id.value() != idx {
                return Err(AllocError::malformed(format!(
                    "client at position {} carries id {}",
                    idx,
                    client.id.value()
                )));
            }
            if !client.location.is_finite() {
                return Err(AllocError::malformed(format!(
                    "{} has a non-finite location",
                    client.id
                )));
            }
        }

        for (idx, facility) in self.facilities.iter().enumerate() {
            if facility.id.value() != idx {
                return Err(AllocError::malformed(format!(
                    "facility at position {} carries id {}",
                    idx,
                    facility.id.value()
                )));
            }
            if facility.tiers.is_empty() {
                return Err(AllocError::malformed(format!(
                    "{} has no capacity tiers",
                    facility.id
                )));
            }
            if !facility.location.is_finite() {
                return Err(AllocError::malformed(format!(
                    "{} has a non-finite location",
                    facility.id
                )));
            }
            if !facility.unit_cost.is_finite() || facility.unit_cost < 0.0 {
                return Err(AllocError::malformed(format!(
                    "{} unit cost must be finite and non-negative, got {}",
                    facility.id, facility.unit_cost
                )));
            }
        }

        self.validate_demand()
    }

    fn validate_demand(&self) -> AllocResult<()> {
        let n = self.clients.len();
        if let Some(&(i, j, t)) = self.rejected_demand.first() {
            return Err(AllocError::malformed(format!(
                "demand entry ({}, {}, {}) is outside {} clients over {} periods",
                i, j, t, n, self.horizon
            )));
        }
        if self.demand.num_clients() != n || self.demand.horizon() != self.horizon {
            return Err(AllocError::malformed(format!(
                "demand table is {}x{}x{} but the problem has {} clients over {} periods",
                self.demand.num_clients(),
                self.demand.num_clients(),
                self.demand.horizon(),
                n,
                self.horizon
            )));
        }

        let final_step = self.final_step();
        for t in self.time_steps() {
            for i in self.client_ids() {
                for j in self.client_ids() {
                    match self.demand.get(i, j, t) {
                        None if t < final_step => {
                            return Err(AllocError::malformed(format!(
                                "demand undefined for ({}, {}, {})",
                                i, j, t
                            )));
                        }
                        Some(q) if !q.is_finite() || q < 0.0 => {
                            return Err(AllocError::malformed(format!(
                                "demand for ({}, {}, {}) must be finite and non-negative, got {}",
                                i, j, t, q
                            )));
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

/// Builder for constructing problem instances
pub struct ProblemBuilder {
    horizon: usize,
    flow_weight: f64,
    metric: Metric,
    clients: Vec<Client>,
    facilities: Vec<Facility>,
    demand: Vec<(usize, usize, usize, f64)>,
    default_demand: Option<f64>,
    table: Option<DemandTable>,
}

impl ProblemBuilder {
    /// Start building a problem over `horizon` periods
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            flow_weight: 1.0,
            metric: Metric::Euclidean,
            clients: Vec::new(),
            facilities: Vec::new(),
            demand: Vec::new(),
            default_demand: None,
            table: None,
        }
    }

    /// Add a client with an auto-generated ID
    pub fn client(mut self, x: f64, y: f64) -> Self {
        let id = ClientId::new(self.clients.len());
        self.clients.push(Client {
            id,
            location: Point::new(x, y),
        });
        self
    }

    /// Add a facility with an auto-generated ID
    pub fn facility(mut self, x: f64, y: f64, unit_cost: f64, tiers: Vec<u32>) -> Self {
        let facility = Facility::new(self.facilities.len(), (x, y), unit_cost, tiers);
        self.facilities.push(facility);
        self
    }

    /// Add a facility whose tiers hold 0, 1, ..., `num_tiers - 1` units
    pub fn facility_with_uniform_tiers(self, x: f64, y: f64, unit_cost: f64, num_tiers: u32) -> Self {
        self.facility(x, y, unit_cost, (0..num_tiers).collect())
    }

    /// Set a single demand entry
    pub fn demand(mut self, origin: usize, destination: usize, time: usize, quantity: f64) -> Self {
        self.demand.push((origin, destination, time, quantity));
        self
    }

    /// Quantity used for every entry not set explicitly
    pub fn default_demand(mut self, quantity: f64) -> Self {
        self.default_demand = Some(quantity);
        self
    }

    /// Use a precomputed table; explicit entries are applied on top of it
    pub fn demand_table(mut self, table: DemandTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn flow_weight(mut self, weight: f64) -> Self {
        self.flow_weight = weight;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Build the problem. Validation is deferred to [`ProblemData::validate`].
    pub fn build(self) -> ProblemData {
        let n = self.clients.len();
        let mut table = self
            .table
            .unwrap_or_else(|| DemandTable::new(n, self.horizon));
        let mut rejected_demand = Vec::new();
        for (i, j, t, q) in self.demand {
            let key = (ClientId::new(i), ClientId::new(j), TimeStep::new(t));
            if !table.set(key.0, key.1, key.2, q) {
                rejected_demand.push(key);
            }
        }
        if let Some(q) = self.default_demand {
            table.fill_undefined(q);
        }

        ProblemData {
            clients: self.clients,
            facilities: self.facilities,
            demand: table,
            horizon: self.horizon,
            flow_weight: self.flow_weight,
            metric: self.metric,
            rejected_demand,
        }
    }
}
