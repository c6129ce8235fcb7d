//! Instance files
//!
//! An instance is stored as TOML or JSON. Demand is a sparse list of
//! `(origin, destination, time, quantity)` entries; `default_demand` fills
//! every entry the list does not name.
//!
//! ```toml
//! horizon = 2
//! default_demand = 0.0
//!
//! [[clients]]
//! x = 0.0
//! y = 0.0
//!
//! [[facilities]]
//! x = 0.0
//! y = 0.0
//! unit_cost = 1.0
//! tiers = [0, 5]
//!
//! [[demand]]
//! origin = 0
//! destination = 0
//! time = 0
//! quantity = 5.0
//! ```

use facalloc_core::{AllocError, AllocResult, Metric, ProblemBuilder, ProblemData};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFile {
    pub horizon: usize,
    #[serde(default = "default_flow_weight")]
    pub flow_weight: f64,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_demand: Option<f64>,
    pub clients: Vec<PointInput>,
    pub facilities: Vec<FacilityInput>,
    #[serde(default)]
    pub demand: Vec<DemandInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointInput {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityInput {
    pub x: f64,
    pub y: f64,
    pub unit_cost: f64,
    pub tiers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandInput {
    pub origin: usize,
    pub destination: usize,
    pub time: usize,
    pub quantity: f64,
}

fn default_flow_weight() -> f64 {
    1.0
}

impl InstanceFile {
    /// Convert into problem data. Out-of-range demand entries are rejected
    /// here; everything else is left to [`ProblemData::validate`].
    pub fn to_problem(&self) -> AllocResult<ProblemData> {
        let mut builder = ProblemBuilder::new(self.horizon)
            .flow_weight(self.flow_weight)
            .metric(self.metric);

        for client in &self.clients {
            builder = builder.client(client.x, client.y);
        }
        for facility in &self.facilities {
            builder = builder.facility(
                facility.x,
                facility.y,
                facility.unit_cost,
                facility.tiers.clone(),
            );
        }

        let n = self.clients.len();
        for entry in &self.demand {
            if entry.origin >= n || entry.destination >= n || entry.time >= self.horizon {
                return Err(AllocError::malformed(format!(
                    "demand entry ({}, {}, {}) is outside {} clients x horizon {}",
                    entry.origin, entry.destination, entry.time, n, self.horizon
                )));
            }
            builder = builder.demand(entry.origin, entry.destination, entry.time, entry.quantity);
        }
        if let Some(quantity) = self.default_demand {
            builder = builder.default_demand(quantity);
        }

        Ok(builder.build())
    }

    /// Sparse representation of `problem`: non-zero demand entries only, with
    /// a zero default.
    pub fn from_problem(problem: &ProblemData) -> Self {
        let mut demand = Vec::new();
        for t in problem.time_steps() {
            for i in problem.client_ids() {
                for j in problem.client_ids() {
                    if let Some(quantity) = problem.demand.get(i, j, t) {
                        if quantity != 0.0 {
                            demand.push(DemandInput {
                                origin: i.value(),
                                destination: j.value(),
                                time: t.value(),
                                quantity,
                            });
                        }
                    }
                }
            }
        }

        Self {
            horizon: problem.horizon,
            flow_weight: problem.flow_weight,
            metric: problem.metric,
            default_demand: Some(0.0),
            clients: problem
                .clients
                .iter()
                .map(|c| PointInput {
                    x: c.location.x,
                    y: c.location.y,
                })
                .collect(),
            facilities: problem
                .facilities
                .iter()
                .map(|f| FacilityInput {
                    x: f.location.x,
                    y: f.location.y,
                    unit_cost: f.unit_cost,
                    tiers: f.tiers.clone(),
                })
                .collect(),
            demand,
        }
    }

    /// Demand defined for `(origin, destination, time)` after defaults apply
    pub fn demand_at(&self, origin: usize, destination: usize, time: usize) -> Option<f64> {
        self.demand
            .iter()
            .rev()
            .find(|e| e.origin == origin && e.destination == destination && e.time == time)
            .map(|e| e.quantity)
            .or(self.default_demand)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read an instance; `.json` files are parsed as JSON, anything else as TOML.
pub fn load_instance(path: &Path) -> AllocResult<InstanceFile> {
    let contents = std::fs::read_to_string(path)?;
    if is_json(path) {
        serde_json::from_str(&contents)
            .map_err(|e| AllocError::Parse(format!("{}: {}", path.display(), e)))
    } else {
        toml::from_str(&contents)
            .map_err(|e| AllocError::Parse(format!("{}: {}", path.display(), e)))
    }
}

pub fn write_instance(path: &Path, instance: &InstanceFile) -> AllocResult<()> {
    let contents = if is_json(path) {
        serde_json::to_string_pretty(instance).map_err(|e| AllocError::Parse(e.to_string()))?
    } else {
        toml::to_string_pretty(instance).map_err(|e| AllocError::Parse(e.to_string()))?
    };
    std::fs::write(path, contents)?;
    Ok(())
}
