//! Random instance generation for experiments and smoke tests

use crate::demand::DemandGenerator;
use facalloc_core::{Metric, ProblemBuilder, ProblemData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters of a generated instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceParams {
    pub num_clients: usize,
    pub num_facilities: usize,
    pub horizon: usize,
    /// Side length of the square the points are scattered over
    pub extent: f64,
    /// Tiers per facility; tier `c` holds `c * tier_step` units
    pub num_tiers: u32,
    pub tier_step: u32,
    /// Unit costs are drawn from `[min_unit_cost, max_unit_cost)`
    pub min_unit_cost: f64,
    pub max_unit_cost: f64,
    /// Demand per ordered client pair is drawn from `0..=max_demand`
    pub max_demand: u32,
    pub flow_weight: f64,
    pub metric: Metric,
    pub seed: u64,
}

impl Default for InstanceParams {
    fn default() -> Self {
        Self {
            num_clients: 3,
            num_facilities: 2,
            horizon: 4,
            extent: 5.0,
            num_tiers: 4,
            tier_step: 5,
            min_unit_cost: 1.0,
            max_unit_cost: 3.0,
            max_demand: 5,
            flow_weight: 1.0,
            metric: Metric::Euclidean,
            seed: 0,
        }
    }
}

/// Draw a reproducible instance from `params`.
pub fn random_instance(params: &InstanceParams) -> ProblemData {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let extent = params.extent.max(0.0);
    let point = |rng: &mut StdRng| {
        if extent > 0.0 {
            (rng.gen_range(0.0..extent), rng.gen_range(0.0..extent))
        } else {
            (0.0, 0.0)
        }
    };

    let mut builder = ProblemBuilder::new(params.horizon)
        .flow_weight(params.flow_weight)
        .metric(params.metric);

    for _ in 0..params.num_clients {
        let (x, y) = point(&mut rng);
        builder = builder.client(x, y);
    }

    let tiers: Vec<u32> = (0..params.num_tiers)
        .map(|c| c.saturating_mul(params.tier_step))
        .collect();
    for _ in 0..params.num_facilities {
        let (x, y) = point(&mut rng);
        let unit_cost = if params.max_unit_cost > params.min_unit_cost {
            rng.gen_range(params.min_unit_cost..params.max_unit_cost)
        } else {
            params.min_unit_cost
        };
        builder = builder.facility(x, y, unit_cost, tiers.clone());
    }

    let demand = DemandGenerator::seeded(rng.gen()).uniform(
        params.num_clients,
        params.horizon,
        params.max_demand,
    );
    builder.demand_table(demand).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use facalloc_core::{ClientId, FacilityId};

    #[test]
    fn test_generated_instance_is_valid() {
        let problem = random_instance(&InstanceParams::default());
        problem.validate().unwrap();
        assert_eq!(problem.num_clients(), 3);
        assert_eq!(problem.num_facilities(), 2);
        assert_eq!(problem.facilities[0].tiers, vec![0, 5, 10, 15]);
        for client in &problem.clients {
            assert!((0.0..5.0).contains(&client.location.x));
        }
    }

    #[test]
    fn test_same_seed_same_instance() {
        let params = InstanceParams {
            seed: 99,
            ..InstanceParams::default()
        };
        assert_eq!(random_instance(&params), random_instance(&params));

        let other = InstanceParams {
            seed: 100,
            ..params.clone()
        };
        assert_ne!(random_instance(&params), random_instance(&other));
    }

    #[test]
    fn test_degenerate_extent_and_costs() {
        let params = InstanceParams {
            extent: 0.0,
            min_unit_cost: 2.0,
            max_unit_cost: 2.0,
            ..InstanceParams::default()
        };
        let problem = random_instance(&params);
        problem.validate().unwrap();
        assert!(problem.facilities.iter().all(|f| f.unit_cost == 2.0));
        assert_eq!(problem.distance(ClientId::new(0), FacilityId::new(0)), 0.0);
    }
}
