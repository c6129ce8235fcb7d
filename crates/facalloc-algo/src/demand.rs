//! Demand schedule generation
//!
//! Demand is sampled once into a fixed [`DemandTable`] before a model is
//! built. Every generated table is zero at the final period and on the
//! diagonal, so it can be handed to the builder unchanged.

use facalloc_core::{ClientId, DemandTable, TimeStep};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded source of demand tables
#[derive(Debug, Clone)]
pub struct DemandGenerator {
    rng: StdRng,
}

impl DemandGenerator {
    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `quantity` for every ordered pair of distinct clients in every period
    /// except the last.
    pub fn constant(num_clients: usize, horizon: usize, quantity: f64) -> DemandTable {
        DemandTable::from_fn(num_clients, horizon, |i, j, t| {
            if is_quiet(i, j, t, horizon) {
                0.0
            } else {
                quantity
            }
        })
    }

    /// Integer quantities drawn uniformly from `0..=max` for every ordered
    /// pair of distinct clients in every period except the last.
    pub fn uniform(&mut self, num_clients: usize, horizon: usize, max: u32) -> DemandTable {
        let rng = &mut self.rng;
        DemandTable::from_fn(num_clients, horizon, |i, j, t| {
            if is_quiet(i, j, t, horizon) {
                0.0
            } else {
                f64::from(rng.gen_range(0..=max))
            }
        })
    }
}

fn is_quiet(origin: ClientId, destination: ClientId, time: TimeStep, horizon: usize) -> bool {
    origin == destination || time.value() + 1 >= horizon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule() {
        let table = DemandGenerator::constant(3, 4, 5.0);
        let (a, b) = (ClientId::new(0), ClientId::new(2));
        assert_eq!(table.get(a, b, TimeStep::new(0)), Some(5.0));
        assert_eq!(table.get(b, a, TimeStep::new(2)), Some(5.0));
        assert_eq!(table.get(a, a, TimeStep::new(1)), Some(0.0));
        assert_eq!(table.get(a, b, TimeStep::new(3)), Some(0.0));
        // 6 ordered pairs over 3 active periods
        assert_eq!(table.total(), 6.0 * 3.0 * 5.0);
    }

    #[test]
    fn test_uniform_is_reproducible() {
        let a = DemandGenerator::seeded(42).uniform(4, 3, 9);
        let b = DemandGenerator::seeded(42).uniform(4, 3, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_respects_bounds_and_quiet_entries() {
        let horizon = 3;
        let table = DemandGenerator::seeded(7).uniform(3, horizon, 4);
        for t in 0..horizon {
            for i in 0..3 {
                for j in 0..3 {
                    let q = table
                        .get(ClientId::new(i), ClientId::new(j), TimeStep::new(t))
                        .unwrap();
                    assert!((0.0..=4.0).contains(&q));
                    assert_eq!(q.fract(), 0.0);
                    if i == j || t == horizon - 1 {
                        assert_eq!(q, 0.0);
                    }
                }
            }
        }
    }
}
