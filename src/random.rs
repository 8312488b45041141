//! Random generators used to initialize the weights of a network.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::err::{NeuraErr, NeuraResult};

pub trait NeuraRandomGenerator {
    fn next_value(&mut self) -> f64;
}

/// Uniform values in `[-radius, radius]`.
#[derive(Clone, Debug)]
pub struct NeuraFixedRangeRandom {
    radius: f64,
    rng: StdRng,
}

impl NeuraFixedRangeRandom {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(radius: f64, seed: u64) -> Self {
        Self {
            radius,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Default for NeuraFixedRangeRandom {
    fn default() -> Self {
        Self::new(0.08)
    }
}

impl NeuraRandomGenerator for NeuraFixedRangeRandom {
    fn next_value(&mut self) -> f64 {
        if self.radius == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.radius..=self.radius)
    }
}

/// Values drawn from a normal distribution.
#[derive(Clone, Debug)]
pub struct NeuraGaussianRandom {
    distribution: Normal<f64>,
    rng: StdRng,
}

impl NeuraGaussianRandom {
    pub fn new(mean: f64, std_dev: f64) -> NeuraResult<Self> {
        Self::with_rng(mean, std_dev, StdRng::from_entropy())
    }

    pub fn seeded(mean: f64, std_dev: f64, seed: u64) -> NeuraResult<Self> {
        Self::with_rng(mean, std_dev, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mean: f64, std_dev: f64, rng: StdRng) -> NeuraResult<Self> {
        // `Normal::new` also accepts negative deviations
        if !(std_dev.is_finite() && std_dev > 0.0) {
            return Err(NeuraErr::InvalidOperation(
                "standard deviation must be finite and positive",
            ));
        }

        let distribution = Normal::new(mean, std_dev)
            .map_err(|_| NeuraErr::InvalidOperation("standard deviation must be finite and positive"))?;

        Ok(Self { distribution, rng })
    }
}

impl NeuraRandomGenerator for NeuraGaussianRandom {
    fn next_value(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fixed_range() {
        let mut generator = NeuraFixedRangeRandom::seeded(0.5, 42);

        for _ in 0..1000 {
            let value = generator.next_value();
            assert!((-0.5..=0.5).contains(&value));
        }

        assert_eq!(NeuraFixedRangeRandom::new(0.0).next_value(), 0.0);
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let mut a = NeuraGaussianRandom::seeded(0.0, 1.0, 7).unwrap();
        let mut b = NeuraGaussianRandom::seeded(0.0, 1.0, 7).unwrap();

        for _ in 0..10 {
            assert_eq!(a.next_value(), b.next_value());
        }

    }

    #[test]
    fn test_gaussian_rejects_invalid_deviations() {
        for std_dev in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                NeuraGaussianRandom::new(0.0, std_dev).err(),
                Some(NeuraErr::InvalidOperation(
                    "standard deviation must be finite and positive"
                ))
            );
        }

        assert!(NeuraGaussianRandom::seeded(0.0, 0.1, 1).is_ok());
    }
}
