use nalgebra::DVector;
use rand::Rng;

use crate::err::{NeuraErr, NeuraResult};

/// Which values of a layer input are dropped during a training forward pass.
///
/// The kept values are scaled by `multiplier`, so that the expected sum of the input does not
/// change.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraDropoutMask {
    mask: DVector<bool>,
    multiplier: f64,
}

impl NeuraDropoutMask {
    /// Drops each of the `length` values with the given `probability`, in `[0, 1)`.
    pub fn sample(length: usize, probability: f64, rng: &mut impl Rng) -> NeuraResult<Self> {
        if !(0.0..1.0).contains(&probability) {
            return Err(NeuraErr::InvalidOperation(
                "the dropout probability must be in [0, 1)",
            ));
        }

        let mut mask = DVector::from_element(length, false);

        // Rejection sampling to prevent all the inputs from being dropped out
        loop {
            let mut dropped = 0;
            for value in mask.iter_mut() {
                *value = rng.gen_bool(probability);
                dropped += *value as usize;
            }

            if dropped < length || length == 0 {
                let multiplier = if length == 0 {
                    1.0
                } else {
                    length as f64 / (length - dropped) as f64
                };

                return Ok(Self { mask, multiplier });
            }
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    #[inline(always)]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn is_dropped(&self, index: usize) -> bool {
        self.mask[index]
    }

    /// Zeroes the dropped values and scales the other ones.
    pub fn apply(&self, vector: &mut DVector<f64>) -> NeuraResult<()> {
        if vector.len() != self.len() {
            return Err(NeuraErr::mismatch(
                "dropout mask",
                (self.len(), 1),
                (vector.len(), 1),
            ));
        }

        for (value, &dropped) in vector.iter_mut().zip(self.mask.iter()) {
            if dropped {
                *value = 0.0;
            } else {
                *value *= self.multiplier;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_rejection_sampling() {
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..100 {
            let mask = NeuraDropoutMask::sample(1, 0.9, &mut rng).unwrap();
            assert!(!mask.is_dropped(0));
            assert!(mask.multiplier().is_finite());
            assert_eq!(mask.multiplier(), 1.0);
        }
    }

    #[test]
    fn test_apply() {
        let mut rng = StdRng::seed_from_u64(7);
        let mask = NeuraDropoutMask::sample(6, 0.5, &mut rng).unwrap();
        let dropped = (0..6).filter(|&index| mask.is_dropped(index)).count();

        assert!(dropped < 6);
        assert_eq!(mask.multiplier(), 6.0 / (6 - dropped) as f64);

        let mut values = dvector![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        mask.apply(&mut values).unwrap();

        for index in 0..6 {
            if mask.is_dropped(index) {
                assert_eq!(values[index], 0.0);
            } else {
                assert_eq!(values[index], (index + 1) as f64 * mask.multiplier());
            }
        }

        assert!(mask.apply(&mut dvector![1.0]).is_err());
    }

    #[test]
    fn test_zero_probability() {
        let mut rng = StdRng::seed_from_u64(1);
        let mask = NeuraDropoutMask::sample(3, 0.0, &mut rng).unwrap();

        let mut values = dvector![1.0, -2.0, 3.0];
        mask.apply(&mut values).unwrap();
        assert_eq!(values, dvector![1.0, -2.0, 3.0]);

        assert!(NeuraDropoutMask::sample(3, 1.0, &mut rng).is_err());
        assert!(NeuraDropoutMask::sample(3, -0.1, &mut rng).is_err());
        assert!(NeuraDropoutMask::sample(3, f64::NAN, &mut rng).is_err());
    }
}
