use nalgebra::DVector;

use super::NeuraLoss;
use crate::err::{NeuraErr, NeuraResult};

/// Half of the squared euclidean distance between the target and the output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Euclidean;

impl Euclidean {
    fn check_shape(target: &DVector<f64>, actual: &DVector<f64>) -> NeuraResult<()> {
        if target.shape() != actual.shape() {
            return Err(NeuraErr::mismatch("loss target", actual.shape(), target.shape()));
        }

        Ok(())
    }
}

impl NeuraLoss for Euclidean {
    type Input = DVector<f64>;
    type Target = DVector<f64>;

    #[inline]
    fn eval(&self, target: &DVector<f64>, actual: &DVector<f64>) -> NeuraResult<f64> {
        Self::check_shape(target, actual)?;

        Ok((target - actual).norm_squared() * 0.5)
    }

    #[inline]
    fn nabla(&self, target: &DVector<f64>, actual: &DVector<f64>) -> NeuraResult<DVector<f64>> {
        Self::check_shape(target, actual)?;

        // ∂E(y)/∂yᵢ = yᵢ - yᵢ'
        Ok(actual - target)
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;

    use super::*;
    use crate::assert_approx;

    #[test]
    fn test_euclidean() {
        let target = dvector![1.0, 0.0, -1.0];
        let actual = dvector![0.5, 0.5, -1.0];

        assert_approx!(0.25, Euclidean.eval(&target, &actual).unwrap(), 1e-12);
        assert_eq!(
            Euclidean.nabla(&target, &actual).unwrap(),
            dvector![-0.5, 0.5, 0.0]
        );
    }

    #[test]
    fn test_euclidean_length_mismatch() {
        let target = dvector![1.0, 0.0];
        let actual = dvector![0.5, 0.5, -1.0];

        assert_eq!(
            Euclidean.eval(&target, &actual),
            Err(NeuraErr::mismatch("loss target", (3, 1), (2, 1)))
        );
        assert!(Euclidean.nabla(&target, &actual).is_err());
    }
}
