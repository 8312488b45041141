use nalgebra::DMatrix;

use super::{check_errors_shape, zeros_like, NeuraSupportMap, NeuraUpdateMethod};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
};

/// The moving averages of the gradient of an array and of its square.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraAdamSupport {
    pub first_moments: DMatrix<f64>,
    pub second_moments: DMatrix<f64>,
}

/// Adam, with the bias correction folded into the step size.
///
/// ```text
/// m = β1 * m + (1 - β1) * g
/// v = β2 * v + (1 - β2) * g²
/// α = learning_rate * √(1 - β2ᵗ) / (1 - β1ᵗ)
/// W -= α * m / (√v + ε)
/// ```
///
/// The timestep `t` counts the calls to [`NeuraUpdateMethod::new_batch`].
#[derive(Clone, Debug)]
pub struct NeuraAdam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    timestep: i32,
    support: NeuraSupportMap<NeuraAdamSupport>,
}

impl NeuraAdam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            timestep: 0,
            support: NeuraSupportMap::default(),
        }
    }

    pub fn support_structure(&mut self, array: &NeuraParamsArray) -> &mut NeuraAdamSupport {
        self.support.get_or_insert_with(array, || NeuraAdamSupport {
            first_moments: zeros_like(array),
            second_moments: zeros_like(array),
        })
    }

    #[inline(always)]
    pub fn timestep(&self) -> i32 {
        self.timestep
    }

    fn step_size(&self) -> f64 {
        let t = self.timestep.max(1);
        self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t))
    }
}

impl Default for NeuraAdam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-8)
    }
}

impl NeuraUpdateMethod for NeuraAdam {
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()> {
        check_errors_shape(array, errors)?;

        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let step_size = self.step_size();
        let support = self.support_structure(array);

        errors.for_each_entry(|row, column, gradient| {
            if gradient == 0.0 {
                return;
            }

            let m = &mut support.first_moments[(row, column)];
            *m = beta1 * *m + (1.0 - beta1) * gradient;
            let m = *m;

            let v = &mut support.second_moments[(row, column)];
            *v = beta2 * *v + (1.0 - beta2) * gradient * gradient;

            array.values[(row, column)] -= step_size * m / (v.sqrt() + epsilon);
        });

        Ok(())
    }

    fn new_batch(&mut self) {
        self.timestep += 1;
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;

    use super::*;
    use crate::optimize::update::fixtures;

    #[test]
    fn test_first_step() {
        let mut array = fixtures::array();
        let mut method = NeuraAdam::new(0.01, 0.9, 0.999, 1e-8);

        method.new_batch();
        method.update(&mut array, &fixtures::sparse_errors()).unwrap();

        // at t = 1 the corrected step is `learning_rate * sign(g)`
        fixtures::assert_values(&array, dvector![0.4, 0.39, 0.5, 1.0, 0.79], 1e-7);
        assert_eq!(method.timestep(), 1);
    }

    #[test]
    fn test_zero_gradient() {
        let mut array = fixtures::array();
        let mut method = NeuraAdam::default();

        method.new_batch();
        method
            .update(&mut array, &NeuraErrorsArray::zeros(5, 1, false))
            .unwrap();

        fixtures::assert_values(&array, fixtures::array().as_vector(), 0.0);
    }
}
