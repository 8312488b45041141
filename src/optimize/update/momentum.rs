use nalgebra::DMatrix;

use super::{check_errors_shape, zeros_like, NeuraSupportMap, NeuraUpdateMethod};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
};

/// Classic momentum: `v = μ * v + learning_rate * g`, `W -= v`.
#[derive(Clone, Debug)]
pub struct NeuraMomentum {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: NeuraSupportMap<DMatrix<f64>>,
}

impl NeuraMomentum {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: NeuraSupportMap::default(),
        }
    }

    pub fn support_structure(&mut self, array: &NeuraParamsArray) -> &mut DMatrix<f64> {
        self.velocity.get_or_insert_with(array, || zeros_like(array))
    }
}

impl Default for NeuraMomentum {
    fn default() -> Self {
        Self::new(0.01, 0.9)
    }
}

impl NeuraUpdateMethod for NeuraMomentum {
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()> {
        check_errors_shape(array, errors)?;

        let (learning_rate, momentum) = (self.learning_rate, self.momentum);
        let velocity = self.velocity.get_or_insert_with(array, || zeros_like(array));

        errors.for_each_entry(|row, column, gradient| {
            if gradient == 0.0 {
                return;
            }

            let velocity = &mut velocity[(row, column)];
            *velocity = momentum * *velocity + learning_rate * gradient;
            array.values[(row, column)] -= *velocity;
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;
    use crate::optimize::update::fixtures;

    #[test]
    fn test_momentum_accumulates() {
        let mut array = fixtures::array();
        let mut method = NeuraMomentum::new(0.1, 0.5);
        let errors = fixtures::sparse_errors();

        method.update(&mut array, &errors).unwrap();
        fixtures::assert_values(&array, dvector![0.4, 0.33, 0.5, 1.0, 0.77], 1e-12);

        // v = 0.5 * 0.07 + 0.07, v = 0.5 * 0.03 + 0.03
        method.update(&mut array, &errors).unwrap();
        fixtures::assert_values(&array, dvector![0.4, 0.225, 0.5, 1.0, 0.725], 1e-12);

        approx::assert_relative_eq!(
            method.support_structure(&array).clone(),
            dmatrix![0.0; 0.105; 0.0; 0.0; 0.045],
            epsilon = 1e-12
        );
    }
}
