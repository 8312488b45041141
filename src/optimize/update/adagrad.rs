use nalgebra::DMatrix;

use super::{check_errors_shape, zeros_like, NeuraSupportMap, NeuraUpdateMethod};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
};

/// AdaGrad: every entry is scaled by the inverse root of the sum of its squared gradients.
///
/// ```text
/// m += g²
/// W -= learning_rate * g / (√m + ε)
/// ```
#[derive(Clone, Debug)]
pub struct NeuraAdaGrad {
    pub learning_rate: f64,
    pub epsilon: f64,
    second_moments: NeuraSupportMap<DMatrix<f64>>,
}

impl NeuraAdaGrad {
    pub fn new(learning_rate: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            epsilon,
            second_moments: NeuraSupportMap::default(),
        }
    }

    /// The sums of squared gradients of `array`, zero-filled on first access.
    pub fn support_structure(&mut self, array: &NeuraParamsArray) -> &mut DMatrix<f64> {
        self.second_moments
            .get_or_insert_with(array, || zeros_like(array))
    }
}

impl Default for NeuraAdaGrad {
    fn default() -> Self {
        Self::new(0.01, 1e-8)
    }
}

impl NeuraUpdateMethod for NeuraAdaGrad {
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()> {
        check_errors_shape(array, errors)?;

        let (learning_rate, epsilon) = (self.learning_rate, self.epsilon);
        let moments = self
            .second_moments
            .get_or_insert_with(array, || zeros_like(array));

        errors.for_each_entry(|row, column, gradient| {
            if gradient == 0.0 {
                return;
            }

            let moment = &mut moments[(row, column)];
            *moment += gradient * gradient;
            array.values[(row, column)] -= learning_rate * gradient / (moment.sqrt() + epsilon);
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;
    use crate::optimize::update::fixtures;

    fn method(array: &NeuraParamsArray) -> NeuraAdaGrad {
        let mut method = NeuraAdaGrad::new(0.001, 1e-8);
        *method.support_structure(array) = dmatrix![1.0; 0.4; 0.7; 0.0; 0.2];
        method
    }

    #[test]
    fn test_dense_update() {
        let mut array = fixtures::array();
        let mut method = method(&array);

        method.update(&mut array, &fixtures::dense_errors()).unwrap();

        fixtures::assert_values(&array, dvector![0.39933, 0.39926, 0.49957, 0.999, 0.79978], 1e-5);
    }

    #[test]
    fn test_sparse_update() {
        let mut array = fixtures::array();
        let mut method = method(&array);

        method.update(&mut array, &fixtures::sparse_errors()).unwrap();

        fixtures::assert_values(&array, dvector![0.4, 0.399258, 0.5, 1.0, 0.799443], 1e-6);
        // untouched entries keep their moments
        approx::assert_relative_eq!(
            method.support_structure(&array).clone(),
            dmatrix![1.0; 0.89; 0.7; 0.0; 0.29],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_gradient() {
        let mut array = fixtures::array();
        let mut method = method(&array);

        method
            .update(&mut array, &NeuraErrorsArray::zeros(5, 1, false))
            .unwrap();

        fixtures::assert_values(&array, fixtures::array().as_vector(), 0.0);
        assert_eq!(
            method.support_structure(&array).clone(),
            dmatrix![1.0; 0.4; 0.7; 0.0; 0.2]
        );
    }
}
