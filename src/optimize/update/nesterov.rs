use nalgebra::DMatrix;

use super::{check_errors_shape, zeros_like, NeuraSupportMap, NeuraUpdateMethod};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
};

/// Momentum with the Nesterov look-ahead correction.
///
/// ```text
/// v' = μ * v - learning_rate * g
/// W -= μ * v - (1 + μ) * v'
/// ```
#[derive(Clone, Debug)]
pub struct NeuraNesterovMomentum {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: NeuraSupportMap<DMatrix<f64>>,
}

impl NeuraNesterovMomentum {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: NeuraSupportMap::default(),
        }
    }

    /// The velocity of `array`, zero-filled on first access.
    pub fn support_structure(&mut self, array: &NeuraParamsArray) -> &mut DMatrix<f64> {
        self.velocity.get_or_insert_with(array, || zeros_like(array))
    }
}

impl Default for NeuraNesterovMomentum {
    fn default() -> Self {
        Self::new(0.01, 0.9)
    }
}

impl NeuraUpdateMethod for NeuraNesterovMomentum {
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()> {
        check_errors_shape(array, errors)?;

        let (learning_rate, momentum) = (self.learning_rate, self.momentum);
        let velocity = self.velocity.get_or_insert_with(array, || zeros_like(array));

        errors.for_each_entry(|row, column, gradient| {
            if gradient == 0.0 {
                return;
            }

            let prev_velocity = velocity[(row, column)];
            let new_velocity = momentum * prev_velocity - learning_rate * gradient;

            velocity[(row, column)] = new_velocity;
            array.values[(row, column)] -= momentum * prev_velocity - (1.0 + momentum) * new_velocity;
        });

        Ok(())
    }
}
