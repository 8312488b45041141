//! Update methods: how a parameters array moves along its averaged gradient.
//!
//! Adaptive methods keep a support structure per parameters array, keyed by the
//! [`NeuraParamsId`] of the array and created on its first update. Only the entries with a
//! non-zero gradient are touched, both in the array and in its support structure.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray, NeuraParamsId},
    err::{NeuraErr, NeuraResult},
};

mod adagrad;
pub use adagrad::NeuraAdaGrad;

mod adam;
pub use adam::{NeuraAdam, NeuraAdamSupport};

mod learning_rate;
pub use learning_rate::{NeuraDecay, NeuraExponentialDecay, NeuraHyperbolicDecay, NeuraLearningRate};

mod momentum;
pub use momentum::NeuraMomentum;

mod nesterov;
pub use nesterov::NeuraNesterovMomentum;

pub trait NeuraUpdateMethod {
    /// Moves `array` along `errors`, which must have the same shape.
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()>;

    /// Called once before each epoch but the first.
    fn new_epoch(&mut self) {}

    /// Called once before each batch update.
    fn new_batch(&mut self) {}
}

/// The support structures of an update method, one per parameters array.
#[derive(Clone, Debug)]
pub struct NeuraSupportMap<S> {
    structures: HashMap<NeuraParamsId, S>,
}

impl<S> Default for NeuraSupportMap<S> {
    fn default() -> Self {
        Self {
            structures: HashMap::new(),
        }
    }
}

impl<S> NeuraSupportMap<S> {
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn get(&self, array: &NeuraParamsArray) -> Option<&S> {
        self.structures.get(&array.id())
    }

    /// The structure of `array`, built by `init` on first access.
    pub fn get_or_insert_with(&mut self, array: &NeuraParamsArray, init: impl FnOnce() -> S) -> &mut S {
        self.structures.entry(array.id()).or_insert_with(init)
    }
}

pub(crate) fn check_errors_shape(
    array: &NeuraParamsArray,
    errors: &NeuraErrorsArray,
) -> NeuraResult<()> {
    if array.shape() != errors.shape() {
        return Err(NeuraErr::mismatch(
            "errors of a parameters array",
            array.shape(),
            errors.shape(),
        ));
    }

    Ok(())
}

pub(crate) fn zeros_like(array: &NeuraParamsArray) -> DMatrix<f64> {
    let (rows, columns) = array.shape();
    DMatrix::zeros(rows, columns)
}
