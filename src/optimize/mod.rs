//! Gradient accumulation and parameter updates.

use crate::{
    algebra::NeuraParamsArray,
    err::NeuraResult,
    network::{NeuraNetwork, NeuraNetworkErrors, NeuraNetworkParams},
};

mod accumulator;
pub use accumulator::NeuraParamsErrorsAccumulator;

pub mod update;
use update::NeuraUpdateMethod;

/// Accumulates the params errors of a batch, then applies an update method to every
/// parameters array of the network with their average.
#[derive(Clone, Debug)]
pub struct NeuraParamsOptimizer<M: NeuraUpdateMethod> {
    method: M,
    accumulator: NeuraParamsErrorsAccumulator,
}

impl<M: NeuraUpdateMethod> NeuraParamsOptimizer<M> {
    pub fn new(network: &NeuraNetwork, method: M) -> Self {
        Self {
            method,
            accumulator: NeuraParamsErrorsAccumulator::new(network.params_errors_factory()),
        }
    }

    #[inline(always)]
    pub fn method(&self) -> &M {
        &self.method
    }

    #[inline(always)]
    pub fn method_mut(&mut self) -> &mut M {
        &mut self.method
    }

    #[inline(always)]
    pub fn accumulator(&self) -> &NeuraParamsErrorsAccumulator {
        &self.accumulator
    }

    pub fn accumulate(&mut self, errors: &NeuraNetworkErrors) -> NeuraResult<()> {
        self.accumulator.accumulate(errors)
    }

    /// Updates `params` with the average of the accumulated errors, then resets the accumulator.
    /// Does nothing if no errors were accumulated.
    pub fn update(&mut self, params: &mut NeuraNetworkParams<NeuraParamsArray>) -> NeuraResult<()> {
        if self.accumulator.is_empty() {
            log::trace!("No errors accumulated, skipping the update");
            return Ok(());
        }

        self.accumulator.average_errors();

        {
            let errors = self.accumulator.get_params_errors(false);
            params.check_compatible(&*errors)?;

            for (array, array_errors) in params.arrays_mut().into_iter().zip(errors.arrays()) {
                self.method.update(array, array_errors)?;
            }
        }

        log::trace!(
            "Updated the parameters with the average of {} errors",
            self.accumulator.count()
        );
        self.accumulator.reset();

        Ok(())
    }

    pub fn new_epoch(&mut self) {
        self.method.new_epoch();
    }

    pub fn new_batch(&mut self) {
        self.method.new_batch();
    }
}
