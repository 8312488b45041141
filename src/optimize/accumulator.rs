use std::borrow::Cow;

use crate::{
    algebra::NeuraVectorSpace,
    err::NeuraResult,
    network::NeuraNetworkErrors,
};

/// Sums the params errors of the examples of a batch.
///
/// While `count` is zero the stored errors are stale and never read.
#[derive(Clone, Debug)]
pub struct NeuraParamsErrorsAccumulator {
    errors: NeuraNetworkErrors,
    count: usize,
}

impl NeuraParamsErrorsAccumulator {
    /// `template` gives the architecture of the errors that can be accumulated.
    pub fn new(template: NeuraNetworkErrors) -> Self {
        Self {
            errors: template,
            count: 0,
        }
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn accumulate(&mut self, errors: &NeuraNetworkErrors) -> NeuraResult<()> {
        self.errors.check_compatible(errors)?;

        if self.count == 0 {
            self.errors = errors.clone();
        } else {
            self.errors.add_assign(errors)?;
        }
        self.count += 1;

        Ok(())
    }

    /// Divides the sum by the number of accumulated errors; the count is kept.
    pub fn average_errors(&mut self) {
        if self.count != 0 {
            self.errors.mul_assign(1.0 / self.count as f64);
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// The accumulated errors, or zeros when nothing was accumulated.
    pub fn get_params_errors(&self, copy: bool) -> Cow<'_, NeuraNetworkErrors> {
        if self.count == 0 {
            let mut zeros = self.errors.clone();
            zeros.set_zero();
            Cow::Owned(zeros)
        } else if copy {
            Cow::Owned(self.errors.clone())
        } else {
            Cow::Borrowed(&self.errors)
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dmatrix;

    use super::*;
    use crate::{
        algebra::NeuraErrorsArray,
        layer::{NeuraLayerConfig, NeuraLayerKind},
        network::NeuraNetwork,
    };

    fn network() -> NeuraNetwork {
        NeuraNetwork::new(vec![
            NeuraLayerConfig::input(2),
            NeuraLayerConfig::new(2, NeuraLayerKind::Feedforward),
        ])
        .unwrap()
    }

    fn errors(network: &NeuraNetwork, scale: f64) -> NeuraNetworkErrors {
        let mut errors = network.params_errors_factory();
        let params = errors.layers[0].feedforward_mut().unwrap();
        params.weights = NeuraErrorsArray::Dense(dmatrix![1.0, -2.0; 0.5, 0.25] * scale);
        params.biases = NeuraErrorsArray::Dense(dmatrix![0.1; -0.3] * scale);
        errors
    }

    fn weights(errors: &NeuraNetworkErrors) -> nalgebra::DMatrix<f64> {
        errors.layers[0].feedforward().unwrap().weights.to_dense()
    }

    #[test]
    fn test_accumulate_and_average() {
        let network = network();
        let mut accumulator = NeuraParamsErrorsAccumulator::new(network.params_errors_factory());

        accumulator.accumulate(&errors(&network, 1.0)).unwrap();
        accumulator.accumulate(&errors(&network, 3.0)).unwrap();
        assert_eq!(accumulator.count(), 2);

        accumulator.average_errors();
        assert_eq!(accumulator.count(), 2);
        approx::assert_relative_eq!(
            weights(&accumulator.get_params_errors(false)),
            dmatrix![2.0, -4.0; 1.0, 0.5]
        );
    }

    #[test]
    fn test_accumulate_twice_is_idempotent() {
        let network = network();
        let gradients = errors(&network, 1.0);

        let mut twice = NeuraParamsErrorsAccumulator::new(network.params_errors_factory());
        twice.accumulate(&gradients).unwrap();
        twice.accumulate(&gradients).unwrap();
        twice.average_errors();

        let mut once = NeuraParamsErrorsAccumulator::new(network.params_errors_factory());
        once.accumulate(&gradients).unwrap();

        assert_eq!(
            weights(&twice.get_params_errors(false)),
            weights(&once.get_params_errors(false))
        );
    }

    #[test]
    fn test_reset_reads_zeros() {
        let network = network();
        let mut accumulator = NeuraParamsErrorsAccumulator::new(network.params_errors_factory());

        accumulator.accumulate(&errors(&network, 1.0)).unwrap();
        accumulator.reset();

        assert!(accumulator.is_empty());
        assert_eq!(
            weights(&accumulator.get_params_errors(false)),
            nalgebra::DMatrix::zeros(2, 2)
        );

        // the stale sum is not carried over
        accumulator.accumulate(&errors(&network, 2.0)).unwrap();
        assert_eq!(
            weights(&accumulator.get_params_errors(true)),
            dmatrix![2.0, -4.0; 1.0, 0.5]
        );
    }

    #[test]
    fn test_incompatible_errors() {
        let network = network();
        let other = NeuraNetwork::new(vec![
            NeuraLayerConfig::input(2),
            NeuraLayerConfig::new(2, NeuraLayerKind::Ran),
        ])
        .unwrap();

        let mut accumulator = NeuraParamsErrorsAccumulator::new(network.params_errors_factory());
        assert!(accumulator
            .accumulate(&other.params_errors_factory())
            .is_err());
        assert_eq!(accumulator.count(), 0);
    }
}
