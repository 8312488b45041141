use std::fmt::Debug;

use dyn_clone::DynClone;

use super::{check_errors_shape, NeuraUpdateMethod};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
};

/// A schedule of the learning rate over the epochs.
pub trait NeuraDecay: DynClone + Debug {
    fn learning_rate(&self, initial: f64, epoch: usize) -> f64;
}

dyn_clone::clone_trait_object!(NeuraDecay);

/// `initial / (1 + rate * epoch)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeuraHyperbolicDecay {
    pub rate: f64,
}

impl NeuraDecay for NeuraHyperbolicDecay {
    fn learning_rate(&self, initial: f64, epoch: usize) -> f64 {
        initial / (1.0 + self.rate * epoch as f64)
    }
}

/// `initial * exp(-rate * epoch)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeuraExponentialDecay {
    pub rate: f64,
}

impl NeuraDecay for NeuraExponentialDecay {
    fn learning_rate(&self, initial: f64, epoch: usize) -> f64 {
        initial * (-self.rate * epoch as f64).exp()
    }
}

/// Plain gradient descent: `W -= learning_rate * gradient`.
#[derive(Clone, Debug)]
pub struct NeuraLearningRate {
    initial_learning_rate: f64,
    learning_rate: f64,
    epoch: usize,
    decay: Option<Box<dyn NeuraDecay>>,
}

impl NeuraLearningRate {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            initial_learning_rate: learning_rate,
            learning_rate,
            epoch: 0,
            decay: None,
        }
    }

    pub fn decay(mut self, decay: impl NeuraDecay + 'static) -> Self {
        self.decay = Some(Box::new(decay));
        self
    }

    #[inline(always)]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl Default for NeuraLearningRate {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl NeuraUpdateMethod for NeuraLearningRate {
    fn update(&mut self, array: &mut NeuraParamsArray, errors: &NeuraErrorsArray) -> NeuraResult<()> {
        check_errors_shape(array, errors)?;

        let learning_rate = self.learning_rate;
        errors.for_each_entry(|row, column, gradient| {
            if gradient != 0.0 {
                array.values[(row, column)] -= learning_rate * gradient;
            }
        });

        Ok(())
    }

    fn new_epoch(&mut self) {
        self.epoch += 1;

        if let Some(decay) = &self.decay {
            self.learning_rate = decay.learning_rate(self.initial_learning_rate, self.epoch);
            log::debug!(
                "Learning rate decayed to {} at epoch {}",
                self.learning_rate,
                self.epoch
            );
        }
    }
}
