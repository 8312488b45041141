use nalgebra::DVector;

use crate::{
    algebra::NeuraInput,
    derivable::NeuraLoss,
    err::{NeuraErr, NeuraResult},
    network::{
        processor::{NeuraFeedforwardProcessor, NeuraRecurrentProcessor},
        NeuraNetwork,
    },
    optimize::{update::NeuraUpdateMethod, NeuraParamsOptimizer},
};

/// Mini-batch training: the params errors of `batch_size` examples are averaged, then the
/// optimizer updates the network once.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct NeuraBatchedTrainer {
    /// How many examples to accumulate before each update
    pub batch_size: usize,

    /// How many times the examples are iterated over
    pub epochs: usize,

    /// The trainer logs the training loss at every multiple of `log_epochs` epochs.
    /// If `log_epochs` is zero, then no progress will be logged.
    ///
    /// Defaults to `1`
    pub log_epochs: usize,
}

impl Default for NeuraBatchedTrainer {
    fn default() -> Self {
        Self {
            batch_size: 10,
            epochs: 10,
            log_epochs: 1,
        }
    }
}

impl NeuraBatchedTrainer {
    pub fn new(batch_size: usize, epochs: usize) -> Self {
        Self {
            batch_size,
            epochs,
            ..Default::default()
        }
    }

    /// Trains `network` on single-step examples and returns the average loss of every epoch,
    /// measured during the epoch.
    pub fn train_feedforward<M, Loss>(
        &self,
        network: &mut NeuraNetwork,
        optimizer: &mut NeuraParamsOptimizer<M>,
        loss: &Loss,
        examples: &[(NeuraInput, DVector<f64>)],
    ) -> NeuraResult<Vec<f64>>
    where
        M: NeuraUpdateMethod,
        Loss: NeuraLoss<Input = DVector<f64>, Target = DVector<f64>>,
    {
        self.train(network, optimizer, examples, |network, optimizer, batch| {
            let mut processor = NeuraFeedforwardProcessor::new(network);
            let mut batch_loss = 0.0;

            for (input, target) in batch {
                let output = processor.forward(input.clone(), true)?.clone();
                batch_loss += loss.eval(target, &output)?;

                processor.backward(&loss.nabla(target, &output)?, false)?;
                optimizer.accumulate(&processor.get_params_errors(false))?;
            }

            Ok(batch_loss)
        })
    }

    /// Trains `network` on sequences whose target is the output of their last step.
    /// The outputs of the other steps receive no errors.
    pub fn train_sequences<M, Loss>(
        &self,
        network: &mut NeuraNetwork,
        optimizer: &mut NeuraParamsOptimizer<M>,
        loss: &Loss,
        examples: &[(Vec<NeuraInput>, DVector<f64>)],
    ) -> NeuraResult<Vec<f64>>
    where
        M: NeuraUpdateMethod,
        Loss: NeuraLoss<Input = DVector<f64>, Target = DVector<f64>>,
    {
        self.train(network, optimizer, examples, |network, optimizer, batch| {
            let mut processor = NeuraRecurrentProcessor::new(network);
            let mut batch_loss = 0.0;

            for (sequence, target) in batch {
                let output = processor.forward(sequence, true)?.clone();
                batch_loss += loss.eval(target, &output)?;

                let mut errors = vec![DVector::zeros(output.len()); sequence.len()];
                errors[sequence.len() - 1] = loss.nabla(target, &output)?;

                processor.backward(&errors, false)?;
                optimizer.accumulate(&processor.get_params_errors(false))?;
            }

            Ok(batch_loss)
        })
    }

    /// Runs the epochs; `run_batch` accumulates the errors of a batch into the optimizer and
    /// returns its summed loss.
    fn train<M, Example>(
        &self,
        network: &mut NeuraNetwork,
        optimizer: &mut NeuraParamsOptimizer<M>,
        examples: &[Example],
        mut run_batch: impl FnMut(
            &NeuraNetwork,
            &mut NeuraParamsOptimizer<M>,
            &[Example],
        ) -> NeuraResult<f64>,
    ) -> NeuraResult<Vec<f64>>
    where
        M: NeuraUpdateMethod,
    {
        if self.batch_size == 0 {
            return Err(NeuraErr::InvalidOperation("the batch size cannot be zero"));
        }
        if examples.is_empty() {
            return Err(NeuraErr::InvalidOperation("no training examples"));
        }

        log::info!(
            "Training on {} examples, {} epochs, batches of {}",
            examples.len(),
            self.epochs,
            self.batch_size
        );

        let mut losses = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            if epoch > 0 {
                optimizer.new_epoch();
            }

            let mut epoch_loss = 0.0;
            for batch in examples.chunks(self.batch_size) {
                optimizer.new_batch();
                epoch_loss += run_batch(network, optimizer, batch)?;
                optimizer.update(&mut network.model)?;
            }

            let epoch_loss = epoch_loss / examples.len() as f64;
            if self.log_epochs > 0 && (epoch + 1) % self.log_epochs == 0 {
                log::info!("Epoch {}, training loss: {:.5}", epoch + 1, epoch_loss);
            }

            losses.push(epoch_loss);
        }

        Ok(losses)
    }
}
