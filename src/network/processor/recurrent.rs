use std::borrow::Cow;

use nalgebra::DVector;
use rand::{rngs::StdRng, SeedableRng};

use super::{cow, cow_slice};
use crate::{
    algebra::{NeuraInput, NeuraRelevance, NeuraVectorSpace},
    err::{NeuraErr, NeuraResult},
    layer::{relevance::normalize_l1, NeuraContextWindow, NeuraLayerStructure},
    network::{NeuraNetwork, NeuraNetworkErrors},
};

/// Runs a network over sequences, with back-propagation through time.
///
/// The structures are stored layer-major: `steps[layer][t]`. Each pass hands a layer structure
/// a [`NeuraContextWindow`] over the structures of the same layer at the other steps.
#[derive(Debug)]
pub struct NeuraRecurrentProcessor<'a> {
    network: &'a NeuraNetwork,
    steps: Vec<Vec<NeuraLayerStructure>>,
    params_errors: NeuraNetworkErrors,
    step_errors: NeuraNetworkErrors,
    input_errors: Vec<DVector<f64>>,
    input_relevance: Vec<NeuraRelevance>,
    rng: StdRng,
}

impl<'a> NeuraRecurrentProcessor<'a> {
    pub fn new(network: &'a NeuraNetwork) -> Self {
        Self::with_rng(network, StdRng::from_entropy())
    }

    /// Same as [`Self::new`], with the dropout masks drawn from a seeded generator.
    pub fn seeded(network: &'a NeuraNetwork, seed: u64) -> Self {
        Self::with_rng(network, StdRng::seed_from_u64(seed))
    }

    fn with_rng(network: &'a NeuraNetwork, rng: StdRng) -> Self {
        Self {
            network,
            steps: Vec::new(),
            params_errors: network.params_errors_factory(),
            step_errors: network.params_errors_factory(),
            input_errors: Vec::new(),
            input_relevance: Vec::new(),
            rng,
        }
    }

    #[inline(always)]
    pub fn network(&self) -> &'a NeuraNetwork {
        self.network
    }

    /// The length of the last forwarded sequence.
    pub fn sequence_length(&self) -> usize {
        self.steps.first().map_or(0, Vec::len)
    }

    /// Runs every layer on `sequence`, from the first to the last step, and returns the output
    /// of the last step.
    ///
    /// With `use_dropout`, a new dropout mask is drawn for every step of the layers configured
    /// with a dropout; it should only be set while training.
    pub fn forward(
        &mut self,
        sequence: &[NeuraInput],
        use_dropout: bool,
    ) -> NeuraResult<&DVector<f64>> {
        if sequence.is_empty() {
            return Err(NeuraErr::InvalidOperation("cannot forward an empty sequence"));
        }
        if !sequence
            .iter()
            .all(|input| self.network.input_type().matches(input))
        {
            return Err(NeuraErr::InvalidOperation(
                "the input does not match the input type of the network",
            ));
        }

        log::trace!("Forwarding a sequence of {} steps", sequence.len());

        self.steps = (0..self.network.depth())
            .map(|index| {
                (0..sequence.len())
                    .map(|_| self.network.build_structure(index))
                    .collect()
            })
            .collect();
        self.input_errors.clear();
        self.input_relevance.clear();

        for (t, input) in sequence.iter().enumerate() {
            let mut input = input.clone();

            for index in 0..self.steps.len() {
                let dropout = if use_dropout {
                    self.network.sample_dropout(index, &mut self.rng)?
                } else {
                    None
                };
                let (current, context) = NeuraContextWindow::split(&mut self.steps[index][..=t], t)?;

                current.forward_with_dropout(
                    input,
                    dropout,
                    &self.network.model.layers[index],
                    &context,
                )?;
                input = NeuraInput::Dense(current.output().values.clone());
            }
        }

        self.get_last().map(|layer| &layer.output().values)
    }

    /// Propagates the errors of the output at every step, from the last step to the first.
    ///
    /// The params errors are the sum of the errors of every step. The errors of the inputs are
    /// only computed when `propagate_to_input` is set.
    pub fn backward(
        &mut self,
        outputs_errors: &[DVector<f64>],
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let length = self.sequence_length();
        if length == 0 {
            return Err(NeuraErr::InvalidOperation("no forward pass was run"));
        }
        if outputs_errors.len() != length {
            return Err(NeuraErr::mismatch(
                "output errors of the sequence",
                (length, 1),
                (outputs_errors.len(), 1),
            ));
        }

        self.params_errors.set_zero();
        let mut input_errors = Vec::with_capacity(length);

        for t in (0..length).rev() {
            let mut errors = outputs_errors[t].clone();

            for index in (0..self.steps.len()).rev() {
                let propagate = index > 0 || propagate_to_input;
                let (current, context) = NeuraContextWindow::split(&mut self.steps[index], t)?;

                current.set_output_errors(&errors)?;
                current.backward(
                    &self.network.model.layers[index],
                    &mut self.step_errors.layers[index],
                    &context,
                    propagate,
                )?;
                self.params_errors.layers[index].add_assign(&self.step_errors.layers[index])?;

                if propagate {
                    errors = current
                        .input_errors()
                        .cloned()
                        .ok_or(NeuraErr::InvalidOperation("missing errors of a hidden layer"))?;
                }
            }

            if propagate_to_input {
                input_errors.push(errors);
            }
        }

        input_errors.reverse();
        self.input_errors = input_errors;

        Ok(())
    }

    /// Decomposes the L1-normalized `relevant_outcomes` of the last output onto the inputs of
    /// every step.
    ///
    /// The relevance of a layer output at step `t` is the input relevance of the layer above at
    /// `t` plus the relevance of the previous output of the same layer at `t + 1`.
    pub fn calculate_relevance(&mut self, relevant_outcomes: &DVector<f64>) -> NeuraResult<()> {
        let length = self.sequence_length();
        if length == 0 {
            return Err(NeuraErr::InvalidOperation("no forward pass was run"));
        }

        let output_size = self.network.output_size();
        let mut outputs_relevance = vec![DVector::zeros(output_size); length];
        outputs_relevance[length - 1] = normalize_l1(relevant_outcomes);

        let mut input_relevance = Vec::with_capacity(length);

        for index in (0..self.steps.len()).rev() {
            let layer_params = &self.network.model.layers[index];
            let mut prev_relevance: Option<DVector<f64>> = None;
            let mut inputs_relevance = vec![DVector::zeros(0); length];

            for t in (0..length).rev() {
                let mut relevance = outputs_relevance[t].clone();
                if let Some(prev_relevance) = prev_relevance.take() {
                    relevance += prev_relevance;
                }

                let (current, context) = NeuraContextWindow::around(&self.steps[index], t)?;
                let layer_relevance = current.relevance(layer_params, &context, &relevance)?;
                prev_relevance = layer_relevance.prev_output;

                if index > 0 {
                    inputs_relevance[t] = layer_relevance.input.to_dense();
                } else {
                    input_relevance.push(layer_relevance.input);
                }
            }

            outputs_relevance = inputs_relevance;
        }

        input_relevance.reverse();
        self.input_relevance = input_relevance;

        Ok(())
    }

    /// The output of the last step.
    pub fn get_output(&self, copy: bool) -> NeuraResult<Cow<'_, DVector<f64>>> {
        Ok(cow(&self.get_last()?.output().values, copy))
    }

    /// The outputs of every step.
    pub fn get_outputs(&self) -> Vec<DVector<f64>> {
        self.steps
            .last()
            .map(|layer| {
                layer
                    .iter()
                    .map(|structure| structure.output().values.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The errors of the parameters, summed over the steps of the last backward.
    pub fn get_params_errors(&self, copy: bool) -> Cow<'_, NeuraNetworkErrors> {
        cow(&self.params_errors, copy)
    }

    /// The errors of the input of every step.
    pub fn get_input_errors(&self, copy: bool) -> NeuraResult<Cow<'_, [DVector<f64>]>> {
        if self.network.sparse_input() {
            return Err(NeuraErr::InvalidOperation(
                "input errors are not defined for sparse inputs",
            ));
        }
        if self.input_errors.is_empty() {
            return Err(NeuraErr::InvalidOperation(
                "the input errors were not propagated",
            ));
        }

        Ok(cow_slice(&self.input_errors, copy))
    }

    /// The relevance of the input of every step.
    pub fn get_input_relevance(&self, copy: bool) -> NeuraResult<Cow<'_, [NeuraRelevance]>> {
        if self.input_relevance.is_empty() {
            return Err(NeuraErr::InvalidOperation("no relevance was calculated"));
        }

        Ok(cow_slice(&self.input_relevance, copy))
    }

    fn get_last(&self) -> NeuraResult<&NeuraLayerStructure> {
        self.steps
            .last()
            .and_then(|layer| layer.last())
            .ok_or(NeuraErr::InvalidOperation("no forward pass was run"))
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;

    use super::*;
    use crate::{
        derivable::activation::Tanh,
        layer::{NeuraLayerConfig, NeuraLayerKind},
        network::processor::NeuraFeedforwardProcessor,
        random::NeuraFixedRangeRandom,
    };

    fn network(kind: NeuraLayerKind) -> NeuraNetwork {
        let mut network = NeuraNetwork::new(vec![
            NeuraLayerConfig::input(3),
            NeuraLayerConfig::new(4, kind).activation(Tanh),
            NeuraLayerConfig::new(2, NeuraLayerKind::Feedforward).activation(Tanh),
        ])
        .unwrap();
        network
            .initialize(&mut NeuraFixedRangeRandom::seeded(0.6, 7), 0.05)
            .unwrap();
        network
    }

    fn sequence() -> Vec<NeuraInput> {
        vec![
            dvector![0.5, -0.2, 0.1].into(),
            dvector![-0.7, 0.4, 0.9].into(),
            dvector![0.3, 0.3, -0.6].into(),
        ]
    }

    #[test]
    fn test_single_step_matches_feedforward() {
        let network = network(NeuraLayerKind::Gru);
        let input: NeuraInput = dvector![0.5, -0.2, 0.1].into();

        let mut recurrent = NeuraRecurrentProcessor::new(&network);
        let mut feedforward = NeuraFeedforwardProcessor::new(&network);

        let recurrent_output = recurrent.forward(&[input.clone()], false).unwrap().clone();
        let feedforward_output = feedforward.forward(input, false).unwrap().clone();

        approx::assert_relative_eq!(recurrent_output, feedforward_output);
    }

    #[test]
    fn test_sequence_passes() {
        for kind in [
            NeuraLayerKind::SimpleRecurrent,
            NeuraLayerKind::Cfn,
            NeuraLayerKind::Gru,
            NeuraLayerKind::Ran,
        ] {
            let network = network(kind);
            let mut processor = NeuraRecurrentProcessor::new(&network);

            processor.forward(&sequence(), false).unwrap();
            assert_eq!(processor.sequence_length(), 3);
            assert_eq!(processor.get_outputs().len(), 3);

            assert!(processor.backward(&[dvector![0.1, 0.2]], false).is_err());

            let errors = vec![dvector![0.0, 0.0], dvector![0.0, 0.0], dvector![0.4, -0.3]];
            processor.backward(&errors, true).unwrap();

            let input_errors = processor.get_input_errors(false).unwrap();
            assert_eq!(input_errors.len(), 3);
            // the last output depends on the first input through the recurrence
            assert!(input_errors[0].iter().any(|&value| value != 0.0));

            processor.calculate_relevance(&dvector![1.0, 0.0]).unwrap();
            let relevance = processor.get_input_relevance(true).unwrap();
            assert_eq!(relevance.len(), 3);
            assert!(relevance
                .iter()
                .all(|relevance| relevance.to_dense().iter().all(|value| value.is_finite())));
        }
    }

    #[test]
    fn test_dropout_at_every_step() {
        let mut network = NeuraNetwork::new(vec![
            NeuraLayerConfig::input(3),
            NeuraLayerConfig::new(4, NeuraLayerKind::Cfn)
                .activation(Tanh)
                .dropout(0.4),
            NeuraLayerConfig::new(2, NeuraLayerKind::Feedforward).activation(Tanh),
        ])
        .unwrap();
        network
            .initialize(&mut NeuraFixedRangeRandom::seeded(0.6, 7), 0.05)
            .unwrap();
        let mut processor = NeuraRecurrentProcessor::seeded(&network, 5);

        processor.forward(&sequence(), true).unwrap();
        let errors = vec![dvector![0.1, 0.0], dvector![0.0, -0.2], dvector![0.4, -0.3]];
        processor.backward(&errors, true).unwrap();

        let input_errors = processor.get_input_errors(false).unwrap();
        for (t, step) in processor.steps[0].iter().enumerate() {
            let mask = step.input().dropout.as_ref().unwrap();
            for index in 0..3 {
                if mask.is_dropped(index) {
                    assert_eq!(step.input().values.to_dense()[index], 0.0);
                    assert_eq!(input_errors[t][index], 0.0);
                }
            }
        }
        assert!(processor.steps[1]
            .iter()
            .all(|step| step.input().dropout.is_none()));

        processor.forward(&sequence(), false).unwrap();
        assert!(processor.steps[0]
            .iter()
            .all(|step| step.input().dropout.is_none()));
    }

    #[test]
    fn test_empty_sequence() {
        let network = network(NeuraLayerKind::Ran);
        let mut processor = NeuraRecurrentProcessor::new(&network);

        assert!(processor.forward(&[], false).is_err());
        assert!(processor.get_output(false).is_err());
        assert!(processor.calculate_relevance(&dvector![1.0, 0.0]).is_err());
    }
}
