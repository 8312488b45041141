use std::borrow::Cow;

use nalgebra::DVector;
use rand::{rngs::StdRng, SeedableRng};

use super::cow;
use crate::{
    algebra::{NeuraInput, NeuraRelevance},
    err::{NeuraErr, NeuraResult},
    layer::{relevance::normalize_l1, NeuraContextWindow, NeuraLayerStructure},
    network::{NeuraNetwork, NeuraNetworkErrors},
};

/// Runs a network on single inputs, without any time step: recurrent layers behave as if every
/// input started a new sequence.
#[derive(Debug)]
pub struct NeuraFeedforwardProcessor<'a> {
    network: &'a NeuraNetwork,
    layers: Vec<NeuraLayerStructure>,
    params_errors: NeuraNetworkErrors,
    input_relevance: Option<NeuraRelevance>,
    rng: StdRng,
}

impl<'a> NeuraFeedforwardProcessor<'a> {
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
            layers: Vec::new(),
            params_errors: network.params_errors_factory(),
            input_relevance: None,
            rng,
        }
    }

    #[inline(always)]
    pub fn network(&self) -> &'a NeuraNetwork {
        self.network
    }

    /// Runs every layer on `input`, replacing the state of the previous pass.
    ///
    /// With `use_dropout`, the inputs of the layers configured with a dropout are dropped out;
    /// it should only be set while training.
    pub fn forward(&mut self, input: NeuraInput, use_dropout: bool) -> NeuraResult<&DVector<f64>> {
        if !self.network.input_type().matches(&input) {
            return Err(NeuraErr::InvalidOperation(
                "the input does not match the input type of the network",
            ));
        }

        self.layers = self.network.build_structures();
        self.input_relevance = None;

        let context = NeuraContextWindow::empty();
        let mut input = input;

        for (index, layer) in self.layers.iter_mut().enumerate() {
            let dropout = if use_dropout {
                self.network.sample_dropout(index, &mut self.rng)?
            } else {
                None
            };

            layer.forward_with_dropout(
                input,
                dropout,
                &self.network.model.layers[index],
                &context,
            )?;
            input = NeuraInput::Dense(layer.output().values.clone());
        }

        self.get_last().map(|layer| &layer.output().values)
    }

    /// Propagates `output_errors` through every layer, overwriting the params errors.
    /// The errors of the input are only computed when `propagate_to_input` is set.
    pub fn backward(
        &mut self,
        output_errors: &DVector<f64>,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        self.get_last()?;

        let context = NeuraContextWindow::empty();
        let mut errors = output_errors.clone();

        for index in (0..self.layers.len()).rev() {
            let layer = &mut self.layers[index];
            let propagate = index > 0 || propagate_to_input;

            layer.set_output_errors(&errors)?;
            layer.backward(
                &self.network.model.layers[index],
                &mut self.params_errors.layers[index],
                &context,
                propagate,
            )?;

            if index > 0 {
                errors = layer
                    .input_errors()
                    .cloned()
                    .ok_or(NeuraErr::InvalidOperation("missing errors of a hidden layer"))?;
            }
        }

        Ok(())
    }

    /// Decomposes the L1-normalized `relevant_outcomes` onto the input.
    pub fn calculate_relevance(&mut self, relevant_outcomes: &DVector<f64>) -> NeuraResult<()> {
        self.get_last()?;

        let context = NeuraContextWindow::empty();
        let mut relevance = normalize_l1(relevant_outcomes);

        for index in (0..self.layers.len()).rev() {
            let layer_relevance =
                self.layers[index].relevance(&self.network.model.layers[index], &context, &relevance)?;

            if index > 0 {
                relevance = layer_relevance.input.to_dense();
            } else {
                self.input_relevance = Some(layer_relevance.input);
            }
        }

        Ok(())
    }

    pub fn get_output(&self, copy: bool) -> NeuraResult<Cow<'_, DVector<f64>>> {
        Ok(cow(&self.get_last()?.output().values, copy))
    }

    pub fn get_params_errors(&self, copy: bool) -> Cow<'_, NeuraNetworkErrors> {
        cow(&self.params_errors, copy)
    }

    /// Fails for networks with a sparse input, and when the last backward did not propagate
    /// to the input.
    pub fn get_input_errors(&self, copy: bool) -> NeuraResult<Cow<'_, DVector<f64>>> {
        if self.network.sparse_input() {
            return Err(NeuraErr::InvalidOperation(
                "input errors are not defined for sparse inputs",
            ));
        }

        self.layers
            .first()
            .and_then(NeuraLayerStructure::input_errors)
            .map(|errors| cow(errors, copy))
            .ok_or(NeuraErr::InvalidOperation(
                "the input errors were not propagated",
            ))
    }

    pub fn get_input_relevance(&self, copy: bool) -> NeuraResult<Cow<'_, NeuraRelevance>> {
        self.input_relevance
            .as_ref()
            .map(|relevance| cow(relevance, copy))
            .ok_or(NeuraErr::InvalidOperation("no relevance was calculated"))
    }

    fn get_last(&self) -> NeuraResult<&NeuraLayerStructure> {
        self.layers
            .last()
            .ok_or(NeuraErr::InvalidOperation("no forward pass was run"))
    }
}
