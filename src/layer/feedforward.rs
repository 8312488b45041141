use nalgebra::DVector;

use super::{
    impl_from_arch, relevance::relevance_of_input, NeuraActivationUnit, NeuraArchLayer,
    NeuraContextWindow, NeuraLayer, NeuraLayerInput, NeuraLayerKind, NeuraLayerParams,
    NeuraLayerRelevance,
};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    derivable::NeuraActivation,
    err::NeuraResult,
};

/// `y = f(W·x + b)`
#[derive(Clone, Debug)]
pub struct NeuraFeedforwardLayer {
    pub input: NeuraLayerInput,
    pub output: NeuraActivationUnit,
}

impl NeuraFeedforwardLayer {
    pub fn new(
        input: NeuraLayerInput,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        Self {
            input,
            output: NeuraActivationUnit::new(output_size, activation),
        }
    }
}

impl NeuraLayer for NeuraFeedforwardLayer {
    impl_from_arch!(NeuraFeedforwardLayer, Feedforward);

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        _context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        let params = params.feedforward()?;

        self.output.forward(params, &self.input.values)?;
        self.output.activate();

        Ok(())
    }

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        _context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let params = params.feedforward()?;

        self.output.apply_activation_derivative();
        self.output
            .assign_params_gradients(params_errors.feedforward_mut()?, &self.input.values)?;

        if propagate_to_input {
            self.input
                .propagate_errors(&[(&params.weights, &self.output.errors)])?;
        }

        Ok(())
    }

    fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        _context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let params = params.feedforward()?;

        Ok(NeuraLayerRelevance {
            input: relevance_of_input(
                &self.input.values,
                self.output.pre_activation(),
                output_relevance,
                &params.weights.values,
            )?,
            prev_output: None,
        })
    }
}
