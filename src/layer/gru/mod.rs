//! Gated Recurrent Unit layer.
//!
//! ```text
//! r = σ(Wr·x + br + Wrr·y')
//! p = σ(Wp·x + bp + Wpr·y')
//! c = f(Wc·x + bc + Wcr·(r ⊙ y'))
//! y = p ⊙ c + (1 - p) ⊙ y'
//! ```
//!
//! At the first step of a sequence, `y = p ⊙ c`.

use nalgebra::DVector;

use super::{
    gate_unit, impl_from_arch, NeuraActivationUnit, NeuraArchLayer, NeuraContextWindow,
    NeuraLayer, NeuraLayerInput, NeuraLayerKind, NeuraLayerParams, NeuraLayerRelevance,
};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    derivable::NeuraActivation,
    err::NeuraResult,
};

mod backward;
mod forward;
mod relevance;

#[derive(Clone, Debug)]
pub struct NeuraGruLayer {
    pub input: NeuraLayerInput,
    pub reset_gate: NeuraActivationUnit,
    pub partition_gate: NeuraActivationUnit,
    pub candidate: NeuraActivationUnit,
    pub output: NeuraActivationUnit,
}

impl NeuraGruLayer {
    pub fn new(
        input: NeuraLayerInput,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        Self {
            input,
            reset_gate: gate_unit(output_size),
            partition_gate: gate_unit(output_size),
            candidate: NeuraActivationUnit::new(output_size, activation),
            output: NeuraActivationUnit::new(output_size, None),
        }
    }
}

impl NeuraLayer for NeuraGruLayer {
    impl_from_arch!(NeuraGruLayer, Gru);

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        self.forward_gates(params.gru()?, prev_output)
    }

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let params = params.gru()?;
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        if let Some(next) = context.next_state_layer::<Self>()? {
            self.add_output_recurrent_errors(params, next);
        }

        self.assign_gates_errors(params, prev_output);
        self.assign_params_gradients(params_errors.gru_mut()?, prev_output)?;

        if propagate_to_input {
            self.input.propagate_errors(&[
                (&params.reset_gate.weights, &self.reset_gate.errors),
                (&params.partition_gate.weights, &self.partition_gate.errors),
                (&params.candidate.weights, &self.candidate.errors),
            ])?;
        }

        Ok(())
    }

    fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        self.relevance_of(params.gru()?, prev_output, output_relevance)
    }
}
