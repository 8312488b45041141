//! Recurrent Additive Network layer.
//!
//! ```text
//! i = σ(Wi·x + bi + Wir·y')
//! g = σ(Wf·x + bf + Wfr·y')
//! c = Wc·x + bc
//! y = f(i ⊙ c + g ⊙ y')
//! ```

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
pub struct NeuraRanLayer {
    pub input: NeuraLayerInput,
    pub input_gate: NeuraActivationUnit,
    pub forget_gate: NeuraActivationUnit,
    pub candidate: NeuraActivationUnit,
    pub output: NeuraActivationUnit,
}

impl NeuraRanLayer {
    pub fn new(
        input: NeuraLayerInput,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        Self {
            input,
            input_gate: gate_unit(output_size),
            forget_gate: gate_unit(output_size),
            candidate: NeuraActivationUnit::new(output_size, None),
            output: NeuraActivationUnit::new(output_size, activation),
        }
    }
}

impl NeuraLayer for NeuraRanLayer {
    impl_from_arch!(NeuraRanLayer, Ran);

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        self.forward_gates(params.ran()?, prev_output)
    }

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let params = params.ran()?;
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        if let Some(next) = context.next_state_layer::<Self>()? {
            self.add_output_recurrent_errors(params, next);
        }

        self.assign_gates_errors(prev_output);
        self.assign_params_gradients(params_errors.ran_mut()?, prev_output)?;

        if propagate_to_input {
            self.input.propagate_errors(&[
                (&params.input_gate.weights, &self.input_gate.errors),
                (&params.forget_gate.weights, &self.forget_gate.errors),
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

        self.relevance_of(params.ran()?, prev_output, output_relevance)
    }
}
