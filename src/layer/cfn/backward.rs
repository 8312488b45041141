use nalgebra::DVector;

use super::NeuraCfnLayer;
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
    layer::params::NeuraCfnParams,
};

impl NeuraCfnLayer {
    /// Adds `Wirᵀ·gi' + Wfrᵀ·gf' + gy' ⊙ g' ⊙ f'(y)` from the next step to the output errors.
    pub(super) fn add_output_recurrent_errors(
        &mut self,
        params: &NeuraCfnParams<NeuraParamsArray>,
        next: &NeuraCfnLayer,
    ) {
        let through_forget_gate = next
            .output
            .errors
            .component_mul(&next.forget_gate.values)
            .component_mul(&self.activation_derivative(&self.output.values));

        let gy = &mut self.output.errors;

        *gy += params
            .input_gate
            .recurrent_weights
            .values
            .tr_mul(&next.input_gate.errors);
        *gy += params
            .forget_gate
            .recurrent_weights
            .values
            .tr_mul(&next.forget_gate.errors);
        *gy += through_forget_gate;
    }

    pub(super) fn assign_gates_errors(&mut self, has_prev: bool) {
        let gy = &self.output.errors;

        self.input_gate.errors = gy
            .component_mul(&self.candidate.values)
            .component_mul(&self.input_gate.activation_derivative());

        self.candidate.errors = gy
            .component_mul(&self.input_gate.values)
            .component_mul(&self.candidate.activation_derivative());

        self.forget_gate.errors = match (&self.activated_prev_output, has_prev) {
            (Some(activated_prev_output), true) => gy
                .component_mul(activated_prev_output)
                .component_mul(&self.forget_gate.activation_derivative()),
            _ => DVector::zeros(gy.len()),
        };
    }

    pub(super) fn assign_params_gradients(
        &self,
        params_errors: &mut NeuraCfnParams<NeuraErrorsArray>,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        let x = &self.input.values;

        self.input_gate.assign_recurrent_params_gradients(
            &mut params_errors.input_gate,
            x,
            prev_output,
        )?;
        self.forget_gate.assign_recurrent_params_gradients(
            &mut params_errors.forget_gate,
            x,
            prev_output,
        )?;
        self.candidate
            .assign_weights_gradients(&mut params_errors.candidate_weights, x)
    }
}
