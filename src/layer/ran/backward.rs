use nalgebra::DVector;

use super::NeuraRanLayer;
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
    layer::params::NeuraRanParams,
};

impl NeuraRanLayer {
    /// Adds `g' ⊙ gy' + Wirᵀ·gi' + Wfrᵀ·gf'` from the next step to the output errors.
    pub(super) fn add_output_recurrent_errors(
        &mut self,
        params: &NeuraRanParams<NeuraParamsArray>,
        next: &NeuraRanLayer,
    ) {
        let gy = &mut self.output.errors;

        *gy += next.forget_gate.values.component_mul(&next.output.errors);
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
    }

    pub(super) fn assign_gates_errors(&mut self, prev_output: Option<&DVector<f64>>) {
        self.output.apply_activation_derivative();
        let gy = &self.output.errors;

        self.input_gate.errors = gy
            .component_mul(&self.candidate.values)
            .component_mul(&self.input_gate.activation_derivative());

        self.candidate.errors = gy.component_mul(&self.input_gate.values);

        self.forget_gate.errors = match prev_output {
            Some(prev_output) => gy
                .component_mul(prev_output)
                .component_mul(&self.forget_gate.activation_derivative()),
            None => DVector::zeros(gy.len()),
        };
    }

    pub(super) fn assign_params_gradients(
        &self,
        params_errors: &mut NeuraRanParams<NeuraErrorsArray>,
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
            .assign_params_gradients(&mut params_errors.candidate, x)
    }
}
