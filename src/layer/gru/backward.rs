use nalgebra::DVector;

use super::NeuraGruLayer;
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    err::NeuraResult,
    layer::params::NeuraGruParams,
};

impl NeuraGruLayer {
    /// Adds `Wrrᵀ·gr' + Wprᵀ·gp' + (Wcrᵀ·gc') ⊙ r' + (1 - p') ⊙ gy'` from the next step.
    pub(super) fn add_output_recurrent_errors(
        &mut self,
        params: &NeuraGruParams<NeuraParamsArray>,
        next: &NeuraGruLayer,
    ) {
        let gy = &mut self.output.errors;

        *gy += params
            .reset_gate
            .recurrent_weights
            .values
            .tr_mul(&next.reset_gate.errors);
        *gy += params
            .partition_gate
            .recurrent_weights
            .values
            .tr_mul(&next.partition_gate.errors);
        *gy += params
            .candidate
            .recurrent_weights
            .values
            .tr_mul(&next.candidate.errors)
            .component_mul(&next.reset_gate.values);
        *gy += next
            .partition_gate
            .values
            .map(|p| 1.0 - p)
            .component_mul(&next.output.errors);
    }

    /// The candidate errors are computed first: the reset gate errors depend on them.
    pub(super) fn assign_gates_errors(
        &mut self,
        params: &NeuraGruParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
    ) {
        let gy = &self.output.errors;
        let p = &self.partition_gate.values;
        let c = &self.candidate.values;

        self.candidate.errors = gy
            .component_mul(p)
            .component_mul(&self.candidate.activation_derivative());

        match prev_output {
            Some(prev_output) => {
                self.reset_gate.errors = params
                    .candidate
                    .recurrent_weights
                    .values
                    .tr_mul(&self.candidate.errors)
                    .component_mul(&self.reset_gate.activation_derivative())
                    .component_mul(prev_output);

                self.partition_gate.errors = gy
                    .component_mul(&(c - prev_output))
                    .component_mul(&self.partition_gate.activation_derivative());
            }
            None => {
                self.reset_gate.errors = DVector::zeros(gy.len());

                self.partition_gate.errors = gy
                    .component_mul(c)
                    .component_mul(&self.partition_gate.activation_derivative());
            }
        }
    }

    pub(super) fn assign_params_gradients(
        &self,
        params_errors: &mut NeuraGruParams<NeuraErrorsArray>,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        let x = &self.input.values;

        self.reset_gate.assign_recurrent_params_gradients(
            &mut params_errors.reset_gate,
            x,
            prev_output,
        )?;
        self.partition_gate.assign_recurrent_params_gradients(
            &mut params_errors.partition_gate,
            x,
            prev_output,
        )?;

        // the candidate reads r ⊙ y' instead of y'
        let reset_prev_output = prev_output.map(|y| self.reset_gate.values.component_mul(y));
        self.candidate.assign_recurrent_params_gradients(
            &mut params_errors.candidate,
            x,
            reset_prev_output.as_ref(),
        )
    }
}
