use nalgebra::DVector;

use super::NeuraCfnLayer;
use crate::{algebra::NeuraParamsArray, err::NeuraResult, layer::params::NeuraCfnParams};

impl NeuraCfnLayer {
    pub(super) fn forward_gates(
        &mut self,
        params: &NeuraCfnParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        let x = &self.input.values;

        self.input_gate
            .forward_recurrent(&params.input_gate, x, prev_output)?;
        self.input_gate.activate();

        self.forget_gate
            .forward_recurrent(&params.forget_gate, x, prev_output)?;
        self.forget_gate.activate();

        self.candidate
            .forward_affine(&params.candidate_weights, None, x)?;
        self.candidate.activate();

        let mut output = self.input_gate.values.component_mul(&self.candidate.values);

        self.activated_prev_output = prev_output.map(|prev_output| self.activate(prev_output));
        if let Some(activated_prev_output) = &self.activated_prev_output {
            output += self.forget_gate.values.component_mul(activated_prev_output);
        }

        self.output.assign_values(output)
    }
}
