use nalgebra::DVector;

use super::NeuraGruLayer;
use crate::{algebra::NeuraParamsArray, err::NeuraResult, layer::params::NeuraGruParams};

impl NeuraGruLayer {
    pub(super) fn forward_gates(
        &mut self,
        params: &NeuraGruParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        let x = &self.input.values;

        self.reset_gate
            .forward_recurrent(&params.reset_gate, x, prev_output)?;
        self.reset_gate.activate();

        self.partition_gate
            .forward_recurrent(&params.partition_gate, x, prev_output)?;
        self.partition_gate.activate();

        self.candidate.forward_affine(
            &params.candidate.weights,
            Some(&params.candidate.biases),
            x,
        )?;
        if let Some(prev_output) = prev_output {
            let reset_prev_output = self.reset_gate.values.component_mul(prev_output);
            self.candidate
                .add_recurrent(&params.candidate.recurrent_weights, &reset_prev_output)?;
        }
        self.candidate.activate();

        let p = &self.partition_gate.values;
        let mut output = p.component_mul(&self.candidate.values);
        if let Some(prev_output) = prev_output {
            output += p.map(|p| 1.0 - p).component_mul(prev_output);
        }

        self.output.assign_values(output)
    }
}
