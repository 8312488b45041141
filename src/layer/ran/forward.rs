use nalgebra::DVector;

use super::NeuraRanLayer;
use crate::{algebra::NeuraParamsArray, err::NeuraResult, layer::params::NeuraRanParams};

impl NeuraRanLayer {
    pub(super) fn forward_gates(
        &mut self,
        params: &NeuraRanParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        let x = &self.input.values;

        self.input_gate
            .forward_recurrent(&params.input_gate, x, prev_output)?;
        self.input_gate.activate();

        self.forget_gate
            .forward_recurrent(&params.forget_gate, x, prev_output)?;
        self.forget_gate.activate();

        self.candidate.forward(&params.candidate, x)?;

        let mut output = self.input_gate.values.component_mul(&self.candidate.values);
        if let Some(prev_output) = prev_output {
            output += self.forget_gate.values.component_mul(prev_output);
        }

        self.output.assign_values(output)?;
        self.output.activate();

        Ok(())
    }
}
