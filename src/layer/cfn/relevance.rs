use nalgebra::DVector;

use super::NeuraCfnLayer;
use crate::{
    algebra::NeuraParamsArray,
    err::{NeuraErr, NeuraResult},
    layer::{
        params::NeuraCfnParams,
        relevance::{partition_1, partition_2, relevance_of_input},
        NeuraLayerRelevance,
    },
};

impl NeuraCfnLayer {
    /// Splits the relevance between `i ⊙ c` and `g ⊙ f(y')`; the share of the candidate goes to
    /// the input through `Wc·x`.
    pub(super) fn relevance_of(
        &self,
        params: &NeuraCfnParams<NeuraParamsArray>,
        has_prev: bool,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let (candidate_relevance, prev_relevance) = if has_prev {
            let activated_prev_output = self.activated_prev_output.as_ref().ok_or(
                NeuraErr::InvalidOperation("the layer was forwarded without its previous step"),
            )?;

            let y = &self.output.values;
            let y_input = self.input_gate.values.component_mul(&self.candidate.values);
            let y_prev = self.forget_gate.values.component_mul(activated_prev_output);

            (
                partition_1(output_relevance, y, &y_input, &y_prev),
                Some(partition_2(output_relevance, y, &y_prev)),
            )
        } else {
            (output_relevance.clone(), None)
        };

        Ok(NeuraLayerRelevance {
            input: relevance_of_input(
                &self.input.values,
                self.candidate.pre_activation(),
                &candidate_relevance,
                &params.candidate_weights.values,
            )?,
            prev_output: prev_relevance,
        })
    }
}
