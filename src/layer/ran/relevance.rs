use nalgebra::DVector;

use super::NeuraRanLayer;
use crate::{
    algebra::NeuraParamsArray,
    err::NeuraResult,
    layer::{
        params::NeuraRanParams,
        relevance::{partition_1, partition_2, relevance_of_input},
        NeuraLayerRelevance,
    },
};

impl NeuraRanLayer {
    /// The gates act as weights: the relevance is split between `i ⊙ c` and `g ⊙ y'`,
    /// then the share of the candidate is distributed over the input.
    pub(super) fn relevance_of(
        &self,
        params: &NeuraRanParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let (candidate_relevance, prev_relevance) = match prev_output {
            Some(prev_output) => {
                let y = self.output.pre_activation();
                let y_input = self.input_gate.values.component_mul(&self.candidate.values);
                let y_prev = self.forget_gate.values.component_mul(prev_output);

                (
                    partition_1(output_relevance, y, &y_input, &y_prev),
                    Some(partition_2(output_relevance, y, &y_prev)),
                )
            }
            None => (output_relevance.clone(), None),
        };

        Ok(NeuraLayerRelevance {
            input: relevance_of_input(
                &self.input.values,
                &self.candidate.values,
                &candidate_relevance,
                &params.candidate.weights.values,
            )?,
            prev_output: prev_relevance,
        })
    }
}
