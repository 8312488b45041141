use nalgebra::DVector;

use super::NeuraGruLayer;
use crate::{
    algebra::NeuraParamsArray,
    err::NeuraResult,
    layer::{
        params::NeuraGruParams,
        relevance::{partition_1, partition_2, relevance_of_dense, relevance_of_input},
        NeuraLayerRelevance,
    },
};

impl NeuraGruLayer {
    pub(super) fn relevance_of(
        &self,
        params: &NeuraGruParams<NeuraParamsArray>,
        prev_output: Option<&DVector<f64>>,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let x = &self.input.values;
        let candidate = &params.candidate;

        let Some(prev_output) = prev_output else {
            return Ok(NeuraLayerRelevance {
                input: relevance_of_input(
                    x,
                    self.candidate.pre_activation(),
                    output_relevance,
                    &candidate.weights.values,
                )?,
                prev_output: None,
            });
        };

        // y = p ⊙ c + (1 - p) ⊙ y'
        let y = &self.output.values;
        let y_candidate = self.partition_gate.values.component_mul(&self.candidate.values);
        let y_prev = self
            .partition_gate
            .values
            .map(|p| 1.0 - p)
            .component_mul(prev_output);

        let candidate_relevance = partition_1(output_relevance, y, &y_candidate, &y_prev);
        let mut prev_relevance = partition_2(output_relevance, y, &y_prev);

        // c = f(Wc·x + bc + Wcr·(r ⊙ y'))
        let c = self.candidate.pre_activation();
        let reset_prev_output = self.reset_gate.values.component_mul(prev_output);
        let c_input = x.dot(&candidate.weights.values)? + candidate.biases.values.column(0);
        let c_recurrent = &candidate.recurrent_weights.values * &reset_prev_output;

        let input_relevance = partition_1(&candidate_relevance, c, &c_input, &c_recurrent);
        let recurrent_relevance = partition_2(&candidate_relevance, c, &c_recurrent);

        prev_relevance += relevance_of_dense(
            &reset_prev_output,
            &c_recurrent,
            &recurrent_relevance,
            &candidate.recurrent_weights.values,
        );

        Ok(NeuraLayerRelevance {
            input: relevance_of_input(x, &c_input, &input_relevance, &candidate.weights.values)?,
            prev_output: Some(prev_relevance),
        })
    }
}
