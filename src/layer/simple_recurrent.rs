use nalgebra::DVector;

use super::{
    impl_from_arch,
    relevance::{partition_1, partition_2, relevance_of_dense, relevance_of_input},
    NeuraActivationUnit, NeuraArchLayer, NeuraContextWindow, NeuraLayer, NeuraLayerInput,
    NeuraLayerKind, NeuraLayerParams, NeuraLayerRelevance,
};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    derivable::NeuraActivation,
    err::NeuraResult,
};

/// `y = f(W·x + b + Wr·y')`
#[derive(Clone, Debug)]
pub struct NeuraSimpleRecurrentLayer {
    pub input: NeuraLayerInput,
    pub output: NeuraActivationUnit,
}

impl NeuraSimpleRecurrentLayer {
    pub fn new(
        input: NeuraLayerInput,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        Self {
            input,
            output: NeuraActivationUnit::new(output_size, activation),
        }
    }
}

impl NeuraLayer for NeuraSimpleRecurrentLayer {
    impl_from_arch!(NeuraSimpleRecurrentLayer, SimpleRecurrent);

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        let params = params.simple_recurrent()?;
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        self.output
            .forward_recurrent(params, &self.input.values, prev_output)?;
        self.output.activate();

        Ok(())
    }

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let params = params.simple_recurrent()?;
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        if let Some(next) = context.next_state_layer::<Self>()? {
            // the errors of the next step are already taken before its activation
            self.output.errors += params.recurrent_weights.values.tr_mul(&next.output.errors);
        }

        self.output.apply_activation_derivative();
        self.output.assign_recurrent_params_gradients(
            params_errors.simple_recurrent_mut()?,
            &self.input.values,
            prev_output,
        )?;

        if propagate_to_input {
            self.input
                .propagate_errors(&[(&params.weights, &self.output.errors)])?;
        }

        Ok(())
    }

    fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let params = params.simple_recurrent()?;
        let x = &self.input.values;
        let y = self.output.pre_activation();

        let Some(prev) = context.prev_state_layer::<Self>()? else {
            return Ok(NeuraLayerRelevance {
                input: relevance_of_input(x, y, output_relevance, &params.weights.values)?,
                prev_output: None,
            });
        };

        let prev_output = &prev.output.values;
        let y_input = x.dot(&params.weights.values)? + params.biases.values.column(0);
        let y_recurrent = &params.recurrent_weights.values * prev_output;

        let input_relevance = partition_1(output_relevance, y, &y_input, &y_recurrent);
        let recurrent_relevance = partition_2(output_relevance, y, &y_recurrent);

        Ok(NeuraLayerRelevance {
            input: relevance_of_input(x, &y_input, &input_relevance, &params.weights.values)?,
            prev_output: Some(relevance_of_dense(
                prev_output,
                &y_recurrent,
                &recurrent_relevance,
                &params.recurrent_weights.values,
            )),
        })
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;

    use crate::layer::{fixtures, NeuraLayerKind};

    #[test]
    fn test_relevance_values() {
        let params = fixtures::params(NeuraLayerKind::SimpleRecurrent, true);
        let steps = fixtures::forward_sequence(NeuraLayerKind::SimpleRecurrent, &params);

        let first = fixtures::relevance_at(&steps, &params, 0);
        approx::assert_relative_eq!(
            first.input.to_dense(),
            dvector![-3.276666666667, 0.152424242424, 2.824242424242],
            epsilon = 1e-9
        );
        assert!(first.prev_output.is_none());

        let interior = fixtures::relevance_at(&steps, &params, 1);
        approx::assert_relative_eq!(
            interior.input.to_dense(),
            dvector![2.326946552109, -0.826632976575, 0.638363524618],
            epsilon = 1e-9
        );
        approx::assert_relative_eq!(
            interior.prev_output.unwrap(),
            dvector![-0.330724726687, -1.176054042686],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_relevance_conservation() {
        fixtures::assert_relevance_conserved(NeuraLayerKind::SimpleRecurrent);
    }
}
