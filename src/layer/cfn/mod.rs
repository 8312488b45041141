//! Chaos-Free Network layer.
//!
//! ```text
//! i = σ(Wi·x + bi + Wir·y')
//! g = σ(Wf·x + bf + Wfr·y')
//! c = f(Wc·x)
//! y = i ⊙ c + g ⊙ f(y')
//! ```

use nalgebra::DVector;

use super::{
    gate_unit, impl_from_arch, NeuraActivationUnit, NeuraArchLayer, NeuraContextWindow,
    NeuraLayer, NeuraLayerInput, NeuraLayerKind, NeuraLayerParams, NeuraLayerRelevance,
};
use crate::{
    algebra::{NeuraErrorsArray, NeuraParamsArray},
    derivable::NeuraActivation,
    err::NeuraResult,
};

mod backward;
mod forward;
mod relevance;

#[derive(Clone, Debug)]
pub struct NeuraCfnLayer {
    pub input: NeuraLayerInput,
    pub input_gate: NeuraActivationUnit,
    pub forget_gate: NeuraActivationUnit,
    pub candidate: NeuraActivationUnit,
    pub output: NeuraActivationUnit,

    /// `f(y')`, set by the forward when there is a previous step
    pub activated_prev_output: Option<DVector<f64>>,
}

impl NeuraCfnLayer {
    pub fn new(
        input: NeuraLayerInput,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        Self {
            input,
            input_gate: gate_unit(output_size),
            forget_gate: gate_unit(output_size),
            candidate: NeuraActivationUnit::new(output_size, activation),
            output: NeuraActivationUnit::new(output_size, None),
            activated_prev_output: None,
        }
    }

    /// Applies the activation of the layer, or nothing if it has none.
    fn activate(&self, values: &DVector<f64>) -> DVector<f64> {
        match &self.candidate.activation {
            Some(activation) => activation.eval_vector(values),
            None => values.clone(),
        }
    }

    fn activation_derivative(&self, values: &DVector<f64>) -> DVector<f64> {
        match &self.candidate.activation {
            Some(activation) => activation.derivate_vector(values),
            None => DVector::from_element(values.len(), 1.0),
        }
    }
}

impl NeuraLayer for NeuraCfnLayer {
    impl_from_arch!(NeuraCfnLayer, Cfn);

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        self.forward_gates(params.cfn()?, prev_output)
    }

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        let params = params.cfn()?;
        let prev_output = context
            .prev_state_layer::<Self>()?
            .map(|prev| &prev.output.values);

        if let Some(next) = context.next_state_layer::<Self>()? {
            self.add_output_recurrent_errors(params, next);
        }

        self.assign_gates_errors(prev_output.is_some());
        self.assign_params_gradients(params_errors.cfn_mut()?, prev_output)?;

        if propagate_to_input {
            self.input.propagate_errors(&[
                (&params.input_gate.weights, &self.input_gate.errors),
                (&params.forget_gate.weights, &self.forget_gate.errors),
                (&params.candidate_weights, &self.candidate.errors),
            ])?;
        }

        Ok(())
    }

    fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        let has_prev = context.prev_state_layer::<Self>()?.is_some();

        self.relevance_of(params.cfn()?, has_prev, output_relevance)
    }
}

#[cfg(test)]
mod test {
    use nalgebra::dvector;

    use super::*;
    use crate::{
        algebra::NeuraInput,
        derivable::activation::Tanh,
        layer::{fixtures, NeuraLayerStructure},
        random::NeuraFixedRangeRandom,
    };

    #[test]
    fn test_first_step_ignores_forget_gate() {
        let mut params = NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Cfn, 3, 2, false);
        params
            .initialize(&mut NeuraFixedRangeRandom::seeded(0.5, 3), 0.1)
            .unwrap();
        let mut errors = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Cfn, 3, 2, false);

        let mut layer = NeuraLayerStructure::new(NeuraLayerKind::Cfn, 3, 2, Some(Box::new(Tanh)), None);
        let context = NeuraContextWindow::empty();

        layer
            .forward(NeuraInput::Dense(dvector![0.5, -0.3, 0.9]), &params, &context)
            .unwrap();

        let cfn = layer.downcast::<NeuraCfnLayer>().unwrap();
        approx::assert_relative_eq!(
            cfn.output.values,
            cfn.input_gate.values.component_mul(&cfn.candidate.values)
        );
        assert!(cfn.activated_prev_output.is_none());

        layer.set_output_errors(&dvector![0.4, -0.2]).unwrap();
        layer.backward(&params, &mut errors, &context, false).unwrap();

        let cfn = layer.downcast::<NeuraCfnLayer>().unwrap();
        assert_eq!(cfn.forget_gate.errors, dvector![0.0, 0.0]);
        assert_eq!(errors.cfn().unwrap().forget_gate.weights.to_dense().sum(), 0.0);
    }

    #[test]
    fn test_relevance_values() {
        let params = fixtures::params(NeuraLayerKind::Cfn, true);
        let steps = fixtures::forward_sequence(NeuraLayerKind::Cfn, &params);

        let first = fixtures::relevance_at(&steps, &params, 0);
        approx::assert_relative_eq!(
            first.input.to_dense(),
            dvector![0.649883449883, 0.128205128205, -0.378088578089],
            epsilon = 1e-9
        );
        assert!(first.prev_output.is_none());

        let interior = fixtures::relevance_at(&steps, &params, 1);
        approx::assert_relative_eq!(
            interior.input.to_dense(),
            dvector![0.938781786517, 1.148465572967, -0.232267013129],
            epsilon = 1e-9
        );
        approx::assert_relative_eq!(
            interior.prev_output.unwrap(),
            dvector![-1.371098879144, -0.083881467211],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_relevance_conservation() {
        fixtures::assert_relevance_conserved(NeuraLayerKind::Cfn);
    }
}
