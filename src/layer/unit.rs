use nalgebra::DVector;

use super::{
    dropout::NeuraDropoutMask,
    params::{NeuraParamsUnit, NeuraRecurrentParamsUnit},
};
use crate::{
    algebra::{NeuraErrorsArray, NeuraInput, NeuraParamsArray},
    derivable::NeuraActivation,
    err::{NeuraErr, NeuraResult},
};

/// The values and errors of a gate, a candidate or an output.
#[derive(Clone, Debug)]
pub struct NeuraActivationUnit {
    pub values: DVector<f64>,

    /// The values before `activation` was applied; only set once the unit was activated.
    pub values_not_activated: Option<DVector<f64>>,

    pub errors: DVector<f64>,

    pub activation: Option<Box<dyn NeuraActivation>>,
}

impl NeuraActivationUnit {
    pub fn new(size: usize, activation: Option<Box<dyn NeuraActivation>>) -> Self {
        Self {
            values: DVector::zeros(size),
            values_not_activated: None,
            errors: DVector::zeros(size),
            activation,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sets `values = W·x + b`, without activating them.
    pub fn forward(&mut self, params: &NeuraParamsUnit<NeuraParamsArray>, x: &NeuraInput) -> NeuraResult<()> {
        self.forward_affine(&params.weights, Some(&params.biases), x)
    }

    /// Sets `values = W·x + b`, plus `Wr·y'` when a previous output is given.
    pub fn forward_recurrent(
        &mut self,
        params: &NeuraRecurrentParamsUnit<NeuraParamsArray>,
        x: &NeuraInput,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        self.forward_affine(&params.weights, Some(&params.biases), x)?;

        if let Some(prev_output) = prev_output {
            self.add_recurrent(&params.recurrent_weights, prev_output)?;
        }

        Ok(())
    }

    pub(crate) fn forward_affine(
        &mut self,
        weights: &NeuraParamsArray,
        biases: Option<&NeuraParamsArray>,
        x: &NeuraInput,
    ) -> NeuraResult<()> {
        let mut values = x.dot(&weights.values)?;

        if values.len() != self.len() {
            return Err(NeuraErr::mismatch(
                "unit values",
                (self.len(), 1),
                (values.len(), 1),
            ));
        }

        if let Some(biases) = biases {
            values += biases.values.column(0);
        }

        self.values = values;
        self.values_not_activated = None;

        Ok(())
    }

    pub(crate) fn add_recurrent(
        &mut self,
        recurrent_weights: &NeuraParamsArray,
        prev_output: &DVector<f64>,
    ) -> NeuraResult<()> {
        if recurrent_weights.values.ncols() != prev_output.len() {
            return Err(NeuraErr::mismatch(
                "previous output",
                (recurrent_weights.values.ncols(), 1),
                (prev_output.len(), 1),
            ));
        }

        self.values += &recurrent_weights.values * prev_output;
        Ok(())
    }

    /// Sets the values computed outside of an affine transform, without activating them.
    pub fn assign_values(&mut self, values: DVector<f64>) -> NeuraResult<()> {
        if values.len() != self.len() {
            return Err(NeuraErr::mismatch(
                "unit values",
                (self.len(), 1),
                (values.len(), 1),
            ));
        }

        self.values = values;
        self.values_not_activated = None;
        Ok(())
    }

    /// Applies the activation function, if any, keeping a copy of the values it was applied on.
    pub fn activate(&mut self) {
        if let Some(activation) = &self.activation {
            let activated = activation.eval_vector(&self.values);
            self.values_not_activated = Some(std::mem::replace(&mut self.values, activated));
        }
    }

    /// The values before the activation, which are the values themselves when there is none.
    pub fn pre_activation(&self) -> &DVector<f64> {
        self.values_not_activated.as_ref().unwrap_or(&self.values)
    }

    /// The derivative of the activation at the not-activated values; ones if there is no activation.
    pub fn activation_derivative(&self) -> DVector<f64> {
        match (&self.activation, &self.values_not_activated) {
            (Some(activation), Some(values)) => activation.derivate_vector(values),
            _ => DVector::from_element(self.len(), 1.0),
        }
    }

    /// Multiplies `errors` by the activation derivative.
    pub fn apply_activation_derivative(&mut self) {
        if self.activation.is_some() {
            let derivative = self.activation_derivative();
            self.errors.component_mul_assign(&derivative);
        }
    }

    pub fn set_errors(&mut self, errors: &DVector<f64>) -> NeuraResult<()> {
        if errors.len() != self.len() {
            return Err(NeuraErr::mismatch(
                "unit errors",
                (self.len(), 1),
                (errors.len(), 1),
            ));
        }

        self.errors.copy_from(errors);
        Ok(())
    }

    /// Overwrites `biases` with `errors` and `weights` with `errors ⊗ xᵀ`.
    pub fn assign_params_gradients(
        &self,
        params_errors: &mut NeuraParamsUnit<NeuraErrorsArray>,
        x: &NeuraInput,
    ) -> NeuraResult<()> {
        params_errors
            .biases
            .assign(NeuraErrorsArray::from_vector(&self.errors))?;
        self.assign_weights_gradients(&mut params_errors.weights, x)
    }

    /// Same as [`Self::assign_params_gradients`], also overwriting the recurrent weights gradient
    /// with `errors ⊗ y'ᵀ`, or with zeros at the first step of a sequence.
    pub fn assign_recurrent_params_gradients(
        &self,
        params_errors: &mut NeuraRecurrentParamsUnit<NeuraErrorsArray>,
        x: &NeuraInput,
        prev_output: Option<&DVector<f64>>,
    ) -> NeuraResult<()> {
        params_errors
            .biases
            .assign(NeuraErrorsArray::from_vector(&self.errors))?;
        self.assign_weights_gradients(&mut params_errors.weights, x)?;

        match prev_output {
            Some(prev_output) => params_errors
                .recurrent_weights
                .assign(NeuraErrorsArray::Dense(&self.errors * prev_output.transpose())),
            None => {
                params_errors.recurrent_weights.set_zero();
                Ok(())
            }
        }
    }

    pub(crate) fn assign_weights_gradients(
        &self,
        weights_errors: &mut NeuraErrorsArray,
        x: &NeuraInput,
    ) -> NeuraResult<()> {
        weights_errors.assign(x.outer(&self.errors))
    }
}

/// The input of a layer structure.
#[derive(Clone, Debug)]
pub struct NeuraLayerInput {
    pub values: NeuraInput,

    /// The input as it was given, before `activation` was applied to it.
    pub values_not_activated: Option<DVector<f64>>,

    /// Only set by a backward pass that propagates to the input.
    pub errors: Option<DVector<f64>>,

    pub activation: Option<Box<dyn NeuraActivation>>,

    /// The dropout applied to the values since they were last assigned.
    pub dropout: Option<NeuraDropoutMask>,
}

impl NeuraLayerInput {
    pub fn new(size: usize, activation: Option<Box<dyn NeuraActivation>>) -> Self {
        Self {
            values: NeuraInput::Dense(DVector::zeros(size)),
            values_not_activated: None,
            errors: None,
            activation,
            dropout: None,
        }
    }

    /// Stores `input`, activating it when the input has an activation function.
    pub fn assign(&mut self, input: NeuraInput) -> NeuraResult<()> {
        if input.len() != self.values.len() {
            return Err(NeuraErr::mismatch(
                "layer input",
                (self.values.len(), 1),
                (input.len(), 1),
            ));
        }

        self.errors = None;
        self.dropout = None;

        match (&self.activation, input) {
            (None, input) => {
                self.values = input;
                self.values_not_activated = None;
            }
            (Some(activation), NeuraInput::Dense(vector)) => {
                self.values = NeuraInput::Dense(activation.eval_vector(&vector));
                self.values_not_activated = Some(vector);
            }
            (Some(_), _) => {
                return Err(NeuraErr::InvalidOperation(
                    "a sparse input cannot have an activation function",
                ))
            }
        }

        Ok(())
    }

    /// Drops the values of the assigned input, after its activation.
    pub fn apply_dropout(&mut self, mask: NeuraDropoutMask) -> NeuraResult<()> {
        let NeuraInput::Dense(values) = &mut self.values else {
            return Err(NeuraErr::InvalidOperation(
                "dropout can only be applied to a dense input",
            ));
        };

        mask.apply(values)?;
        self.dropout = Some(mask);
        Ok(())
    }

    /// Sets the errors of the input to `Σ Wᵀ·g` over the given `(W, g)` pairs.
    ///
    /// Only dense inputs have errors.
    pub(crate) fn propagate_errors(
        &mut self,
        contributions: &[(&NeuraParamsArray, &DVector<f64>)],
    ) -> NeuraResult<()> {
        if !self.values.is_dense() {
            return Err(NeuraErr::InvalidOperation(
                "input errors are only defined for dense inputs",
            ));
        }

        let mut errors = DVector::zeros(self.values.len());
        for (weights, gate_errors) in contributions {
            errors += weights.values.tr_mul(*gate_errors);
        }

        self.assign_errors(errors)
    }

    /// Stores the errors of the input, multiplying them by the dropout mask and by the derivative
    /// of its activation.
    pub fn assign_errors(&mut self, mut errors: DVector<f64>) -> NeuraResult<()> {
        if let Some(mask) = &self.dropout {
            mask.apply(&mut errors)?;
        }
        if let (Some(activation), Some(values)) = (&self.activation, &self.values_not_activated) {
            errors.component_mul_assign(&activation.derivate_vector(values));
        }

        self.errors = Some(errors);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;
    use crate::{algebra::NeuraSparseBinary, derivable::activation::Tanh};

    fn params() -> NeuraParamsUnit<NeuraParamsArray> {
        NeuraParamsUnit {
            weights: NeuraParamsArray::new(dmatrix![0.5, -0.5, 1.0; 0.1, 0.2, 0.3]),
            biases: NeuraParamsArray::from_vector(dvector![0.1, -0.1]),
        }
    }

    #[test]
    fn test_forward_and_activate() {
        let mut unit = NeuraActivationUnit::new(2, Some(Box::new(Tanh)));
        unit.forward(&params(), &NeuraInput::Dense(dvector![1.0, 2.0, 0.5]))
            .unwrap();

        approx::assert_relative_eq!(unit.values, dvector![0.1, 0.55]);

        unit.activate();
        approx::assert_relative_eq!(unit.values, dvector![0.1f64.tanh(), 0.55f64.tanh()]);
        approx::assert_relative_eq!(
            unit.activation_derivative(),
            dvector![1.0 - 0.1f64.tanh().powi(2), 1.0 - 0.55f64.tanh().powi(2)]
        );
    }

    #[test]
    fn test_params_gradients_overwrite() {
        let mut unit = NeuraActivationUnit::new(2, None);
        unit.set_errors(&dvector![1.0, -2.0]).unwrap();

        let mut errors = NeuraParamsUnit::<NeuraErrorsArray>::build(3, 2, false);
        let x = NeuraInput::Dense(dvector![1.0, 0.0, 2.0]);

        unit.assign_params_gradients(&mut errors, &x).unwrap();
        unit.assign_params_gradients(&mut errors, &x).unwrap();

        assert_eq!(errors.biases.to_dense(), dmatrix![1.0; -2.0]);
        assert_eq!(
            errors.weights.to_dense(),
            dmatrix![1.0, 0.0, 2.0; -2.0, 0.0, -4.0]
        );
    }

    #[test]
    fn test_recurrent_gradients_at_first_step() {
        let mut unit = NeuraActivationUnit::new(2, None);
        unit.set_errors(&dvector![1.0, 1.0]).unwrap();

        let mut errors = NeuraRecurrentParamsUnit::<NeuraErrorsArray>::build(1, 2, false);
        let x = NeuraInput::Dense(dvector![3.0]);

        unit.assign_recurrent_params_gradients(&mut errors, &x, Some(&dvector![1.0, 2.0]))
            .unwrap();
        assert_eq!(errors.recurrent_weights.get(1, 1), 2.0);

        unit.assign_recurrent_params_gradients(&mut errors, &x, None)
            .unwrap();
        assert_eq!(errors.recurrent_weights.to_dense(), nalgebra::DMatrix::zeros(2, 2));
    }

    #[test]
    fn test_input_activation() {
        let mut input = NeuraLayerInput::new(2, Some(Box::new(Tanh)));
        input.assign(NeuraInput::Dense(dvector![0.0, 1.0])).unwrap();
        input.assign_errors(dvector![1.0, 1.0]).unwrap();

        approx::assert_relative_eq!(
            input.errors.clone().unwrap(),
            dvector![1.0, 1.0 - 1.0f64.tanh().powi(2)]
        );

        let binary = NeuraSparseBinary::new(2, [1]).unwrap();
        assert!(input.assign(NeuraInput::SparseBinary(binary)).is_err());
        assert!(input.assign(NeuraInput::Dense(dvector![1.0])).is_err());
    }
}
