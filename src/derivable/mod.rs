use std::fmt::Debug;

use dyn_clone::DynClone;
use nalgebra::DVector;

use crate::err::NeuraResult;

pub mod activation;
pub mod loss;

pub trait NeuraDerivable<F> {
    fn eval(&self, input: F) -> F;

    /// Should return the derivative of `self.eval(input)`
    fn derivate(&self, at: F) -> F;
}

/// An activation function that layers can own as a trait object.
pub trait NeuraActivation: NeuraDerivable<f64> + DynClone + Debug {}

impl<T: NeuraDerivable<f64> + Clone + Debug + 'static> NeuraActivation for T {}

dyn_clone::clone_trait_object!(NeuraActivation);

impl dyn NeuraActivation {
    pub fn eval_vector(&self, input: &DVector<f64>) -> DVector<f64> {
        input.map(|x| self.eval(x))
    }

    /// Derivative of the activation, taken at the not-activated values `at`
    pub fn derivate_vector(&self, at: &DVector<f64>) -> DVector<f64> {
        at.map(|x| self.derivate(x))
    }
}

pub trait NeuraLoss {
    type Input;
    type Target;

    fn eval(&self, target: &Self::Target, actual: &Self::Input) -> NeuraResult<f64>;

    /// Should return the gradient of the loss function according to `actual`
    /// ($\nabla_{\texttt{actual}} \texttt{self.eval}(\texttt{target}, \texttt{actual})$).
    fn nabla(&self, target: &Self::Target, actual: &Self::Input) -> NeuraResult<Self::Input>;
}
