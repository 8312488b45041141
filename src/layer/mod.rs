//! Layer structures: the state of one layer at one time step.
//!
//! A structure owns its units (input, gates, candidate, output) and borrows the parameters and
//! the [`NeuraContextWindow`] it is given by the processor on every call.

use nalgebra::DVector;

use crate::{
    algebra::{NeuraErrorsArray, NeuraInput, NeuraParamsArray, NeuraRelevance},
    derivable::{activation::Sigmoid, NeuraActivation},
    err::{NeuraErr, NeuraResult},
};

mod context;
pub use context::{NeuraContextKind, NeuraContextWindow};

mod dropout;
pub use dropout::NeuraDropoutMask;

pub mod params;
pub use params::NeuraLayerParams;

mod unit;
pub use unit::{NeuraActivationUnit, NeuraLayerInput};

pub mod relevance;

mod feedforward;
pub use feedforward::NeuraFeedforwardLayer;

mod simple_recurrent;
pub use simple_recurrent::NeuraSimpleRecurrentLayer;

mod cfn;
pub use cfn::NeuraCfnLayer;

mod gru;
pub use gru::NeuraGruLayer;

mod ran;
pub use ran::NeuraRanLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeuraLayerKind {
    Feedforward,
    SimpleRecurrent,
    Cfn,
    Gru,
    Ran,
}

impl NeuraLayerKind {
    pub fn is_recurrent(self) -> bool {
        !matches!(self, Self::Feedforward)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NeuraInputType {
    #[default]
    Dense,
    SparseBinary,
    Sparse,
}

impl NeuraInputType {
    pub fn is_sparse(self) -> bool {
        !matches!(self, Self::Dense)
    }

    pub fn matches(self, input: &NeuraInput) -> bool {
        matches!(
            (self, input),
            (Self::Dense, NeuraInput::Dense(_))
                | (Self::SparseBinary, NeuraInput::SparseBinary(_))
                | (Self::Sparse, NeuraInput::Sparse(_))
        )
    }
}

/// The configuration of a layer of a network.
///
/// The first configuration of a network describes its input:
/// ```
/// use neuragate::prelude::*;
///
/// let configs = vec![
///     NeuraLayerConfig::input(4).input_type(NeuraInputType::SparseBinary),
///     NeuraLayerConfig::new(8, NeuraLayerKind::Gru).activation(Tanh),
///     NeuraLayerConfig::new(2, NeuraLayerKind::Feedforward)
///         .activation(Sigmoid)
///         .dropout(0.25),
/// ];
/// # assert_eq!(configs.len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct NeuraLayerConfig {
    pub size: usize,

    /// `None` for the input configuration
    pub kind: Option<NeuraLayerKind>,

    pub activation: Option<Box<dyn NeuraActivation>>,

    pub input_type: NeuraInputType,

    /// The probability of dropping each value of the input of the layer during training.
    pub dropout: f64,
}

impl NeuraLayerConfig {
    pub fn input(size: usize) -> Self {
        Self {
            size,
            kind: None,
            activation: None,
            input_type: NeuraInputType::Dense,
            dropout: 0.0,
        }
    }

    pub fn new(size: usize, kind: NeuraLayerKind) -> Self {
        Self {
            size,
            kind: Some(kind),
            activation: None,
            input_type: NeuraInputType::Dense,
            dropout: 0.0,
        }
    }

    pub fn activation(mut self, activation: impl NeuraActivation + 'static) -> Self {
        self.activation = Some(Box::new(activation));
        self
    }

    pub fn input_type(mut self, input_type: NeuraInputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn dropout(mut self, probability: f64) -> Self {
        self.dropout = probability;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NeuraLayerState {
    #[default]
    Uninitialized,
    Forwarded,
    Backwarded,
}

/// The relevance of the input of a structure, and of the previous output when it has one.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraLayerRelevance {
    pub input: NeuraRelevance,
    pub prev_output: Option<DVector<f64>>,
}

/// The operations each architecture implements.
///
/// `forward` expects the input to be already assigned; `backward` expects the output errors to be
/// already set. State checks are done by [`NeuraLayerStructure`].
pub trait NeuraLayer: Sized {
    const KIND: NeuraLayerKind;

    fn from_arch(arch: &NeuraArchLayer) -> Option<&Self>;

    fn input(&self) -> &NeuraLayerInput;

    fn input_mut(&mut self) -> &mut NeuraLayerInput;

    fn output(&self) -> &NeuraActivationUnit;

    fn output_mut(&mut self) -> &mut NeuraActivationUnit;

    fn forward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()>;

    fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()>;

    /// `output_relevance` is the relevance of the output of this structure.
    fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance>;
}

#[derive(Clone, Debug)]
pub enum NeuraArchLayer {
    Feedforward(NeuraFeedforwardLayer),
    SimpleRecurrent(NeuraSimpleRecurrentLayer),
    Cfn(NeuraCfnLayer),
    Gru(NeuraGruLayer),
    Ran(NeuraRanLayer),
}

macro_rules! dispatch {
    ( $arch:expr, $layer:ident => $body:expr ) => {
        match $arch {
            NeuraArchLayer::Feedforward($layer) => $body,
            NeuraArchLayer::SimpleRecurrent($layer) => $body,
            NeuraArchLayer::Cfn($layer) => $body,
            NeuraArchLayer::Gru($layer) => $body,
            NeuraArchLayer::Ran($layer) => $body,
        }
    };
}

/// One layer at one time step, with its forward/backward state.
#[derive(Clone, Debug)]
pub struct NeuraLayerStructure {
    pub arch: NeuraArchLayer,
    state: NeuraLayerState,
}

impl NeuraLayerStructure {
    /// Builds a structure for a layer of `kind`.
    ///
    /// `activation` is the activation function of the layer; `input_activation` is applied to
    /// the input when it is assigned.
    pub fn new(
        kind: NeuraLayerKind,
        input_size: usize,
        output_size: usize,
        activation: Option<Box<dyn NeuraActivation>>,
        input_activation: Option<Box<dyn NeuraActivation>>,
    ) -> Self {
        let input = NeuraLayerInput::new(input_size, input_activation);

        let arch = match kind {
            NeuraLayerKind::Feedforward => NeuraArchLayer::Feedforward(
                NeuraFeedforwardLayer::new(input, output_size, activation),
            ),
            NeuraLayerKind::SimpleRecurrent => NeuraArchLayer::SimpleRecurrent(
                NeuraSimpleRecurrentLayer::new(input, output_size, activation),
            ),
            NeuraLayerKind::Cfn => {
                NeuraArchLayer::Cfn(NeuraCfnLayer::new(input, output_size, activation))
            }
            NeuraLayerKind::Gru => {
                NeuraArchLayer::Gru(NeuraGruLayer::new(input, output_size, activation))
            }
            NeuraLayerKind::Ran => {
                NeuraArchLayer::Ran(NeuraRanLayer::new(input, output_size, activation))
            }
        };

        Self {
            arch,
            state: NeuraLayerState::Uninitialized,
        }
    }

    pub fn kind(&self) -> NeuraLayerKind {
        match self.arch {
            NeuraArchLayer::Feedforward(_) => NeuraLayerKind::Feedforward,
            NeuraArchLayer::SimpleRecurrent(_) => NeuraLayerKind::SimpleRecurrent,
            NeuraArchLayer::Cfn(_) => NeuraLayerKind::Cfn,
            NeuraArchLayer::Gru(_) => NeuraLayerKind::Gru,
            NeuraArchLayer::Ran(_) => NeuraLayerKind::Ran,
        }
    }

    #[inline(always)]
    pub fn state(&self) -> NeuraLayerState {
        self.state
    }

    /// Returns the architecture-specific layer, if it is of type `L`.
    pub fn downcast<L: NeuraLayer>(&self) -> Option<&L> {
        L::from_arch(&self.arch)
    }

    pub fn input(&self) -> &NeuraLayerInput {
        dispatch!(&self.arch, layer => layer.input())
    }

    pub fn output(&self) -> &NeuraActivationUnit {
        dispatch!(&self.arch, layer => layer.output())
    }

    /// The errors of the input; only set after a backward pass that propagated to the input.
    pub fn input_errors(&self) -> Option<&DVector<f64>> {
        self.input().errors.as_ref()
    }

    pub fn forward(
        &mut self,
        input: NeuraInput,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        self.forward_with_dropout(input, None, params, context)
    }

    /// Same as [`Self::forward`], dropping the values of the input selected by `dropout`.
    /// The errors propagated to the input go through the same mask.
    pub fn forward_with_dropout(
        &mut self,
        input: NeuraInput,
        dropout: Option<NeuraDropoutMask>,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
    ) -> NeuraResult<()> {
        self.check_params(params)?;

        dispatch!(&mut self.arch, layer => {
            let input_unit = layer.input_mut();
            input_unit.assign(input)?;
            if let Some(mask) = dropout {
                input_unit.apply_dropout(mask)?;
            }

            layer.forward(params, context)?;
        });

        self.state = NeuraLayerState::Forwarded;
        Ok(())
    }

    /// Sets the output errors, to be done before each backward.
    pub fn set_output_errors(&mut self, errors: &DVector<f64>) -> NeuraResult<()> {
        dispatch!(&mut self.arch, layer => layer.output_mut().set_errors(errors))
    }

    pub fn backward(
        &mut self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        params_errors: &mut NeuraLayerParams<NeuraErrorsArray>,
        context: &NeuraContextWindow,
        propagate_to_input: bool,
    ) -> NeuraResult<()> {
        if self.state != NeuraLayerState::Forwarded {
            return Err(NeuraErr::InvalidOperation(
                "backward can only be called once after a forward",
            ));
        }
        if let Some(next) = context.next_structure() {
            if next.state != NeuraLayerState::Backwarded {
                return Err(NeuraErr::InvalidOperation(
                    "the next state must be backwarded first",
                ));
            }
        }

        self.check_params(params)?;
        params.check_compatible(params_errors)?;

        dispatch!(&mut self.arch, layer => {
            layer.backward(params, params_errors, context, propagate_to_input)?;
        });

        self.state = NeuraLayerState::Backwarded;
        Ok(())
    }

    pub fn relevance(
        &self,
        params: &NeuraLayerParams<NeuraParamsArray>,
        context: &NeuraContextWindow,
        output_relevance: &DVector<f64>,
    ) -> NeuraResult<NeuraLayerRelevance> {
        if self.state == NeuraLayerState::Uninitialized {
            return Err(NeuraErr::InvalidOperation(
                "relevance can only be calculated after a forward",
            ));
        }
        if output_relevance.len() != self.output().len() {
            return Err(NeuraErr::mismatch(
                "output relevance",
                (self.output().len(), 1),
                (output_relevance.len(), 1),
            ));
        }

        self.check_params(params)?;

        dispatch!(&self.arch, layer => layer.relevance(params, context, output_relevance))
    }

    fn check_params(&self, params: &NeuraLayerParams<NeuraParamsArray>) -> NeuraResult<()> {
        if params.kind() != self.kind() {
            return Err(NeuraErr::IncompatibleArchitecture {
                expected: self.kind(),
                got: params.kind(),
            });
        }

        Ok(())
    }
}

macro_rules! impl_from_arch {
    ( $type:ty, $variant:ident ) => {
        const KIND: NeuraLayerKind = NeuraLayerKind::$variant;

        fn from_arch(arch: &NeuraArchLayer) -> Option<&Self> {
            match arch {
                NeuraArchLayer::$variant(layer) => Some(layer),
                _ => None,
            }
        }

        fn input(&self) -> &NeuraLayerInput {
            &self.input
        }

        fn input_mut(&mut self) -> &mut NeuraLayerInput {
            &mut self.input
        }

        fn output(&self) -> &NeuraActivationUnit {
            &self.output
        }

        fn output_mut(&mut self) -> &mut NeuraActivationUnit {
            &mut self.output
        }
    };
}
pub(crate) use impl_from_arch;

/// A gate unit: sigmoid-activated.
pub(crate) fn gate_unit(size: usize) -> NeuraActivationUnit {
    NeuraActivationUnit::new(size, Some(Box::new(Sigmoid)))
}
