use crate::{
    algebra::{NeuraArray, NeuraErrorsArray, NeuraParamsArray, NeuraVectorSpace},
    err::{NeuraErr, NeuraResult},
    random::NeuraRandomGenerator,
};

use super::NeuraLayerKind;

/// The weights and biases of a non-recurrent unit.
#[derive(Clone, Debug)]
pub struct NeuraParamsUnit<A> {
    pub weights: A,
    pub biases: A,
}

impl<A: NeuraArray> NeuraParamsUnit<A> {
    pub fn build(input_size: usize, output_size: usize, sparse_input: bool) -> Self {
        Self {
            weights: A::zeros_like(output_size, input_size, sparse_input),
            biases: A::zeros_like(output_size, 1, false),
        }
    }
}

/// The weights, biases and recurrent weights of a unit that also reads the previous output.
#[derive(Clone, Debug)]
pub struct NeuraRecurrentParamsUnit<A> {
    pub weights: A,
    pub biases: A,
    pub recurrent_weights: A,
}

impl<A: NeuraArray> NeuraRecurrentParamsUnit<A> {
    pub fn build(input_size: usize, output_size: usize, sparse_input: bool) -> Self {
        Self {
            weights: A::zeros_like(output_size, input_size, sparse_input),
            biases: A::zeros_like(output_size, 1, false),
            recurrent_weights: A::zeros_like(output_size, output_size, false),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NeuraRanParams<A> {
    pub input_gate: NeuraRecurrentParamsUnit<A>,
    pub forget_gate: NeuraRecurrentParamsUnit<A>,
    pub candidate: NeuraParamsUnit<A>,
}

#[derive(Clone, Debug)]
pub struct NeuraCfnParams<A> {
    pub input_gate: NeuraRecurrentParamsUnit<A>,
    pub forget_gate: NeuraRecurrentParamsUnit<A>,
    /// The candidate has no biases
    pub candidate_weights: A,
}

#[derive(Clone, Debug)]
pub struct NeuraGruParams<A> {
    pub reset_gate: NeuraRecurrentParamsUnit<A>,
    pub partition_gate: NeuraRecurrentParamsUnit<A>,
    pub candidate: NeuraRecurrentParamsUnit<A>,
}

#[derive(Clone, Debug)]
pub enum NeuraArchParams<A> {
    Feedforward(NeuraParamsUnit<A>),
    SimpleRecurrent(NeuraRecurrentParamsUnit<A>),
    Cfn(NeuraCfnParams<A>),
    Gru(NeuraGruParams<A>),
    Ran(NeuraRanParams<A>),
}

/// What an array of a parameters container is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeuraArrayRole {
    Weights,
    Biases,
    RecurrentWeights,
}

/// The parameters of one layer, shared by every time step.
///
/// `A` is [`NeuraParamsArray`] for the learnable parameters and [`NeuraErrorsArray`] for their gradients.
/// Arrays are always visited in the same order: gates first, then the candidate.
#[derive(Clone, Debug)]
pub struct NeuraLayerParams<A> {
    pub arch: NeuraArchParams<A>,
    sparse_input: bool,
}

macro_rules! arch_accessor {
    ( $name:ident, $name_mut:ident, $variant:ident, $type:ty ) => {
        pub fn $name(&self) -> NeuraResult<&$type> {
            match &self.arch {
                NeuraArchParams::$variant(params) => Ok(params),
                _ => Err(NeuraErr::IncompatibleArchitecture {
                    expected: NeuraLayerKind::$variant,
                    got: self.kind(),
                }),
            }
        }

        pub fn $name_mut(&mut self) -> NeuraResult<&mut $type> {
            let got = self.kind();
            match &mut self.arch {
                NeuraArchParams::$variant(params) => Ok(params),
                _ => Err(NeuraErr::IncompatibleArchitecture {
                    expected: NeuraLayerKind::$variant,
                    got,
                }),
            }
        }
    };
}

impl<A: NeuraArray> NeuraLayerParams<A> {
    /// Builds a zero-filled container. The weights connected to the input are sparse when
    /// `sparse_input` is set and `A` has a sparse form.
    pub fn build(
        kind: NeuraLayerKind,
        input_size: usize,
        output_size: usize,
        sparse_input: bool,
    ) -> Self {
        let arch = match kind {
            NeuraLayerKind::Feedforward => NeuraArchParams::Feedforward(NeuraParamsUnit::build(
                input_size,
                output_size,
                sparse_input,
            )),
            NeuraLayerKind::SimpleRecurrent => NeuraArchParams::SimpleRecurrent(
                NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
            ),
            NeuraLayerKind::Cfn => NeuraArchParams::Cfn(NeuraCfnParams {
                input_gate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
                forget_gate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
                candidate_weights: A::zeros_like(output_size, input_size, sparse_input),
            }),
            NeuraLayerKind::Gru => NeuraArchParams::Gru(NeuraGruParams {
                reset_gate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
                partition_gate: NeuraRecurrentParamsUnit::build(
                    input_size,
                    output_size,
                    sparse_input,
                ),
                candidate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
            }),
            NeuraLayerKind::Ran => NeuraArchParams::Ran(NeuraRanParams {
                input_gate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
                forget_gate: NeuraRecurrentParamsUnit::build(input_size, output_size, sparse_input),
                candidate: NeuraParamsUnit::build(input_size, output_size, sparse_input),
            }),
        };

        Self { arch, sparse_input }
    }

    pub fn kind(&self) -> NeuraLayerKind {
        match self.arch {
            NeuraArchParams::Feedforward(_) => NeuraLayerKind::Feedforward,
            NeuraArchParams::SimpleRecurrent(_) => NeuraLayerKind::SimpleRecurrent,
            NeuraArchParams::Cfn(_) => NeuraLayerKind::Cfn,
            NeuraArchParams::Gru(_) => NeuraLayerKind::Gru,
            NeuraArchParams::Ran(_) => NeuraLayerKind::Ran,
        }
    }

    #[inline(always)]
    pub fn sparse_input(&self) -> bool {
        self.sparse_input
    }

    arch_accessor!(feedforward, feedforward_mut, Feedforward, NeuraParamsUnit<A>);
    arch_accessor!(
        simple_recurrent,
        simple_recurrent_mut,
        SimpleRecurrent,
        NeuraRecurrentParamsUnit<A>
    );
    arch_accessor!(cfn, cfn_mut, Cfn, NeuraCfnParams<A>);
    arch_accessor!(gru, gru_mut, Gru, NeuraGruParams<A>);
    arch_accessor!(ran, ran_mut, Ran, NeuraRanParams<A>);

    pub fn arrays(&self) -> Vec<(NeuraArrayRole, &A)> {
        use NeuraArrayRole::*;

        fn unit<A>(unit: &NeuraParamsUnit<A>) -> [(NeuraArrayRole, &A); 2] {
            [(Weights, &unit.weights), (Biases, &unit.biases)]
        }
        fn recurrent<A>(unit: &NeuraRecurrentParamsUnit<A>) -> [(NeuraArrayRole, &A); 3] {
            [
                (Weights, &unit.weights),
                (Biases, &unit.biases),
                (RecurrentWeights, &unit.recurrent_weights),
            ]
        }

        match &self.arch {
            NeuraArchParams::Feedforward(params) => unit(params).to_vec(),
            NeuraArchParams::SimpleRecurrent(params) => recurrent(params).to_vec(),
            NeuraArchParams::Cfn(params) => {
                let mut res = recurrent(&params.input_gate).to_vec();
                res.extend(recurrent(&params.forget_gate));
                res.push((Weights, &params.candidate_weights));
                res
            }
            NeuraArchParams::Gru(params) => {
                let mut res = recurrent(&params.reset_gate).to_vec();
                res.extend(recurrent(&params.partition_gate));
                res.extend(recurrent(&params.candidate));
                res
            }
            NeuraArchParams::Ran(params) => {
                let mut res = recurrent(&params.input_gate).to_vec();
                res.extend(recurrent(&params.forget_gate));
                res.extend(unit(&params.candidate));
                res
            }
        }
    }

    /// Same order as [`Self::arrays`].
    pub fn arrays_mut(&mut self) -> Vec<(NeuraArrayRole, &mut A)> {
        use NeuraArrayRole::*;

        fn unit<A>(unit: &mut NeuraParamsUnit<A>) -> [(NeuraArrayRole, &mut A); 2] {
            [(Weights, &mut unit.weights), (Biases, &mut unit.biases)]
        }
        fn recurrent<A>(unit: &mut NeuraRecurrentParamsUnit<A>) -> [(NeuraArrayRole, &mut A); 3] {
            [
                (Weights, &mut unit.weights),
                (Biases, &mut unit.biases),
                (RecurrentWeights, &mut unit.recurrent_weights),
            ]
        }

        match &mut self.arch {
            NeuraArchParams::Feedforward(params) => Vec::from(unit(params)),
            NeuraArchParams::SimpleRecurrent(params) => Vec::from(recurrent(params)),
            NeuraArchParams::Cfn(params) => {
                let mut res = Vec::from(recurrent(&mut params.input_gate));
                res.extend(recurrent(&mut params.forget_gate));
                res.push((Weights, &mut params.candidate_weights));
                res
            }
            NeuraArchParams::Gru(params) => {
                let mut res = Vec::from(recurrent(&mut params.reset_gate));
                res.extend(recurrent(&mut params.partition_gate));
                res.extend(recurrent(&mut params.candidate));
                res
            }
            NeuraArchParams::Ran(params) => {
                let mut res = Vec::from(recurrent(&mut params.input_gate));
                res.extend(recurrent(&mut params.forget_gate));
                res.extend(unit(&mut params.candidate));
                res
            }
        }
    }

    /// Checks that `other` has the same architecture and the same array shapes.
    pub fn check_compatible<B: NeuraArray>(&self, other: &NeuraLayerParams<B>) -> NeuraResult<()> {
        if self.kind() != other.kind() {
            return Err(NeuraErr::IncompatibleArchitecture {
                expected: self.kind(),
                got: other.kind(),
            });
        }

        for ((_, left), (_, right)) in self.arrays().into_iter().zip(other.arrays()) {
            if left.shape() != right.shape() {
                return Err(NeuraErr::mismatch(
                    "layer parameters",
                    left.shape(),
                    right.shape(),
                ));
            }
        }

        Ok(())
    }
}

impl NeuraLayerParams<NeuraParamsArray> {
    /// Randomizes every weight array and sets every bias to `bias_init_value`.
    ///
    /// Fails for layers reading a sparse input, whose weights cannot be randomized.
    pub fn initialize(
        &mut self,
        generator: &mut impl NeuraRandomGenerator,
        bias_init_value: f64,
    ) -> NeuraResult<()> {
        if self.sparse_input {
            return Err(NeuraErr::InvalidOperation(
                "cannot randomize the weights of a layer with a sparse input",
            ));
        }

        for (role, array) in self.arrays_mut() {
            match role {
                NeuraArrayRole::Biases => array.values.fill(bias_init_value),
                NeuraArrayRole::Weights | NeuraArrayRole::RecurrentWeights => {
                    array.values.apply(|value| *value = generator.next_value());
                }
            }
        }

        Ok(())
    }
}

impl NeuraLayerParams<NeuraErrorsArray> {
    pub fn set_zero(&mut self) {
        for (_, array) in self.arrays_mut() {
            array.set_zero();
        }
    }
}

impl NeuraVectorSpace for NeuraLayerParams<NeuraErrorsArray> {
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()> {
        self.check_compatible(other)?;

        self.arrays_mut()
            .into_iter()
            .zip(other.arrays())
            .try_for_each(|((_, left), (_, right))| left.add_assign(right))
    }

    fn mul_assign(&mut self, by: f64) {
        for (_, array) in self.arrays_mut() {
            array.mul_assign(by);
        }
    }

    fn norm_squared(&self) -> f64 {
        self.arrays()
            .into_iter()
            .map(|(_, array)| array.norm_squared())
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::NeuraFixedRangeRandom;

    #[test]
    fn test_array_order() {
        let params = NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Gru, 3, 2, false);
        let roles: Vec<_> = params.arrays().into_iter().map(|(role, _)| role).collect();

        assert_eq!(roles.len(), 9);
        assert_eq!(roles[2], NeuraArrayRole::RecurrentWeights);

        let params = NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Cfn, 3, 2, false);
        let shapes: Vec<_> = params.arrays().into_iter().map(|(_, a)| a.shape()).collect();
        assert_eq!(
            shapes,
            vec![(2, 3), (2, 1), (2, 2), (2, 3), (2, 1), (2, 2), (2, 3)]
        );
    }

    #[test]
    fn test_initialize() {
        let mut params =
            NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Ran, 4, 3, false);
        let mut generator = NeuraFixedRangeRandom::seeded(0.1, 1);

        params.initialize(&mut generator, 0.5).unwrap();

        for (role, array) in params.arrays() {
            if role == NeuraArrayRole::Biases {
                assert!(array.values.iter().all(|&b| b == 0.5));
            } else {
                assert!(array.values.iter().all(|&w| w.abs() <= 0.1));
            }
        }
    }

    #[test]
    fn test_initialize_sparse_input() {
        let mut params =
            NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Feedforward, 4, 3, true);

        assert_eq!(
            params.initialize(&mut NeuraFixedRangeRandom::default(), 0.0),
            Err(NeuraErr::InvalidOperation(
                "cannot randomize the weights of a layer with a sparse input"
            ))
        );
    }

    #[test]
    fn test_sparse_errors() {
        let errors = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Ran, 4, 3, true);

        let sparse: Vec<_> = errors
            .arrays()
            .into_iter()
            .map(|(role, array)| (role, array.is_sparse()))
            .collect();

        for (role, is_sparse) in sparse {
            assert_eq!(role == NeuraArrayRole::Weights, is_sparse);
        }
    }

    #[test]
    fn test_compatibility() {
        let params = NeuraLayerParams::<NeuraParamsArray>::build(NeuraLayerKind::Gru, 3, 2, false);
        let errors = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Gru, 3, 2, false);
        let other = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Ran, 3, 2, false);
        let wider = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Gru, 4, 2, false);

        assert!(params.check_compatible(&errors).is_ok());
        assert!(matches!(
            params.check_compatible(&other),
            Err(NeuraErr::IncompatibleArchitecture { .. })
        ));
        assert!(matches!(
            params.check_compatible(&wider),
            Err(NeuraErr::DimensionsMismatch(_))
        ));
        assert!(params.ran().is_err());
        assert!(params.gru().is_ok());
    }

    #[test]
    fn test_add_errors() {
        let mut errors = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Cfn, 3, 2, true);
        let dense = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Cfn, 3, 2, false);
        let other = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Ran, 3, 2, false);
        let wider = NeuraLayerParams::<NeuraErrorsArray>::build(NeuraLayerKind::Cfn, 4, 2, false);

        assert!(errors.add_assign(&dense).is_ok());
        assert!(matches!(
            errors.add_assign(&other),
            Err(NeuraErr::IncompatibleArchitecture { .. })
        ));
        assert!(matches!(
            errors.add_assign(&wider),
            Err(NeuraErr::DimensionsMismatch(_))
        ));
    }
}
