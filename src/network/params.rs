use crate::{
    algebra::{NeuraArray, NeuraErrorsArray, NeuraParamsArray, NeuraVectorSpace},
    err::{NeuraErr, NeuraResult},
    layer::NeuraLayerParams,
    random::NeuraRandomGenerator,
};

/// The parameters of every layer of a network, in layer order.
#[derive(Clone, Debug)]
pub struct NeuraNetworkParams<A> {
    pub layers: Vec<NeuraLayerParams<A>>,
}

/// The gradients of the parameters of a network.
pub type NeuraNetworkErrors = NeuraNetworkParams<NeuraErrorsArray>;

impl<A: NeuraArray> NeuraNetworkParams<A> {
    /// A zero-filled gradients container with the same architecture.
    ///
    /// With `sparse_input`, the gradients of the weights reading the network input are sparse.
    pub fn errors_factory(&self, sparse_input: bool) -> NeuraNetworkErrors {
        NeuraNetworkParams {
            layers: self
                .layers
                .iter()
                .enumerate()
                .map(|(index, layer)| {
                    let (output_size, input_size) = layer.arrays()[0].1.shape();
                    NeuraLayerParams::build(
                        layer.kind(),
                        input_size,
                        output_size,
                        sparse_input && index == 0,
                    )
                })
                .collect(),
        }
    }

    /// Every array of every layer, layer after layer, each layer in its fixed order.
    pub fn arrays(&self) -> Vec<&A> {
        self.layers
            .iter()
            .flat_map(|layer| layer.arrays().into_iter().map(|(_, array)| array))
            .collect()
    }

    /// Same order as [`Self::arrays`].
    pub fn arrays_mut(&mut self) -> Vec<&mut A> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.arrays_mut().into_iter().map(|(_, array)| array))
            .collect()
    }

    pub fn check_compatible<B: NeuraArray>(&self, other: &NeuraNetworkParams<B>) -> NeuraResult<()> {
        if self.layers.len() != other.layers.len() {
            return Err(NeuraErr::mismatch(
                "network layers",
                (self.layers.len(), 1),
                (other.layers.len(), 1),
            ));
        }

        self.layers
            .iter()
            .zip(other.layers.iter())
            .try_for_each(|(left, right)| left.check_compatible(right))
    }
}

impl NeuraNetworkParams<NeuraParamsArray> {
    pub fn initialize(
        &mut self,
        generator: &mut impl NeuraRandomGenerator,
        bias_init_value: f64,
    ) -> NeuraResult<()> {
        for layer in self.layers.iter_mut() {
            layer.initialize(generator, bias_init_value)?;
        }

        Ok(())
    }
}

impl NeuraNetworkErrors {
    pub fn set_zero(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.set_zero();
        }
    }
}

impl NeuraVectorSpace for NeuraNetworkErrors {
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()> {
        self.layers.add_assign(&other.layers)
    }

    fn mul_assign(&mut self, by: f64) {
        self.layers.mul_assign(by);
    }

    fn norm_squared(&self) -> f64 {
        self.layers.norm_squared()
    }
}
