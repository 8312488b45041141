pub mod algebra;
pub mod derivable;
pub mod err;
pub mod layer;
pub mod network;
pub mod optimize;
pub mod random;
pub mod train;

mod utils;

pub mod prelude {
    pub use crate::algebra::{
        NeuraErrorsArray, NeuraInput, NeuraParamsArray, NeuraRelevance, NeuraSparseBinary,
        NeuraSparseMatrix, NeuraVectorSpace,
    };
    pub use crate::derivable::activation::{LeakyRelu, Linear, Relu, Sigmoid, Softsign, Tanh};
    pub use crate::derivable::loss::Euclidean;
    pub use crate::derivable::{NeuraActivation, NeuraDerivable, NeuraLoss};
    pub use crate::err::{NeuraErr, NeuraResult};
    pub use crate::layer::{
        NeuraContextWindow, NeuraInputType, NeuraLayerConfig, NeuraLayerKind, NeuraLayerStructure,
    };
    pub use crate::network::processor::{NeuraFeedforwardProcessor, NeuraRecurrentProcessor};
    pub use crate::network::{NeuraNetwork, NeuraNetworkErrors, NeuraNetworkParams};
    pub use crate::optimize::update::{
        NeuraAdaGrad, NeuraAdam, NeuraLearningRate, NeuraMomentum, NeuraNesterovMomentum,
        NeuraUpdateMethod,
    };
    pub use crate::optimize::{NeuraParamsErrorsAccumulator, NeuraParamsOptimizer};
    pub use crate::random::{NeuraFixedRangeRandom, NeuraGaussianRandom, NeuraRandomGenerator};
    pub use crate::train::NeuraBatchedTrainer;
}
