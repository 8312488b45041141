//! A network: an input configuration, a stack of layers, and the parameters of every layer.
//!
//! The network only owns the parameters; the per-step layer structures are held by the
//! processors, which borrow the network for the duration of a pass.

use rand::Rng;

use crate::{
    algebra::NeuraParamsArray,
    err::{NeuraErr, NeuraResult},
    layer::{
        NeuraDropoutMask, NeuraInputType, NeuraLayerConfig, NeuraLayerKind, NeuraLayerParams,
        NeuraLayerStructure,
    },
    random::NeuraRandomGenerator,
};

mod params;
pub use params::{NeuraNetworkErrors, NeuraNetworkParams};

pub mod processor;

#[derive(Clone, Debug)]
pub struct NeuraNetwork {
    configs: Vec<NeuraLayerConfig>,
    pub model: NeuraNetworkParams<NeuraParamsArray>,
}

impl NeuraNetwork {
    /// Builds a network with zero-filled parameters from the input configuration followed by
    /// the configuration of each layer.
    pub fn new(configs: Vec<NeuraLayerConfig>) -> NeuraResult<Self> {
        if configs.len() < 2 {
            return Err(NeuraErr::InvalidOperation(
                "a network needs an input configuration and at least one layer",
            ));
        }
        if configs[0].kind.is_some() {
            return Err(NeuraErr::InvalidOperation(
                "the first configuration must describe the input",
            ));
        }
        for config in &configs[1..] {
            if config.kind.is_none() {
                return Err(NeuraErr::InvalidOperation(
                    "only the first configuration can describe the input",
                ));
            }
            if config.input_type != NeuraInputType::Dense {
                return Err(NeuraErr::InvalidOperation(
                    "only the input configuration carries an input type",
                ));
            }
        }
        if configs.iter().any(|config| config.size == 0) {
            return Err(NeuraErr::InvalidOperation("layers cannot be empty"));
        }
        if configs[0].dropout != 0.0 {
            return Err(NeuraErr::InvalidOperation(
                "the dropout belongs to the layer reading the input",
            ));
        }
        if configs
            .iter()
            .any(|config| !(0.0..1.0).contains(&config.dropout))
        {
            return Err(NeuraErr::InvalidOperation(
                "the dropout probability must be in [0, 1)",
            ));
        }
        if configs[0].input_type.is_sparse() && configs[1].dropout > 0.0 {
            return Err(NeuraErr::InvalidOperation(
                "dropout cannot be applied to a sparse input",
            ));
        }

        // the model is dense even with a sparse input, only its gradients are sparse
        let layers = configs
            .windows(2)
            .map(|pair| {
                let kind = pair[1].kind.unwrap_or(NeuraLayerKind::Feedforward);
                NeuraLayerParams::build(kind, pair[0].size, pair[1].size, false)
            })
            .collect();

        log::debug!(
            "Built a network of {} layers: {:?}",
            configs.len() - 1,
            configs[1..]
                .iter()
                .map(|config| (config.kind, config.size))
                .collect::<Vec<_>>()
        );

        Ok(Self {
            configs,
            model: NeuraNetworkParams { layers },
        })
    }

    /// Randomizes the weights of every layer and sets every bias to `bias_init_value`.
    pub fn initialize(
        &mut self,
        generator: &mut impl NeuraRandomGenerator,
        bias_init_value: f64,
    ) -> NeuraResult<()> {
        self.model.initialize(generator, bias_init_value)?;

        log::debug!("Initialized {} layers", self.model.layers.len());
        Ok(())
    }

    #[inline(always)]
    pub fn configs(&self) -> &[NeuraLayerConfig] {
        &self.configs
    }

    #[inline(always)]
    pub fn input_type(&self) -> NeuraInputType {
        self.configs[0].input_type
    }

    #[inline(always)]
    pub fn sparse_input(&self) -> bool {
        self.input_type().is_sparse()
    }

    pub fn input_size(&self) -> usize {
        self.configs[0].size
    }

    pub fn output_size(&self) -> usize {
        self.configs[self.configs.len() - 1].size
    }

    /// The number of layers, the input excluded.
    pub fn depth(&self) -> usize {
        self.model.layers.len()
    }

    /// Whether any layer carries a recurrence.
    pub fn is_recurrent(&self) -> bool {
        self.model.layers.iter().any(|layer| layer.kind().is_recurrent())
    }

    /// A zero-filled gradients container matching the parameters.
    pub fn params_errors_factory(&self) -> NeuraNetworkErrors {
        self.model.errors_factory(self.sparse_input())
    }

    /// A fresh structure of layer `index`, for one time step.
    pub(crate) fn build_structure(&self, index: usize) -> NeuraLayerStructure {
        let config = &self.configs[index + 1];
        let input_activation = if index == 0 {
            self.configs[0].activation.clone()
        } else {
            None
        };

        NeuraLayerStructure::new(
            self.model.layers[index].kind(),
            self.configs[index].size,
            config.size,
            config.activation.clone(),
            input_activation,
        )
    }

    /// Samples which values of the input of layer `index` to drop, if the layer has a dropout.
    pub(crate) fn sample_dropout(
        &self,
        index: usize,
        rng: &mut impl Rng,
    ) -> NeuraResult<Option<NeuraDropoutMask>> {
        let probability = self.configs[index + 1].dropout;
        if probability == 0.0 {
            return Ok(None);
        }

        NeuraDropoutMask::sample(self.configs[index].size, probability, rng).map(Some)
    }

    /// Fresh structures of every layer, for one time step.
    pub(crate) fn build_structures(&self) -> Vec<NeuraLayerStructure> {
        (0..self.depth())
            .map(|index| self.build_structure(index))
            .collect()
    }
}
