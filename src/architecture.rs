//! Architecture configuration structures
//!
//! This module provides configuration structures for defining networks via
//! JSON files, including weight tying, so architectures can be changed
//! without code changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NetworkError, Result};
use crate::layers::{LayerSpec, Sharing};
use crate::network::Network;
use crate::utils::{Activation, LossKind};

/// Configuration for a single dense layer.
///
/// `shared_with` ties the layer to an earlier owning layer; `transposed`
/// reads the owner's matrix transposed and only applies to shared layers.
///
/// # Example
///
/// ```json
/// {
///   "input_size": 64,
///   "output_size": 16,
///   "activation": "sigmoid",
///   "decay": 0.0001,
///   "bias_suppression": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub input_size: usize,
    pub output_size: usize,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub decay: f64,
    #[serde(default)]
    pub bias_suppression: bool,
    #[serde(default)]
    pub shared_with: Option<usize>,
    #[serde(default)]
    pub transposed: bool,
}

impl LayerConfig {
    fn to_spec(&self) -> LayerSpec {
        let mut spec = LayerSpec::new(self.input_size, self.output_size, self.activation)
            .with_decay(self.decay);
        spec.bias_suppression = self.bias_suppression;
        if let Some(owner) = self.shared_with {
            spec = spec.shared_with(owner, self.transposed);
        }
        spec
    }
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "loss": "squared_error",
///   "seed": 42,
///   "layers": [
///     { "input_size": 64, "output_size": 16, "activation": "sigmoid", "bias_suppression": true },
///     { "input_size": 16, "output_size": 64, "activation": "sigmoid", "bias_suppression": true,
///       "shared_with": 0, "transposed": true }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    #[serde(default)]
    pub loss: LossKind,
    /// Initialization seed; absent or negative means non-deterministic.
    #[serde(default)]
    pub seed: Option<i64>,
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use neural_core::architecture::load_architecture;
///
/// let arch = load_architecture("config/autoencoder.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    info!(
        path = %path.as_ref().display(),
        layers = config.layers.len(),
        "loaded architecture"
    );
    Ok(config)
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Sizes are positive and decay is non-negative
/// - `transposed` is only set on shared layers
/// - Layer connections are valid (output size of layer i matches input size of layer i+1)
///
/// Sharing and softmax placement are checked again when the network is built.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    if config.layers.is_empty() {
        return Err(NetworkError::InvalidConfig(
            "Architecture must have at least one layer".to_string(),
        ));
    }

    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
    }

    for i in 0..config.layers.len() - 1 {
        let current_output = config.layers[i].output_size;
        let next_input = config.layers[i + 1].input_size;
        if current_output != next_input {
            return Err(NetworkError::InvalidConfig(format!(
                "Layer connection mismatch: Layer {} output size ({}) does not match Layer {} input size ({})",
                i,
                current_output,
                i + 1,
                next_input
            )));
        }
    }

    Ok(())
}

fn validate_layer(layer: &LayerConfig, index: usize) -> Result<()> {
    if layer.input_size == 0 {
        return Err(NetworkError::InvalidConfig(format!(
            "Layer {}: input_size must be greater than 0",
            index
        )));
    }
    if layer.output_size == 0 {
        return Err(NetworkError::InvalidConfig(format!(
            "Layer {}: output_size must be greater than 0",
            index
        )));
    }
    if layer.decay.is_nan() || layer.decay < 0.0 {
        return Err(NetworkError::InvalidConfig(format!(
            "Layer {}: decay must be non-negative",
            index
        )));
    }
    if layer.transposed && layer.shared_with.is_none() {
        return Err(NetworkError::InvalidConfig(format!(
            "Layer {}: 'transposed' requires 'shared_with'",
            index
        )));
    }
    if let Some(owner) = layer.shared_with {
        if owner >= index {
            return Err(NetworkError::InvalidConfig(format!(
                "Layer {}: shared_with ({}) must reference an earlier layer",
                index, owner
            )));
        }
    }
    Ok(())
}

/// Builds and initializes a network from a validated configuration.
pub fn build_network(config: &ArchitectureConfig) -> Result<Network> {
    validate_architecture(config)?;
    let specs = config.layers.iter().map(LayerConfig::to_spec).collect();
    let mut network = Network::from_specs(specs, config.loss)?;
    network.initialize_random(config.seed.unwrap_or(-1));
    Ok(network)
}

/// Describes an existing network as a configuration (parameters excluded).
pub fn describe_network(network: &Network) -> ArchitectureConfig {
    let layers = network
        .layers()
        .iter()
        .map(|layer| {
            let (shared_with, transposed) = match layer.sharing() {
                Sharing::Owning => (None, false),
                Sharing::Shared { owner, transposed } => (Some(owner), transposed),
            };
            LayerConfig {
                input_size: layer.input_size(),
                output_size: layer.output_size(),
                activation: layer.activation(),
                decay: layer.decay(),
                bias_suppression: !layer.has_bias(),
                shared_with,
                transposed,
            }
        })
        .collect();

    ArchitectureConfig {
        loss: network.loss_kind(),
        seed: None,
        layers,
    }
}
