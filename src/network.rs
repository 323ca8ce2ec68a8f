//! Feedforward network: an ordered sequence of dense layers
//!
//! The network owns the parameter arena, the per-pass activation snapshot and
//! the loss. It runs the forward pass, walks the layers in reverse for the
//! backward pass, and applies updates so that every physical parameter slot
//! is stepped exactly once per call, however many layers are tied to it.
//!
//! Only one forward pass can be in flight: calling `forward_pass` again
//! before `backward_pass` replaces the recorded activations.

use tracing::{debug, trace};

use crate::error::{check_len, NetworkError, Result};
use crate::layers::{DenseLayer, LayerSpec, ParameterDelta, Parameters, Sharing};
use crate::utils::{Activation, LossKind, SimpleRng};

/// Sequence of dense layers trained by back-propagation.
///
/// # Example
///
/// ```
/// use neural_core::network::Network;
/// use neural_core::utils::{Activation, LossKind};
///
/// let mut net = Network::new(&[2, 3, 1], &[Activation::Tanh, Activation::Identity], &[None, None])
///     .unwrap();
/// net.initialize_random(42);
///
/// let y = net.forward_pass(&[0.5, -0.5]).unwrap();
/// assert_eq!(y.len(), 1);
/// net.backward_pass(&[1.0]).unwrap();
/// net.update(0.1).unwrap();
/// assert_eq!(net.loss_kind(), LossKind::SquaredError);
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<DenseLayer>,
    arena: Vec<Parameters>,
    loss: LossKind,
    activations: Vec<Vec<f64>>,
}

impl Network {
    /// Builds a network from explicit layer descriptions.
    ///
    /// All parameters start at zero; call [`Network::initialize_random`]
    /// before training.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the layers don't connect, a size is zero,
    /// a decay is negative, a shared copy names anything other than an
    /// earlier owning layer, or a softmax layer is misplaced.
    pub fn from_specs(specs: Vec<LayerSpec>, loss: LossKind) -> Result<Self> {
        validate_specs(&specs, loss)?;

        let mut arena = Vec::new();
        let mut layers: Vec<DenseLayer> = Vec::with_capacity(specs.len());
        for spec in specs {
            let slot = match spec.sharing {
                Sharing::Owning => {
                    let (rows, cols) = spec.weight_shape();
                    arena.push(Parameters::zeros(rows, cols, !spec.bias_suppression));
                    arena.len() - 1
                }
                Sharing::Shared { owner, .. } => layers[owner].slot(),
            };
            let index = layers.len();
            let layer = DenseLayer::from_spec(spec, slot);
            layer
                .check_binding(&arena[slot])
                .map_err(|e| NetworkError::InvalidConfig(format!("layer {}: {}", index, e)))?;
            layers.push(layer);
        }

        debug!(
            layers = layers.len(),
            owners = arena.len(),
            loss = ?loss,
            "built network"
        );

        Ok(Self {
            layers,
            arena,
            loss,
            activations: Vec::new(),
        })
    }

    /// Builds a network from a dimension chain: layer `i` maps
    /// `dimensions[i]` to `dimensions[i + 1]`.
    ///
    /// `shared[i]` is `None` for an owning layer or `Some(owner)` to tie layer
    /// `i` to an earlier owning layer. The binding is transposed when the
    /// owner's matrix is the transpose of the requested shape; square shapes
    /// bind untransposed. The loss defaults to squared error.
    pub fn new(
        dimensions: &[usize],
        activations: &[Activation],
        shared: &[Option<usize>],
    ) -> Result<Self> {
        if dimensions.len() < 2 {
            return Err(NetworkError::InvalidConfig(
                "at least two dimensions are required".to_string(),
            ));
        }
        let count = dimensions.len() - 1;
        check_len("activation list", count, activations.len())?;
        check_len("sharing list", count, shared.len())?;

        let mut specs = Vec::with_capacity(count);
        for i in 0..count {
            let mut spec = LayerSpec::new(dimensions[i], dimensions[i + 1], activations[i]);
            if let Some(owner) = shared[i] {
                if owner >= i {
                    return Err(NetworkError::InvalidConfig(format!(
                        "layer {} shares layer {}, which is not an earlier layer",
                        i, owner
                    )));
                }
                let owner_shape = (dimensions[owner + 1], dimensions[owner]);
                let transposed = if owner_shape == (dimensions[i + 1], dimensions[i]) {
                    false
                } else if owner_shape == (dimensions[i], dimensions[i + 1]) {
                    true
                } else {
                    return Err(NetworkError::InvalidConfig(format!(
                        "layer {} ({} -> {}) cannot share layer {} ({} -> {})",
                        i,
                        dimensions[i],
                        dimensions[i + 1],
                        owner,
                        dimensions[owner],
                        dimensions[owner + 1]
                    )));
                };
                spec = spec.shared_with(owner, transposed);
            }
            specs.push(spec);
        }

        Self::from_specs(specs, LossKind::default())
    }

    /// Fills every owned weight matrix from `N(0, 1/sqrt(input_size))` and
    /// zeroes the biases. A negative seed draws a time-based state.
    pub fn initialize_random(&mut self, seed: i64) -> &mut Self {
        let mut rng = SimpleRng::from_seed(seed);
        for layer in self.layers.iter().filter(|layer| layer.is_owner()) {
            let std_dev = 1.0 / (layer.input_size() as f64).sqrt();
            self.arena[layer.slot()].randomize(&mut rng, std_dev);
        }
        debug!(seed, owners = self.arena.len(), "initialized parameters");
        self
    }

    pub fn loss_kind(&self) -> LossKind {
        self.loss
    }

    pub fn set_loss(&mut self, loss: LossKind) -> Result<&mut Self> {
        check_output_pairing(self.output_activation(), loss)?;
        self.loss = loss;
        Ok(self)
    }

    /// Sets the same decay on every layer. Only owners' decay takes effect.
    pub fn set_decay(&mut self, decay: f64) -> &mut Self {
        for layer in &mut self.layers {
            layer.set_decay(decay);
        }
        self
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&DenseLayer> {
        self.layers.get(index)
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    fn output_activation(&self) -> Activation {
        self.layers[self.layers.len() - 1].activation()
    }

    /// Parameters bound to layer `index` (the owner's slot for a shared copy).
    pub fn parameters(&self, index: usize) -> Option<&Parameters> {
        self.layers.get(index).map(|layer| &self.arena[layer.slot()])
    }

    pub fn parameters_mut(&mut self, index: usize) -> Option<&mut Parameters> {
        let slot = self.layers.get(index)?.slot();
        Some(&mut self.arena[slot])
    }

    /// Indices of owning layers, in first-occurrence order. This is the
    /// order `update_with` expects its deltas in.
    pub fn owner_layers(&self) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.is_owner())
            .map(|(i, _)| i)
            .collect()
    }

    /// Total number of physical parameters; tied buffers count once.
    pub fn parameter_count(&self) -> usize {
        self.arena.iter().map(Parameters::parameter_count).sum()
    }

    /// Activations recorded by the last forward pass (index 0 is the input).
    pub fn activations(&self) -> &[Vec<f64>] {
        &self.activations
    }

    /// Runs the network and records every intermediate activation for the
    /// following backward pass.
    pub fn forward_pass(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        check_len("network input", self.input_size(), input.len())?;

        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        for layer in &self.layers {
            let mut output = vec![0.0; layer.output_size()];
            let input = &activations[activations.len() - 1];
            layer.forward(&self.arena[layer.slot()], input, &mut output)?;
            activations.push(output);
        }

        self.activations = activations;
        Ok(self.activations[self.layers.len()].clone())
    }

    /// Runs the network without touching the recorded activations.
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        check_len("network input", self.input_size(), input.len())?;

        let mut current = input.to_vec();
        for layer in &self.layers {
            let mut output = vec![0.0; layer.output_size()];
            layer.forward(&self.arena[layer.slot()], &current, &mut output)?;
            current = output;
        }
        Ok(current)
    }

    /// Loss of the network's output for `input` against `desired`.
    pub fn loss(&self, input: &[f64], desired: &[f64]) -> Result<f64> {
        let output = self.evaluate(input)?;
        self.loss.value(&output, desired)
    }

    /// Back-propagates the loss gradient of the last forward pass and adds
    /// every layer's contribution to its bound gradient accumulators.
    pub fn backward_pass(&mut self, desired: &[f64]) -> Result<()> {
        if self.activations.len() != self.layers.len() + 1 {
            return Err(NetworkError::MissingForwardPass);
        }
        check_len("desired output", self.output_size(), desired.len())?;

        let mut error = vec![0.0; self.output_size()];
        self.loss
            .gradient(&self.activations[self.layers.len()], desired, &mut error)?;

        for (i, layer) in self.layers.iter().enumerate().rev() {
            layer.backward(&mut error, &self.activations[i + 1])?;
            let mut upstream = vec![0.0; layer.input_size()];
            layer.accumulate_gradient(
                &mut self.arena[layer.slot()],
                &error,
                &self.activations[i],
                &mut upstream,
            )?;
            error = upstream;
        }
        Ok(())
    }

    fn owner_index(index: usize, layer: &DenseLayer) -> usize {
        match layer.sharing() {
            Sharing::Owning => index,
            Sharing::Shared { owner, .. } => owner,
        }
    }

    /// Gradient-descent step on every slot, each exactly once, consuming the
    /// accumulated gradients.
    pub fn update(&mut self, learning_rate: f64) -> Result<()> {
        let mut visited = vec![false; self.arena.len()];
        for (i, layer) in self.layers.iter().enumerate() {
            let slot = layer.slot();
            if visited[slot] {
                continue;
            }
            visited[slot] = true;
            let owner = &self.layers[Self::owner_index(i, layer)];
            owner.update(&mut self.arena[slot], learning_rate)?;
        }
        trace!(learning_rate, owners = visited.len(), "applied gradient step");
        Ok(())
    }

    /// Applies one externally computed delta per owning layer, in
    /// first-occurrence order. Nothing is applied unless every delta fits.
    pub fn update_with(&mut self, deltas: &[ParameterDelta]) -> Result<()> {
        if deltas.len() != self.arena.len() {
            return Err(NetworkError::DeltaCount {
                expected: self.arena.len(),
                actual: deltas.len(),
            });
        }

        let owners = self.owner_layers();
        for (&owner, delta) in owners.iter().zip(deltas) {
            let params = &self.arena[self.layers[owner].slot()];
            check_len("weight delta", params.weights().len(), delta.weights.len())?;
            if params.has_bias() {
                check_len("bias delta", params.biases().len(), delta.biases.len())?;
            }
        }

        let mut visited = vec![false; self.arena.len()];
        let mut next = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            let slot = layer.slot();
            if visited[slot] {
                continue;
            }
            visited[slot] = true;
            let owner = &self.layers[Self::owner_index(i, layer)];
            owner.apply_delta(&mut self.arena[slot], &deltas[next])?;
            next += 1;
        }
        trace!(owners = next, "applied external deltas");
        Ok(())
    }

    /// Zeroes every slot's gradient accumulators once.
    pub fn clear_gradient(&mut self) {
        for layer in self.layers.iter().filter(|layer| layer.is_owner()) {
            layer.clear_gradient(&mut self.arena[layer.slot()]);
        }
    }
}

fn validate_specs(specs: &[LayerSpec], loss: LossKind) -> Result<()> {
    if specs.is_empty() {
        return Err(NetworkError::InvalidConfig(
            "network must have at least one layer".to_string(),
        ));
    }

    for (i, spec) in specs.iter().enumerate() {
        if spec.input_size == 0 || spec.output_size == 0 {
            return Err(NetworkError::InvalidConfig(format!(
                "layer {}: sizes must be greater than 0",
                i
            )));
        }
        if spec.decay.is_nan() || spec.decay < 0.0 {
            return Err(NetworkError::InvalidConfig(format!(
                "layer {}: decay must be non-negative",
                i
            )));
        }
        if spec.activation == Activation::Softmax {
            if i + 1 != specs.len() {
                return Err(NetworkError::InvalidConfig(format!(
                    "layer {}: softmax is only allowed on the final layer",
                    i
                )));
            }
        }
        if let Sharing::Shared { owner, .. } = spec.sharing {
            if owner >= i {
                return Err(NetworkError::InvalidConfig(format!(
                    "layer {}: shared_with {} must name an earlier layer",
                    i, owner
                )));
            }
            let owner_spec = &specs[owner];
            if owner_spec.is_shared() {
                return Err(NetworkError::InvalidConfig(format!(
                    "layer {}: layer {} is itself a shared copy",
                    i, owner
                )));
            }
            if owner_spec.bias_suppression != spec.bias_suppression {
                return Err(NetworkError::InvalidConfig(format!(
                    "layer {}: bias suppression differs from owner layer {}",
                    i, owner
                )));
            }
        }
    }

    check_output_pairing(specs[specs.len() - 1].activation, loss)?;

    for i in 1..specs.len() {
        if specs[i - 1].output_size != specs[i].input_size {
            return Err(NetworkError::InvalidConfig(format!(
                "layer connection mismatch: layer {} output size ({}) does not match layer {} input size ({})",
                i - 1,
                specs[i - 1].output_size,
                i,
                specs[i].input_size
            )));
        }
    }
    Ok(())
}

/// Softmax and cross-entropy only come as a pair: the cross-entropy gradient
/// is taken w.r.t. the softmax input.
fn check_output_pairing(activation: Activation, loss: LossKind) -> Result<()> {
    let softmax = activation == Activation::Softmax;
    let cross_entropy = loss == LossKind::CrossEntropy;
    if softmax && !cross_entropy {
        return Err(NetworkError::InvalidConfig(
            "a softmax output layer requires cross-entropy loss".to_string(),
        ));
    }
    if cross_entropy && !softmax {
        return Err(NetworkError::InvalidConfig(
            "cross-entropy loss requires a softmax output layer".to_string(),
        ));
    }
    Ok(())
}
