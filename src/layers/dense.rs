//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer that performs the transformation
//! `y = act(W·x + b)` on a single input vector. A layer either owns a
//! parameter slot or is a shared copy of an earlier owning layer, optionally
//! reading the owner's weight matrix transposed (`y = act(Wᵗ·x + b)`), which
//! is how encoder/decoder weight tying is expressed.
//!
//! The layer never holds its parameters directly; every operation receives
//! the slot it is bound to from the network's arena. Gradients always
//! accumulate into that slot, so all layers tied to one owner sum their
//! contributions before the single update of the owner.

use serde::{Deserialize, Serialize};

use crate::error::{check_len, NetworkError, Result};
use crate::layers::Parameters;
use crate::utils::Activation;

/// Parameter ownership of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sharing {
    /// The layer owns its weights, biases and gradient accumulators.
    #[default]
    Owning,
    /// The layer reuses the slot of layer `owner`.
    Shared { owner: usize, transposed: bool },
}

/// Construction-time description of a layer.
///
/// # Example
///
/// ```
/// use neural_core::layers::LayerSpec;
/// use neural_core::utils::Activation;
///
/// let encoder = LayerSpec::new(8, 3, Activation::Sigmoid).without_bias();
/// let decoder = LayerSpec::new(3, 8, Activation::Sigmoid)
///     .without_bias()
///     .shared_with(0, true);
/// assert!(decoder.is_shared());
/// assert_eq!(encoder.weight_shape(), (3, 8));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
    pub decay: f64,
    pub bias_suppression: bool,
    pub sharing: Sharing,
}

impl LayerSpec {
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        Self {
            input_size,
            output_size,
            activation,
            decay: 0.0,
            bias_suppression: false,
            sharing: Sharing::Owning,
        }
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn without_bias(mut self) -> Self {
        self.bias_suppression = true;
        self
    }

    pub fn shared_with(mut self, owner: usize, transposed: bool) -> Self {
        self.sharing = Sharing::Shared { owner, transposed };
        self
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.sharing, Sharing::Shared { .. })
    }

    pub fn is_transposed(&self) -> bool {
        matches!(
            self.sharing,
            Sharing::Shared {
                transposed: true,
                ..
            }
        )
    }

    /// Shape `(rows, cols)` of the stored matrix this layer reads.
    pub fn weight_shape(&self) -> (usize, usize) {
        if self.is_transposed() {
            (self.input_size, self.output_size)
        } else {
            (self.output_size, self.input_size)
        }
    }
}

/// Externally computed parameter step for one owning layer.
///
/// Applied as `W -= weights` and `b -= biases`; `biases` is ignored when the
/// owner suppresses its bias.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterDelta {
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

/// Dense layer bound to one slot of the parameter arena.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    spec: LayerSpec,
    slot: usize,
}

impl DenseLayer {
    pub(crate) fn from_spec(spec: LayerSpec, slot: usize) -> Self {
        Self { spec, slot }
    }

    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    pub fn input_size(&self) -> usize {
        self.spec.input_size
    }

    pub fn output_size(&self) -> usize {
        self.spec.output_size
    }

    pub fn activation(&self) -> Activation {
        self.spec.activation
    }

    pub fn decay(&self) -> f64 {
        self.spec.decay
    }

    pub fn set_decay(&mut self, decay: f64) -> &mut Self {
        self.spec.decay = decay;
        self
    }

    pub fn has_bias(&self) -> bool {
        !self.spec.bias_suppression
    }

    pub fn sharing(&self) -> Sharing {
        self.spec.sharing
    }

    pub fn is_owner(&self) -> bool {
        !self.spec.is_shared()
    }

    pub fn is_transposed(&self) -> bool {
        self.spec.is_transposed()
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    /// Number of parameters physically owned by this layer (zero for a
    /// shared copy).
    pub fn parameter_count(&self) -> usize {
        if !self.is_owner() {
            return 0;
        }
        let biases = if self.has_bias() { self.output_size() } else { 0 };
        self.input_size() * self.output_size() + biases
    }

    /// Checks that `params` can back this layer: the matrix shape must match
    /// the layer's logical shape after transposition, and the bias must be
    /// present exactly when the layer uses one.
    pub fn check_binding(&self, params: &Parameters) -> Result<()> {
        let (rows, cols) = self.spec.weight_shape();
        check_len("bound weight rows", rows, params.rows())?;
        check_len("bound weight cols", cols, params.cols())?;
        if self.has_bias() != params.has_bias() {
            return Err(NetworkError::InvalidConfig(format!(
                "bias suppression ({}) differs from the bound parameters",
                self.spec.bias_suppression
            )));
        }
        if self.has_bias() {
            check_len("bound bias", self.output_size(), params.biases().len())?;
        }
        Ok(())
    }

    /// Forward propagation: `output = act(W·input + b)`.
    pub fn forward(&self, params: &Parameters, input: &[f64], output: &mut [f64]) -> Result<()> {
        self.check_binding(params)?;
        check_len("layer input", self.input_size(), input.len())?;
        check_len("layer output", self.output_size(), output.len())?;

        let cols = params.cols();
        let weights = params.weights();

        if self.is_transposed() {
            output.fill(0.0);
            for (r, &x) in input.iter().enumerate() {
                let row = &weights[r * cols..(r + 1) * cols];
                for (out, &w) in output.iter_mut().zip(row) {
                    *out += w * x;
                }
            }
        } else {
            for (out, row) in output.iter_mut().zip(weights.chunks_exact(cols)) {
                *out = row.iter().zip(input).map(|(w, x)| w * x).sum();
            }
        }

        if self.has_bias() {
            for (out, &b) in output.iter_mut().zip(params.biases()) {
                *out += b;
            }
        }

        self.spec.activation.apply(output);
        Ok(())
    }

    /// Turns the error w.r.t. this layer's output into the error w.r.t. its
    /// pre-activation sum, in place, using the recorded output.
    pub fn backward(&self, error: &mut [f64], output: &[f64]) -> Result<()> {
        check_len("layer error", self.output_size(), error.len())?;
        check_len("layer activation", self.output_size(), output.len())?;

        let activation = self.spec.activation;
        for (e, &y) in error.iter_mut().zip(output) {
            *e *= activation.derivative_from_output(y);
        }
        Ok(())
    }

    /// Adds this layer's gradient contribution into the bound slot and writes
    /// the error to propagate to the previous layer into `grad_input`.
    pub fn accumulate_gradient(
        &self,
        params: &mut Parameters,
        local_error: &[f64],
        input: &[f64],
        grad_input: &mut [f64],
    ) -> Result<()> {
        self.check_binding(params)?;
        check_len("layer error", self.output_size(), local_error.len())?;
        check_len("layer input", self.input_size(), input.len())?;
        check_len("upstream error", self.input_size(), grad_input.len())?;

        let cols = params.cols();
        grad_input.fill(0.0);

        if self.is_transposed() {
            // stored row r maps to input r, stored col c to output c
            for (r, (&x, upstream)) in input.iter().zip(grad_input.iter_mut()).enumerate() {
                let grads = &mut params.weight_gradients_mut()[r * cols..(r + 1) * cols];
                for (g, &e) in grads.iter_mut().zip(local_error) {
                    *g += e * x;
                }
                let row = &params.weights()[r * cols..(r + 1) * cols];
                *upstream = row.iter().zip(local_error).map(|(w, e)| w * e).sum();
            }
        } else {
            for (r, &e) in local_error.iter().enumerate() {
                let grads = &mut params.weight_gradients_mut()[r * cols..(r + 1) * cols];
                for (g, &x) in grads.iter_mut().zip(input) {
                    *g += e * x;
                }
                let row = &params.weights()[r * cols..(r + 1) * cols];
                for (upstream, &w) in grad_input.iter_mut().zip(row) {
                    *upstream += w * e;
                }
            }
        }

        if self.has_bias() {
            for (g, &e) in params.bias_gradients_mut().iter_mut().zip(local_error) {
                *g += e;
            }
        }
        Ok(())
    }

    /// Zeroes the accumulators of an owned slot; no-op for a shared copy.
    pub fn clear_gradient(&self, params: &mut Parameters) {
        if self.is_owner() {
            params.clear_gradients();
        }
    }

    fn require_owner(&self) -> Result<()> {
        match self.spec.sharing {
            Sharing::Owning => Ok(()),
            Sharing::Shared { owner, .. } => Err(NetworkError::NotOwner { owner }),
        }
    }

    /// Gradient-descent step with L2 decay, consuming the accumulators:
    /// `W -= lr·(gW + decay·W)`, `b -= lr·gb`.
    pub fn update(&self, params: &mut Parameters, learning_rate: f64) -> Result<()> {
        self.require_owner()?;
        self.check_binding(params)?;

        let decay = self.spec.decay;
        let (weights, weight_grads) = params.weights_and_gradients_mut();
        for (w, &g) in weights.iter_mut().zip(weight_grads.iter()) {
            *w -= learning_rate * (g + decay * *w);
        }

        if self.has_bias() {
            let (biases, bias_grads) = params.biases_and_gradients_mut();
            for (b, &g) in biases.iter_mut().zip(bias_grads.iter()) {
                *b -= learning_rate * g;
            }
        }

        params.clear_gradients();
        Ok(())
    }

    /// Applies an externally computed step in place of the accumulated
    /// gradient, then clears the accumulators.
    pub fn apply_delta(&self, params: &mut Parameters, delta: &ParameterDelta) -> Result<()> {
        self.require_owner()?;
        self.check_binding(params)?;
        check_len("weight delta", params.weights().len(), delta.weights.len())?;

        for (w, d) in params.weights_mut().iter_mut().zip(&delta.weights) {
            *w -= d;
        }

        if self.has_bias() {
            check_len("bias delta", params.biases().len(), delta.biases.len())?;
            for (b, d) in params.biases_mut().iter_mut().zip(&delta.biases) {
                *b -= d;
            }
        }

        params.clear_gradients();
        Ok(())
    }
}
