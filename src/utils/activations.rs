//! Activation functions for neural networks
//!
//! Every activation exposes its derivative as a function of the already
//! computed output, so the backward pass only needs the activations recorded
//! during the forward pass and never the pre-activation sums:
//! - Identity: 1
//! - Sigmoid: y * (1 - y)
//! - Tanh: 1 - y²
//! - ReLU: 1 if y > 0 else 0
//! - Softmax: 1 (only valid as the final layer paired with cross-entropy,
//!   whose gradient is already taken w.r.t. the pre-activation sum)

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// Closed set of activation kinds a layer can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Identity,
    Sigmoid,
    Tanh,
    Relu,
    Softmax,
}

impl Activation {
    /// Applies the activation in place to a vector of pre-activation sums.
    pub fn apply(self, values: &mut [f64]) {
        match self {
            Activation::Identity => {}
            Activation::Sigmoid => {
                for value in values.iter_mut() {
                    *value = sigmoid(*value);
                }
            }
            Activation::Tanh => {
                for value in values.iter_mut() {
                    *value = value.tanh();
                }
            }
            Activation::Relu => relu_inplace(values),
            Activation::Softmax => softmax_inplace(values),
        }
    }

    /// Derivative of the activation expressed in terms of its output `y`.
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Identity | Activation::Softmax => 1.0,
            Activation::Sigmoid => sigmoid_derivative(y),
            Activation::Tanh => 1.0 - y * y,
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Wire code used by the model file format.
    pub fn code(self) -> u8 {
        match self {
            Activation::Identity => 0,
            Activation::Sigmoid => 1,
            Activation::Tanh => 2,
            Activation::Relu => 3,
            Activation::Softmax => 4,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Activation::Identity),
            1 => Ok(Activation::Sigmoid),
            2 => Ok(Activation::Tanh),
            3 => Ok(Activation::Relu),
            4 => Ok(Activation::Softmax),
            other => Err(NetworkError::UnknownActivation(other)),
        }
    }
}

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming x = sigmoid(z).
///
/// Returns the derivative: x * (1 - x)
pub fn sigmoid_derivative(x: f64) -> f64 {
    x * (1.0 - x)
}

/// ReLU activation function applied in-place.
///
/// Sets all negative values to 0.0, keeps positive values unchanged.
pub fn relu_inplace(data: &mut [f64]) {
    for value in data.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// Softmax over a single vector, in place.
///
/// Uses the max-subtraction trick for numerical stability.
pub fn softmax_inplace(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sum = 0.0;
    for value in values.iter_mut() {
        *value = (*value - max_value).exp();
        sum += *value;
    }

    let inv_sum = 1.0 / sum;
    for value in values.iter_mut() {
        *value *= inv_sum;
    }
}
