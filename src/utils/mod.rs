//! Shared utilities for the network core
//!
//! This module provides random number generation, activation functions and
//! loss functions used by layers and networks.

pub mod activations;
pub mod loss;
pub mod rng;

pub use activations::Activation;
pub use loss::LossKind;
pub use rng::SimpleRng;
