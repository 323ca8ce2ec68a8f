//! Feedforward Neural Network Core
//!
//! This library provides fully connected layers trained by back-propagation
//! and plain gradient descent, with weight tying between layers and a
//! hinge-loss binary classifier built on the same machinery.
//!
//! # Modules
//!
//! - `layers`: Dense layer, layer descriptions and parameter slots
//! - `network`: Layer sequence with forward/backward/update protocol
//! - `persistence`: Binary model format (methods on `Network`)
//! - `svm`: Binary classifier specialization
//! - `architecture`: JSON architecture configuration and network building
//! - `utils`: Activations, losses and RNG
//! - `error`: Crate error type

pub mod architecture;
pub mod error;
pub mod layers;
pub mod network;
pub mod persistence;
pub mod svm;
pub mod utils;

pub use error::{NetworkError, Result};
pub use layers::{DenseLayer, LayerSpec, ParameterDelta, Parameters, Sharing};
pub use network::Network;
pub use svm::BinaryClassifier;
pub use utils::{Activation, LossKind, SimpleRng};
