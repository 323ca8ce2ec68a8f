//! Layer abstractions for the network core
//!
//! This module provides the dense layer, its construction-time description
//! and the parameter slots that owning layers hold in the network's arena.

pub mod dense;
pub mod params;

pub use dense::{DenseLayer, LayerSpec, ParameterDelta, Sharing};
pub use params::Parameters;
