//! Linear binary classifier trained through the network protocol
//!
//! From a network point of view a binary SVM is a single identity layer with
//! one output neuron trained with hinge loss, the layer's decay acting as the
//! margin regularization strength. Training this way optimizes the primal
//! directly.

use crate::error::{NetworkError, Result};
use crate::layers::{LayerSpec, ParameterDelta};
use crate::network::Network;
use crate::utils::{Activation, LossKind};

/// Default regularization strength.
pub const DEFAULT_LAMBDA: f64 = 1e-8;

/// One-layer `input_dim -> 1` network with a sign decision rule.
#[derive(Debug, Clone)]
pub struct BinaryClassifier {
    network: Network,
}

impl BinaryClassifier {
    /// Hinge-loss classifier with `decay = lambda`.
    pub fn new(input_dim: usize, lambda: f64) -> Result<Self> {
        Self::with_loss(input_dim, LossKind::Hinge, lambda)
    }

    /// Classifier trained against an arbitrary scalar loss.
    pub fn with_loss(input_dim: usize, loss: LossKind, lambda: f64) -> Result<Self> {
        if loss == LossKind::CrossEntropy {
            return Err(NetworkError::InvalidConfig(
                "cross-entropy needs a softmax output and cannot drive a sign classifier"
                    .to_string(),
            ));
        }
        let spec = LayerSpec::new(input_dim, 1, Activation::Identity).with_decay(lambda);
        let network = Network::from_specs(vec![spec], loss)?;
        Ok(Self { network })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn initialize_random(&mut self, seed: i64) -> &mut Self {
        self.network.initialize_random(seed);
        self
    }

    /// Raw decision value `w·x + b`.
    pub fn decision_value(&self, input: &[f64]) -> Result<f64> {
        Ok(self.network.evaluate(input)?[0])
    }

    /// Class label: `1` when the decision value is non-negative, else `-1`.
    pub fn predict(&self, input: &[f64]) -> Result<i32> {
        let value = self.decision_value(input)?;
        Ok(if value >= 0.0 { 1 } else { -1 })
    }

    pub fn forward_pass(&mut self, input: &[f64]) -> Result<f64> {
        Ok(self.network.forward_pass(input)?[0])
    }

    pub fn backward_pass(&mut self, label: f64) -> Result<()> {
        self.network.backward_pass(&[label])
    }

    pub fn update(&mut self, learning_rate: f64) -> Result<()> {
        self.network.update(learning_rate)
    }

    pub fn update_with(&mut self, delta: ParameterDelta) -> Result<()> {
        self.network.update_with(&[delta])
    }

    pub fn clear_gradient(&mut self) {
        self.network.clear_gradient();
    }

    /// One forward/backward/update cycle on a single labelled sample
    /// (`label` in {-1, +1}). Returns the hinge loss before the step.
    pub fn train_step(&mut self, input: &[f64], label: f64, learning_rate: f64) -> Result<f64> {
        let output = self.network.forward_pass(input)?;
        let loss = self.network.loss_kind().value(&output, &[label])?;
        self.network.backward_pass(&[label])?;
        self.network.update(learning_rate)?;
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_shape() {
        let clf = BinaryClassifier::new(4, DEFAULT_LAMBDA).unwrap();
        let layer = clf.network().layer(0).unwrap();
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_size(), 1);
        assert_eq!(layer.activation(), Activation::Identity);
        assert_eq!(layer.decay(), DEFAULT_LAMBDA);
        assert_eq!(clf.network().loss_kind(), LossKind::Hinge);
    }

    #[test]
    fn test_predict_uses_sign() {
        let mut clf = BinaryClassifier::new(2, 0.0).unwrap();
        clf.network_mut()
            .parameters_mut(0)
            .unwrap()
            .weights_mut()
            .copy_from_slice(&[1.0, -1.0]);

        assert_eq!(clf.predict(&[2.0, 1.0]).unwrap(), 1);
        assert_eq!(clf.predict(&[1.0, 2.0]).unwrap(), -1);
    }

    #[test]
    fn test_cross_entropy_rejected() {
        assert!(BinaryClassifier::with_loss(2, LossKind::CrossEntropy, 0.0).is_err());
    }
}
