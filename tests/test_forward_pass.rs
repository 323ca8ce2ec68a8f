//! Tests for the network forward pass
//!
//! This file covers:
//! - Affine transform with known weights
//! - Activation snapshot recording
//! - Determinism of repeated passes
//! - Transposed weight tying
//! - Input validation

use approx::assert_relative_eq;
use neural_core::layers::LayerSpec;
use neural_core::network::Network;
use neural_core::utils::{Activation, LossKind};
use neural_core::NetworkError;

// ============================================================================
// Known-Weight Tests
// ============================================================================

mod known_weight_tests {
    use super::*;

    #[test]
    fn test_identity_layer_selects_inputs() {
        let mut net = Network::new(&[3, 2], &[Activation::Identity], &[None]).unwrap();
        net.parameters_mut(0)
            .unwrap()
            .weights_mut()
            .copy_from_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let y = net.forward_pass(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(y, vec![1.0, 2.0]);
    }

    #[test]
    fn test_bias_is_added_before_activation() {
        let mut net = Network::new(&[1, 1], &[Activation::Sigmoid], &[None]).unwrap();
        let params = net.parameters_mut(0).unwrap();
        params.weights_mut()[0] = 2.0;
        params.biases_mut()[0] = -1.0;

        let y = net.forward_pass(&[0.5]).unwrap();
        assert_relative_eq!(y[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_softmax_output_is_distribution() {
        let specs = vec![
            LayerSpec::new(3, 4, Activation::Tanh),
            LayerSpec::new(4, 5, Activation::Softmax),
        ];
        let mut net = Network::from_specs(specs, LossKind::CrossEntropy).unwrap();
        net.initialize_random(11);

        let y = net.forward_pass(&[0.3, -1.2, 0.8]).unwrap();
        assert_relative_eq!(y.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(y.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_saturated_softmax_loss_is_finite() {
        let specs = vec![LayerSpec::new(1, 2, Activation::Softmax).without_bias()];
        let mut net = Network::from_specs(specs, LossKind::CrossEntropy).unwrap();
        net.parameters_mut(0)
            .unwrap()
            .weights_mut()
            .copy_from_slice(&[0.0, 1000.0]);

        let y = net.evaluate(&[1.0]).unwrap();
        assert_eq!(y[0], 0.0);
        assert_eq!(net.loss(&[1.0], &[0.0, 1.0]).unwrap(), 0.0);
    }
}

// ============================================================================
// Snapshot and Determinism Tests
// ============================================================================

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_activations_recorded_per_layer() {
        let mut net = Network::new(
            &[2, 3, 1],
            &[Activation::Tanh, Activation::Identity],
            &[None, None],
        )
        .unwrap();
        net.initialize_random(1);

        let y = net.forward_pass(&[0.5, -0.5]).unwrap();
        let activations = net.activations();

        assert_eq!(activations.len(), 3);
        assert_eq!(activations[0], vec![0.5, -0.5]);
        assert_eq!(activations[1].len(), 3);
        assert_eq!(activations[2], y);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let mut net = Network::new(
            &[4, 6, 2],
            &[Activation::Relu, Activation::Sigmoid],
            &[None, None],
        )
        .unwrap();
        net.initialize_random(99);

        let first = net.forward_pass(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        let second = net.forward_pass(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(first, second);
        assert_eq!(net.evaluate(&[0.1, 0.2, 0.3, 0.4]).unwrap(), first);
    }

    #[test]
    fn test_same_seed_same_network() {
        let build = || {
            let mut net = Network::new(&[3, 3], &[Activation::Tanh], &[None]).unwrap();
            net.initialize_random(1234);
            net
        };
        let a = build();
        let b = build();
        assert_eq!(a.parameters(0), b.parameters(0));
    }

    #[test]
    fn test_initialization_scale_and_zero_bias() {
        let mut net = Network::new(&[400, 50], &[Activation::Identity], &[None]).unwrap();
        net.initialize_random(8);
        let params = net.parameters(0).unwrap();

        let n = params.weights().len() as f64;
        let var = params.weights().iter().map(|w| w * w).sum::<f64>() / n;
        // std = 1 / sqrt(400) = 0.05
        assert_relative_eq!(var.sqrt(), 0.05, max_relative = 0.1);
        assert!(params.biases().iter().all(|&b| b == 0.0));
    }
}

// ============================================================================
// Weight Tying Tests
// ============================================================================

mod tied_forward_tests {
    use super::*;

    #[test]
    fn test_transposed_copy_reads_owner_matrix() {
        let specs = vec![
            LayerSpec::new(3, 2, Activation::Identity).without_bias(),
            LayerSpec::new(2, 3, Activation::Identity)
                .without_bias()
                .shared_with(0, true),
        ];
        let mut net = Network::from_specs(specs, LossKind::SquaredError).unwrap();
        net.parameters_mut(0)
            .unwrap()
            .weights_mut()
            .copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        // W·x = [1+4+9, 4+10+18] = [14, 32]; Wᵗ·[14, 32] = [142, 188, 234]
        let y = net.forward_pass(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(y, vec![142.0, 188.0, 234.0]);
        assert_eq!(net.parameters(0), net.parameters(1));
    }

    #[test]
    fn test_shared_copy_sees_owner_initialization() {
        let mut net = Network::new(
            &[3, 3, 3],
            &[Activation::Tanh, Activation::Tanh],
            &[None, Some(0)],
        )
        .unwrap();
        net.initialize_random(21);

        assert_eq!(net.parameters(0), net.parameters(1));
        assert_eq!(net.owner_layers(), vec![0]);
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_wrong_input_length() {
        let mut net = Network::new(&[3, 2], &[Activation::Identity], &[None]).unwrap();
        let err = net.forward_pass(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_incompatible_share_rejected() {
        let result = Network::new(
            &[3, 2, 5],
            &[Activation::Identity, Activation::Identity],
            &[None, Some(0)],
        );
        assert!(matches!(result, Err(NetworkError::InvalidConfig(_))));
    }

    #[test]
    fn test_activation_count_mismatch() {
        let result = Network::new(&[3, 2, 1], &[Activation::Identity], &[None, None]);
        assert!(result.is_err());
    }
}
