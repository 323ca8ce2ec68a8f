//! Tests for the hinge-loss binary classifier
//!
//! This file covers:
//! - Training on a linearly separable dataset
//! - Training through the raw network protocol
//! - Regularization strength wiring

use neural_core::svm::{BinaryClassifier, DEFAULT_LAMBDA};
use neural_core::utils::LossKind;

const POINTS: [([f64; 2], f64); 2] = [([1.0, 2.0], 1.0), ([-1.0, -1.5], -1.0)];

#[test]
fn test_separates_two_points() {
    let mut clf = BinaryClassifier::new(2, 1e-4).unwrap();
    clf.initialize_random(3);

    for _ in 0..100 {
        for (x, label) in POINTS.iter() {
            clf.train_step(x, *label, 0.1).unwrap();
        }
    }

    for (x, label) in POINTS.iter() {
        assert_eq!(clf.predict(x).unwrap() as f64, *label);
    }
}

#[test]
fn test_training_through_network_protocol() {
    let mut clf = BinaryClassifier::new(2, DEFAULT_LAMBDA).unwrap();
    clf.initialize_random(9);

    for _ in 0..100 {
        for (x, label) in POINTS.iter() {
            clf.forward_pass(x).unwrap();
            clf.backward_pass(*label).unwrap();
        }
        clf.update(0.05).unwrap();
    }

    for (x, label) in POINTS.iter() {
        let margin = clf.decision_value(x).unwrap() * label;
        assert!(margin > 0.0, "point {:?} misclassified (margin {})", x, margin);
    }
}

#[test]
fn test_hinge_loss_reaches_zero_on_separable_data() {
    let mut clf = BinaryClassifier::new(2, 0.0).unwrap();
    clf.initialize_random(1);

    let mut last_epoch_loss = f64::MAX;
    for _ in 0..200 {
        last_epoch_loss = 0.0;
        for (x, label) in POINTS.iter() {
            last_epoch_loss += clf.train_step(x, *label, 0.1).unwrap();
        }
    }
    assert_eq!(last_epoch_loss, 0.0);
}

#[test]
fn test_squared_error_variant() {
    let clf = BinaryClassifier::with_loss(3, LossKind::SquaredError, 0.5).unwrap();
    assert_eq!(clf.network().loss_kind(), LossKind::SquaredError);
    assert_eq!(clf.network().layer(0).unwrap().decay(), 0.5);
}
