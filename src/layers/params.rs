//! Parameter slots held by the network's arena
//!
//! A slot owns one affine transform (weights + biases) together with the
//! gradient accumulators for it. Owning layers are bound to exactly one slot;
//! shared copies read and accumulate into their owner's slot.

use crate::utils::SimpleRng;

/// Weight matrix (`rows × cols`, row-major), bias vector and accumulators.
///
/// `rows` is the owner's output size and `cols` its input size. The bias
/// and bias-gradient vectors are empty when the owner suppresses its bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
    weight_gradients: Vec<f64>,
    bias_gradients: Vec<f64>,
}

impl Parameters {
    pub(crate) fn zeros(rows: usize, cols: usize, with_bias: bool) -> Self {
        let bias_len = if with_bias { rows } else { 0 };
        Self {
            rows,
            cols,
            weights: vec![0.0; rows * cols],
            biases: vec![0.0; bias_len],
            weight_gradients: vec![0.0; rows * cols],
            bias_gradients: vec![0.0; bias_len],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn has_bias(&self) -> bool {
        !self.biases.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    /// Accumulated dE/dW since the last clear or update.
    pub fn weight_gradients(&self) -> &[f64] {
        &self.weight_gradients
    }

    /// Accumulated dE/db since the last clear or update.
    pub fn bias_gradients(&self) -> &[f64] {
        &self.bias_gradients
    }

    /// Weight at (`row`, `col`) of the stored (untransposed) matrix.
    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.weights[row * self.cols + col]
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    pub(crate) fn weight_gradients_mut(&mut self) -> &mut [f64] {
        &mut self.weight_gradients
    }

    pub(crate) fn bias_gradients_mut(&mut self) -> &mut [f64] {
        &mut self.bias_gradients
    }

    pub(crate) fn weights_and_gradients_mut(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.weights, &self.weight_gradients)
    }

    pub(crate) fn biases_and_gradients_mut(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.biases, &self.bias_gradients)
    }

    pub(crate) fn clear_gradients(&mut self) {
        self.weight_gradients.fill(0.0);
        self.bias_gradients.fill(0.0);
    }

    /// Gaussian weights with the given standard deviation, zero biases.
    pub(crate) fn randomize(&mut self, rng: &mut SimpleRng, std_dev: f64) {
        for value in &mut self.weights {
            *value = rng.gen_normal(0.0, std_dev);
        }
        self.biases.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shapes() {
        let params = Parameters::zeros(2, 3, true);
        assert_eq!(params.weights().len(), 6);
        assert_eq!(params.biases().len(), 2);
        assert_eq!(params.parameter_count(), 8);
        assert!(params.has_bias());
    }

    #[test]
    fn test_zeros_without_bias() {
        let params = Parameters::zeros(2, 3, false);
        assert!(params.biases().is_empty());
        assert!(params.bias_gradients().is_empty());
        assert_eq!(params.parameter_count(), 6);
    }

    #[test]
    fn test_randomize_deterministic_and_zero_bias() {
        let mut a = Parameters::zeros(4, 5, true);
        let mut b = Parameters::zeros(4, 5, true);
        a.randomize(&mut SimpleRng::new(42), 0.5);
        b.randomize(&mut SimpleRng::new(42), 0.5);

        assert_eq!(a.weights(), b.weights());
        assert!(a.weights().iter().any(|&w| w != 0.0));
        assert!(a.biases().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_row_major_indexing() {
        let mut params = Parameters::zeros(2, 3, false);
        params.weights_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(params.weight(1, 0), 4.0);
        assert_eq!(params.weight(0, 2), 3.0);
    }
}
