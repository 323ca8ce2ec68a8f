//! Loss functions evaluated against a network's final activation
//!
//! Only the gradient is needed by the backward pass; `value` exists for
//! monitoring and gradient checking.

use serde::{Deserialize, Serialize};

use crate::error::{check_len, NetworkError, Result};

/// Closed set of loss kinds a network can be trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// 0.5 * Σ (y - t)²
    #[default]
    SquaredError,
    /// Σ max(0, 1 - y·t), labels in {-1, +1}
    Hinge,
    /// -Σ t·ln(y), paired with a softmax final layer
    CrossEntropy,
}

impl LossKind {
    /// Loss value for a prediction against the desired output.
    pub fn value(self, predicted: &[f64], desired: &[f64]) -> Result<f64> {
        check_len("loss target", predicted.len(), desired.len())?;
        let pairs = predicted.iter().zip(desired.iter());
        let loss: f64 = match self {
            LossKind::SquaredError => pairs.map(|(y, t)| 0.5 * (y - t) * (y - t)).sum(),
            LossKind::Hinge => pairs.map(|(y, t)| (1.0 - y * t).max(0.0)).sum(),
            // zero targets contribute nothing, even where y underflowed to 0
            LossKind::CrossEntropy => pairs
                .filter(|(_, t)| **t != 0.0)
                .map(|(y, t)| -t * y.ln())
                .sum(),
        };
        Ok(loss)
    }

    /// dE/dy written into `grad`.
    ///
    /// For cross-entropy the result is the gradient w.r.t. the softmax input.
    pub fn gradient(self, predicted: &[f64], desired: &[f64], grad: &mut [f64]) -> Result<()> {
        check_len("loss target", predicted.len(), desired.len())?;
        check_len("loss gradient", predicted.len(), grad.len())?;

        for ((g, y), t) in grad.iter_mut().zip(predicted).zip(desired) {
            *g = match self {
                LossKind::SquaredError | LossKind::CrossEntropy => y - t,
                LossKind::Hinge => {
                    if y * t >= 1.0 {
                        0.0
                    } else {
                        -t
                    }
                }
            };
        }
        Ok(())
    }

    /// Wire code used by the model file format.
    pub fn code(self) -> u8 {
        match self {
            LossKind::SquaredError => 0,
            LossKind::Hinge => 1,
            LossKind::CrossEntropy => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(LossKind::SquaredError),
            1 => Ok(LossKind::Hinge),
            2 => Ok(LossKind::CrossEntropy),
            other => Err(NetworkError::UnknownLoss(other)),
        }
    }
}
