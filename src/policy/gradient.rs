//! Hand-derived policy gradient for the two-layer tanh/softmax network
//!
//! For a record with state `s`, hidden activation `h`, probabilities `p`,
//! chosen action `a` and advantage `A`, the gradient of `A * log p(a|s)` is
//!
//! ```text
//! g_i        = A * (1[i == a] - p_i)              (w.r.t. logits)
//! dW2[i][j] += g_i * h_j
//! db2[i]    += g_i
//! gh_j       = Σ_i g_i * W2[i][j]
//! δ_j        = gh_j * (1 - h_j²)                   (through tanh)
//! dW1[j][k] += δ_j * s_k
//! db1[j]    += δ_j
//! ```
//!
//! Gradients are summed over the whole trajectory before any scaling.

use super::weights::PolicyWeights;
use crate::buffer::StepRecord;

/// Summed, unscaled gradient of the advantage-weighted log-likelihood
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyGradient {
    /// Gradient for `w1` [hidden_dim][input_dim]
    pub w1: Vec<Vec<f64>>,
    /// Gradient for `b1` [hidden_dim]
    pub b1: Vec<f64>,
    /// Gradient for `w2` [output_dim][hidden_dim]
    pub w2: Vec<Vec<f64>>,
    /// Gradient for `b2` [output_dim]
    pub b2: Vec<f64>,
}

impl PolicyGradient {
    /// Zero gradient shaped like `weights`
    pub fn zeros_like(weights: &PolicyWeights) -> Self {
        let input_dim = weights.input_dim();
        let hidden_dim = weights.hidden_dim();
        let output_dim = weights.output_dim();
        Self {
            w1: vec![vec![0.0; input_dim]; hidden_dim],
            b1: vec![0.0; hidden_dim],
            w2: vec![vec![0.0; hidden_dim]; output_dim],
            b2: vec![0.0; output_dim],
        }
    }

    /// Accumulate the gradient over `records`
    ///
    /// Uses the activations captured in each record and the current `w2`;
    /// nothing is recomputed from the state.
    pub fn accumulate(weights: &PolicyWeights, records: &[StepRecord]) -> Self {
        let mut grad = Self::zeros_like(weights);
        let output_dim = weights.output_dim();
        let hidden_dim = weights.hidden_dim();

        let mut out_grad = vec![0.0; output_dim];
        for record in records {
            debug_assert_eq!(record.probs.len(), output_dim, "probs length mismatch");
            debug_assert_eq!(record.hidden.len(), hidden_dim, "hidden length mismatch");

            // Output layer
            for (i, g) in out_grad.iter_mut().enumerate() {
                let indicator = if i == record.action { 1.0 } else { 0.0 };
                *g = record.advantage * (indicator - record.probs[i]);
            }
            for (i, &g) in out_grad.iter().enumerate() {
                grad.b2[i] += g;
                for (dw, &h) in grad.w2[i].iter_mut().zip(&record.hidden) {
                    *dw += g * h;
                }
            }

            // Hidden layer
            for j in 0..hidden_dim {
                let grad_hidden: f64 =
                    out_grad.iter().zip(&weights.w2).map(|(&g, row)| g * row[j]).sum();
                let h = record.hidden[j];
                let delta = grad_hidden * (1.0 - h * h);
                grad.b1[j] += delta;
                for (dw, &s) in grad.w1[j].iter_mut().zip(&record.state) {
                    *dw += delta * s;
                }
            }
        }

        grad
    }

    /// Add `scale * self` to `weights` (gradient ascent)
    pub fn apply(&self, weights: &mut PolicyWeights, scale: f64) {
        for (w_row, g_row) in weights.w2.iter_mut().zip(&self.w2) {
            for (w, g) in w_row.iter_mut().zip(g_row) {
                *w += scale * g;
            }
        }
        for (b, g) in weights.b2.iter_mut().zip(&self.b2) {
            *b += scale * g;
        }
        for (w_row, g_row) in weights.w1.iter_mut().zip(&self.w1) {
            for (w, g) in w_row.iter_mut().zip(g_row) {
                *w += scale * g;
            }
        }
        for (b, g) in weights.b1.iter_mut().zip(&self.b1) {
            *b += scale * g;
        }
    }

    /// Euclidean norm over all parameters
    pub fn norm(&self) -> f64 {
        let sq = self.w1.iter().flatten().map(|g| g * g).sum::<f64>()
            + self.w2.iter().flatten().map(|g| g * g).sum::<f64>()
            + self.b1.iter().map(|g| g * g).sum::<f64>()
            + self.b2.iter().map(|g| g * g).sum::<f64>();
        sq.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(advantage: f64, action: usize) -> StepRecord {
        let mut record =
            StepRecord::new(vec![1.0, -2.0], vec![0.5, -0.5], vec![0.25, 0.75], action, 1.0);
        record.advantage = advantage;
        record
    }

    fn weights() -> PolicyWeights {
        PolicyWeights {
            w1: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            b1: vec![0.0, 0.0],
            w2: vec![vec![1.0, -1.0], vec![2.0, 0.5]],
            b2: vec![0.0, 0.0],
        }
    }

    #[test]
    fn test_output_layer_gradient() {
        let grad = PolicyGradient::accumulate(&weights(), &[record(2.0, 0)]);

        // g = 2 * ([1, 0] - [0.25, 0.75]) = [1.5, -1.5]
        assert_eq!(grad.b2, vec![1.5, -1.5]);
        assert_eq!(grad.w2[0], vec![0.75, -0.75]);
        assert_eq!(grad.w2[1], vec![-0.75, 0.75]);
    }

    #[test]
    fn test_hidden_layer_gradient() {
        let grad = PolicyGradient::accumulate(&weights(), &[record(2.0, 0)]);

        // gh_0 = 1.5 * 1.0 + (-1.5) * 2.0 = -1.5; δ_0 = -1.5 * 0.75 = -1.125
        // gh_1 = 1.5 * -1.0 + (-1.5) * 0.5 = -2.25; δ_1 = -2.25 * 0.75 = -1.6875
        assert!((grad.b1[0] - (-1.125)).abs() < 1e-12);
        assert!((grad.b1[1] - (-1.6875)).abs() < 1e-12);
        assert!((grad.w1[0][0] - (-1.125)).abs() < 1e-12);
        assert!((grad.w1[0][1] - 2.25).abs() < 1e-12);
        assert!((grad.w1[1][1] - 3.375).abs() < 1e-12);
    }

    #[test]
    fn test_accumulates_over_records() {
        let single = PolicyGradient::accumulate(&weights(), &[record(1.0, 1)]);
        let double = PolicyGradient::accumulate(&weights(), &[record(1.0, 1), record(1.0, 1)]);
        for (a, b) in single.b1.iter().zip(&double.b1) {
            assert!((2.0 * a - b).abs() < 1e-12);
        }
        assert!((2.0 * single.norm() - double.norm()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_advantage_zero_gradient() {
        let grad = PolicyGradient::accumulate(&weights(), &[record(0.0, 0), record(0.0, 1)]);
        assert_eq!(grad.norm(), 0.0);
    }

    #[test]
    fn test_apply_adds_scaled_gradient() {
        let mut w = weights();
        let grad = PolicyGradient::accumulate(&w, &[record(2.0, 0)]);
        grad.apply(&mut w, 0.1);

        assert!((w.b2[0] - 0.15).abs() < 1e-12);
        assert!((w.b2[1] - (-0.15)).abs() < 1e-12);
        assert!((w.w1[0][0] - (0.1 - 0.1125)).abs() < 1e-12);
    }
}
