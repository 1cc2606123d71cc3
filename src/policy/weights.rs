//! Policy weight storage and snapshots
//!
//! Weights are stored row-major as nested vectors, one row per output
//! neuron, matching the layout of the forward pass. Cloning produces a deep,
//! independent copy, which is what best-policy snapshots rely on.

use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::utils::random::sample_standard_normal;

/// Weights and biases of the two-layer policy network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyWeights {
    /// Hidden layer weights [hidden_dim][input_dim]
    pub w1: Vec<Vec<f64>>,
    /// Hidden layer bias [hidden_dim]
    pub b1: Vec<f64>,
    /// Output layer weights [output_dim][hidden_dim]
    pub w2: Vec<Vec<f64>>,
    /// Output layer bias [output_dim]
    pub b2: Vec<f64>,
}

impl PolicyWeights {
    /// All-zero weights of the given shape
    pub fn zeros(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Self {
        Self {
            w1: vec![vec![0.0; input_dim]; hidden_dim],
            b1: vec![0.0; hidden_dim],
            w2: vec![vec![0.0; hidden_dim]; output_dim],
            b2: vec![0.0; output_dim],
        }
    }

    /// Scaled-normal initialization with zero biases
    ///
    /// Each layer draws from N(0, 1) scaled by `sqrt(2 / (fan_in + fan_out))`.
    pub fn xavier<R: Rng + ?Sized>(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        rng: &mut R,
    ) -> Self {
        let scale1 = (2.0 / (input_dim + hidden_dim) as f64).sqrt();
        let scale2 = (2.0 / (hidden_dim + output_dim) as f64).sqrt();

        let w1 = (0..hidden_dim)
            .map(|_| (0..input_dim).map(|_| sample_standard_normal(rng) * scale1).collect())
            .collect();
        let w2 = (0..output_dim)
            .map(|_| (0..hidden_dim).map(|_| sample_standard_normal(rng) * scale2).collect())
            .collect();

        Self { w1, b1: vec![0.0; hidden_dim], w2, b2: vec![0.0; output_dim] }
    }

    /// Input dimension
    pub fn input_dim(&self) -> usize {
        self.w1.first().map_or(0, Vec::len)
    }

    /// Hidden dimension
    pub fn hidden_dim(&self) -> usize {
        self.b1.len()
    }

    /// Output dimension
    pub fn output_dim(&self) -> usize {
        self.b2.len()
    }

    /// Check that every matrix and vector agrees with the given shape
    pub fn check_shape(&self, input_dim: usize, hidden_dim: usize, output_dim: usize) -> Result<()> {
        if self.w1.len() != hidden_dim || self.w1.iter().any(|row| row.len() != input_dim) {
            bail!("w1 must be {}x{}", hidden_dim, input_dim);
        }
        if self.b1.len() != hidden_dim {
            bail!("b1 must have {} entries, got {}", hidden_dim, self.b1.len());
        }
        if self.w2.len() != output_dim || self.w2.iter().any(|row| row.len() != hidden_dim) {
            bail!("w2 must be {}x{}", output_dim, hidden_dim);
        }
        if self.b2.len() != output_dim {
            bail!("b2 must have {} entries, got {}", output_dim, self.b2.len());
        }
        Ok(())
    }

    /// Whether every parameter is finite
    pub fn is_finite(&self) -> bool {
        let matrix_ok = |m: &[Vec<f64>]| m.iter().flatten().all(|v| v.is_finite());
        matrix_ok(&self.w1)
            && matrix_ok(&self.w2)
            && self.b1.iter().all(|v| v.is_finite())
            && self.b2.iter().all(|v| v.is_finite())
    }

    /// Largest absolute weight per layer, as a visualizer normalizes colors
    pub fn max_abs(&self) -> (f64, f64) {
        let max_abs = |m: &[Vec<f64>]| m.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        (max_abs(&self.w1), max_abs(&self.w2))
    }

    /// Serialize to a JSON string for a host-side visualizer
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
