//! Two-layer perceptron policy for discrete actions
//!
//! A small feedforward network that maps a state to a probability
//! distribution over actions. Everything is plain `f64` arithmetic: the
//! forward pass exposes its intermediate activations and the update applies
//! the hand-derived gradient from [`super::gradient`].
//!
//! # Architecture
//!
//! ```text
//! Input (state)
//!         |
//!  [Dense(hidden)]
//!         |
//!       Tanh
//!         |
//!  [Dense(actions)]
//!         |
//!      Softmax
//!         |
//!   Action probabilities
//! ```

use anyhow::{Result, bail};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{gradient::PolicyGradient, weights::PolicyWeights};
use crate::buffer::StepRecord;

/// Default step size of the policy-gradient ascent
pub const DEFAULT_LEARNING_RATE: f64 = 5e-3;

/// Intermediate values of one forward pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardPass {
    /// Hidden activations, `tanh(W1 · x + b1)`
    pub hidden: Vec<f64>,
    /// Output logits, `W2 · hidden + b2`
    pub logits: Vec<f64>,
    /// Action probabilities, `softmax(logits)`
    pub probs: Vec<f64>,
}

/// An action choice together with the forward pass that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Chosen action index
    pub action: usize,
    /// Activations for the input state
    pub forward: ForwardPass,
}

/// Most recent input and activations, kept for visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    /// Network input
    pub input: Vec<f64>,
    /// Forward pass for `input`
    pub forward: ForwardPass,
}

/// Tanh/softmax policy network trained with REINFORCE
///
/// Owns its weights exclusively; callers only ever see read-only views or
/// deep-copy snapshots.
#[derive(Debug, Clone)]
pub struct PolicyNetwork {
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    learning_rate: f64,
    weights: PolicyWeights,
    last_activation: Option<Activation>,
    rng: StdRng,
}

impl PolicyNetwork {
    /// Create a network with Xavier-style random weights
    ///
    /// # Arguments
    ///
    /// * `input_dim` - State dimensionality
    /// * `hidden_dim` - Number of tanh units
    /// * `output_dim` - Number of discrete actions
    /// * `seed` - Seed for initialization and action sampling
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize, seed: u64) -> Result<Self> {
        Self::with_rng(input_dim, hidden_dim, output_dim, StdRng::seed_from_u64(seed))
    }

    /// Create a network seeded from OS entropy
    pub fn from_entropy(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Result<Self> {
        Self::with_rng(input_dim, hidden_dim, output_dim, StdRng::from_entropy())
    }

    fn with_rng(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        mut rng: StdRng,
    ) -> Result<Self> {
        if input_dim == 0 || hidden_dim == 0 || output_dim == 0 {
            bail!(
                "network sizes must be positive, got {}x{}x{}",
                input_dim,
                hidden_dim,
                output_dim
            );
        }
        let weights = PolicyWeights::xavier(input_dim, hidden_dim, output_dim, &mut rng);

        Ok(Self {
            input_dim,
            hidden_dim,
            output_dim,
            learning_rate: DEFAULT_LEARNING_RATE,
            weights,
            last_activation: None,
            rng,
        })
    }

    /// Set the gradient-ascent step size
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            bail!("learning_rate must be positive and finite, got {}", learning_rate);
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    /// Input dimension
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Hidden dimension
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Number of actions
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Gradient-ascent step size
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Read-only view of the live weights
    pub fn weights(&self) -> &PolicyWeights {
        &self.weights
    }

    /// Input and activations of the most recent `act`/`act_greedy` call
    pub fn last_activation(&self) -> Option<&Activation> {
        self.last_activation.as_ref()
    }

    /// Forward pass: hidden activations, logits and probabilities
    pub fn forward(&self, state: &[f64]) -> ForwardPass {
        assert_eq!(state.len(), self.input_dim, "Input dimension mismatch");

        let hidden: Vec<f64> = self
            .weights
            .w1
            .iter()
            .zip(&self.weights.b1)
            .map(|(row, &b)| dot(row, state, b).tanh())
            .collect();

        let logits: Vec<f64> = self
            .weights
            .w2
            .iter()
            .zip(&self.weights.b2)
            .map(|(row, &b)| dot(row, &hidden, b))
            .collect();

        let probs = softmax(&logits);
        ForwardPass { hidden, logits, probs }
    }

    /// Sample an action from the policy distribution
    pub fn act(&mut self, state: &[f64]) -> Decision {
        let forward = self.forward(state);
        let r: f64 = self.rng.gen();
        let action = sample_index(&forward.probs, r);
        self.remember(state, &forward);
        Decision { action, forward }
    }

    /// Pick the most probable action, first index on ties
    pub fn act_greedy(&mut self, state: &[f64]) -> Decision {
        let forward = self.forward(state);
        let action = argmax(&forward.probs);
        self.remember(state, &forward);
        Decision { action, forward }
    }

    /// Log-probability of `action` in `state`
    pub fn log_prob(&self, state: &[f64], action: usize) -> f64 {
        self.forward(state).probs[action].ln()
    }

    /// Summed gradient of `Σ advantage * log p(action | state)` over `records`
    pub fn policy_gradient(&self, records: &[StepRecord]) -> PolicyGradient {
        PolicyGradient::accumulate(&self.weights, records)
    }

    /// One REINFORCE ascent step over a whole episode
    ///
    /// The gradient is accumulated over every record first, then scaled by
    /// `learning_rate / records.len()` and added to the weights. Returns the
    /// norm of the unscaled gradient; an empty slice leaves the weights as
    /// they are.
    pub fn update(&mut self, records: &[StepRecord]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let grad = self.policy_gradient(records);
        let scale = self.learning_rate / records.len() as f64;
        grad.apply(&mut self.weights, scale);
        debug_assert!(self.weights.is_finite(), "policy weights diverged");
        grad.norm()
    }

    /// Deep copy of the live weights
    pub fn snapshot(&self) -> PolicyWeights {
        self.weights.clone()
    }

    /// Replace the live weights with a deep copy of `weights`
    pub fn restore(&mut self, weights: &PolicyWeights) -> Result<()> {
        weights.check_shape(self.input_dim, self.hidden_dim, self.output_dim)?;
        self.weights = weights.clone();
        Ok(())
    }

    fn remember(&mut self, state: &[f64], forward: &ForwardPass) {
        self.last_activation = Some(Activation { input: state.to_vec(), forward: forward.clone() });
    }
}

fn dot(row: &[f64], input: &[f64], bias: f64) -> f64 {
    row.iter().zip(input).fold(bias, |acc, (w, x)| acc + w * x)
}

/// Softmax with max-subtraction for numerical stability
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&x| x / sum).collect()
}

/// Inverse-CDF sampling: first index whose cumulative probability reaches `r`
///
/// Falls back to the last index when round-off leaves the total just under `r`.
pub fn sample_index(probs: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r <= cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    best_idx
}
