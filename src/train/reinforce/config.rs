//! REINFORCE configuration and hyperparameters
//!
//! This module defines the configuration parameters for policy-gradient
//! training and provides validation and builder pattern methods.

use std::time::Duration;

use anyhow::{Result, anyhow};

/// REINFORCE configuration parameters
///
/// Defaults reproduce the interactive cart-pole demo: a 16-unit hidden
/// layer, a 5e-3 step size and a 500-step episode cap.
#[derive(Debug, Clone, PartialEq)]
pub struct ReinforceConfig {
    /// Step size of the gradient ascent
    pub learning_rate: f64,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// Smoothing factor of the return baseline
    pub baseline_alpha: f64,

    /// Smoothing factor of the reported moving-average episode reward
    pub reward_avg_alpha: f64,

    /// Step cap of one episode
    pub max_steps: usize,

    /// Width of the hidden tanh layer
    pub hidden_dim: usize,

    /// Seed for the environment and policy; OS entropy when `None`
    pub seed: Option<u64>,

    /// Log a progress line every this many training episodes (0 disables)
    pub log_interval: usize,

    /// Pause after each best-policy replay step; `None` runs unpaced
    pub replay_step_interval: Option<Duration>,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            learning_rate: 5e-3,
            gamma: 0.99,
            baseline_alpha: 0.05,
            reward_avg_alpha: 0.05,
            max_steps: 500,
            hidden_dim: 16,
            seed: None,
            log_interval: 10,
            replay_step_interval: None,
        }
    }
}

impl ReinforceConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    ///
    /// Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(anyhow!("learning_rate must be positive and finite"));
        }
        if !self.gamma.is_finite() || !(0.0..=1.0).contains(&self.gamma) {
            return Err(anyhow!("gamma must be in [0, 1]"));
        }
        if !self.baseline_alpha.is_finite() || !(0.0..=1.0).contains(&self.baseline_alpha) {
            return Err(anyhow!("baseline_alpha must be in [0, 1]"));
        }
        if !self.reward_avg_alpha.is_finite() || !(0.0..=1.0).contains(&self.reward_avg_alpha) {
            return Err(anyhow!("reward_avg_alpha must be in [0, 1]"));
        }
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be positive"));
        }
        if self.hidden_dim == 0 {
            return Err(anyhow!("hidden_dim must be positive"));
        }
        Ok(())
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set baseline smoothing factor
    pub fn baseline_alpha(mut self, alpha: f64) -> Self {
        self.baseline_alpha = alpha;
        self
    }

    /// Set moving-average reward smoothing factor
    pub fn reward_avg_alpha(mut self, alpha: f64) -> Self {
        self.reward_avg_alpha = alpha;
        self
    }

    /// Set episode step cap
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set hidden layer width
    pub fn hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    /// Set the seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set progress logging interval
    pub fn log_interval(mut self, episodes: usize) -> Self {
        self.log_interval = episodes;
        self
    }

    /// Pace best-policy replays at one step per `interval`
    pub fn replay_step_interval(mut self, interval: Duration) -> Self {
        self.replay_step_interval = Some(interval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReinforceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning_rate, 5e-3);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.baseline_alpha, 0.05);
        assert_eq!(config.max_steps, 500);
        assert_eq!(config.hidden_dim, 16);
        assert_eq!(config.seed, None);
        assert_eq!(config.replay_step_interval, None);
    }

    #[test]
    fn test_config_validation() {
        assert!(ReinforceConfig::new().learning_rate(-1.0).validate().is_err());
        assert!(ReinforceConfig::new().learning_rate(0.0).validate().is_err());
        assert!(ReinforceConfig::new().learning_rate(f64::INFINITY).validate().is_err());
        assert!(ReinforceConfig::new().gamma(1.5).validate().is_err());
        assert!(ReinforceConfig::new().gamma(f64::NAN).validate().is_err());
        assert!(ReinforceConfig::new().baseline_alpha(-0.1).validate().is_err());
        assert!(ReinforceConfig::new().reward_avg_alpha(f64::NAN).validate().is_err());
        assert!(ReinforceConfig::new().max_steps(0).validate().is_err());
        assert!(ReinforceConfig::new().hidden_dim(0).validate().is_err());

        // Boundary values are allowed
        assert!(ReinforceConfig::new().gamma(1.0).validate().is_ok());
        assert!(ReinforceConfig::new().baseline_alpha(0.0).validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ReinforceConfig::new()
            .learning_rate(1e-2)
            .gamma(0.95)
            .max_steps(200)
            .hidden_dim(32)
            .seed(7)
            .log_interval(0)
            .replay_step_interval(Duration::from_millis(20));

        assert_eq!(config.learning_rate, 1e-2);
        assert_eq!(config.gamma, 0.95);
        assert_eq!(config.max_steps, 200);
        assert_eq!(config.hidden_dim, 32);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.log_interval, 0);
        assert_eq!(config.replay_step_interval, Some(Duration::from_millis(20)));

        // Other values should remain default
        assert_eq!(config.baseline_alpha, 0.05);
        assert_eq!(config.reward_avg_alpha, 0.05);
    }
}
