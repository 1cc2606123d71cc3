//! Training statistics for REINFORCE
//!
//! This module defines the per-episode report handed to observers and the
//! running totals kept by the trainer.

use serde::{Deserialize, Serialize};

/// Summary of one completed training episode
///
/// This is what a reward chart consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// 1-based episode number
    pub episode: usize,

    /// Environment steps in this episode
    pub steps: usize,

    /// Undiscounted reward sum of this episode
    pub total_reward: f64,

    /// Exponential moving average of episode reward, including this one
    pub moving_avg_reward: f64,

    /// Best episode reward so far, including this one
    pub best_reward: f64,

    /// Baseline after this episode's update
    pub baseline: f64,

    /// Whether this episode produced a new best-policy snapshot
    pub new_best: bool,

    /// Norm of the unscaled policy gradient applied after this episode
    pub grad_norm: f64,
}

/// Running totals across training episodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Training episodes completed
    pub episodes: usize,

    /// Environment steps that went into updates
    pub total_steps: usize,

    /// Reward of the most recent episode
    pub last_reward: f64,

    /// Exponential moving average of episode reward
    pub moving_avg_reward: f64,
}

impl TrainingStats {
    /// Create zero-initialized statistics
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Fold one episode into the totals
    ///
    /// The first episode seeds the moving average directly; later ones
    /// move it by `alpha` towards their reward.
    pub fn record_episode(&mut self, total_reward: f64, steps: usize, alpha: f64) {
        self.moving_avg_reward = if self.episodes == 0 {
            total_reward
        } else {
            (1.0 - alpha) * self.moving_avg_reward + alpha * total_reward
        };
        self.episodes += 1;
        self.total_steps += steps;
        self.last_reward = total_reward;
    }
}
