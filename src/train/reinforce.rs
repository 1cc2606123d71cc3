//! REINFORCE (Monte-Carlo policy gradient)
//!
//! Online, episodic policy-gradient training of the cart-pole policy.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each episode:
//!   1. Reset the environment and roll out the sampling policy
//!   2. Compute discounted returns G_t backwards from the last step
//!   3. Advantage A_t = G_t - baseline, baseline taken before this episode
//!   4. Move the baseline towards G_0
//!   5. Gradient ascent on sum_t A_t * log p(a_t | s_t), averaged over steps
//!   6. Snapshot the weights if the episode reward is a new best
//! ```
//!
//! # References
//!
//! - Williams, "Simple statistical gradient-following algorithms for
//!   connectionist reinforcement learning" (1992)

pub mod config;
pub mod stats;
pub mod trainer;

pub use config::ReinforceConfig;
pub use stats::{EpisodeReport, TrainingStats};
pub use trainer::{BestPolicy, EpisodeOutcome, PlaybackSummary, Trainer};
