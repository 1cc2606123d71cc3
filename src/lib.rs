//! # Balance
//!
//! Cart-pole balancing with an online REINFORCE agent, in plain Rust
//!
//! The crate bundles a deterministic cart-pole simulator, a small
//! tanh/softmax policy network with a hand-derived policy gradient, and a
//! trainer that learns episode by episode, keeps the best weights it has
//! seen and can replay them greedily.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use balance_rl::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut trainer = Trainer::new(ReinforceConfig::new().seed(42))?;
//! trainer.train(&mut EpisodeLimit::new(200), &mut ())?;
//! trainer.play_best(std::time::Duration::from_secs(5), &mut ())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment traits and the cart-pole simulator
pub mod env;

/// Policy network, weights and gradient
pub mod policy;

/// Per-episode trajectories and discounted returns
pub mod buffer;

/// REINFORCE training, control hooks and the background worker
pub mod train;

/// Utility functions and helpers
pub mod utils;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::{
        buffer::{StepRecord, Trajectory, discounted_returns},
        env::{
            Environment, StepResult,
            cartpole::{Action, CartPole, CartPoleState},
        },
        policy::{PolicyNetwork, PolicyWeights},
        train::{
            EpisodeLimit, EpisodeReport, EpisodeScheduler, ReinforceConfig, StepView, StopFlag,
            Trainer, TrainingObserver, TrainingSession, TrainingWorker,
        },
    };
}

/// Current version of balance-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
