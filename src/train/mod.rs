//! Training algorithms
//!
//! This module implements REINFORCE training for the cart-pole policy, the
//! hooks a host uses to watch and pace it, and a background worker.

pub mod control;
pub mod reinforce;
pub mod worker;

pub use control::{EpisodeLimit, EpisodeScheduler, StepView, StopFlag, TrainingObserver};
pub use reinforce::{
    BestPolicy, EpisodeOutcome, EpisodeReport, PlaybackSummary, ReinforceConfig, Trainer,
    TrainingStats,
};
pub use worker::{EpisodeUpdate, TrainerState, TrainingSession, TrainingWorker};
