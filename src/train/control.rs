//! Observation and scheduling hooks between the trainer and its host
//!
//! The trainer never draws, charts or sleeps by itself. A host plugs in a
//! [`TrainingObserver`] to receive read-only views of every step and every
//! finished episode, and an [`EpisodeScheduler`] that is consulted once
//! between episodes. That call is the only point where a training loop
//! yields or stops; an episode that has started always runs to completion
//! or to its step cap.

use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use super::reinforce::stats::EpisodeReport;
use crate::{
    env::cartpole::{Action, CartPoleState},
    policy::{ForwardPass, PolicyNetwork},
};

/// Read-only view of one environment step
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    /// 0-based step index within the episode
    pub step: usize,

    /// Whether the step was taken by the sampling (training) policy
    pub explore: bool,

    /// State the action was chosen in
    pub state: CartPoleState,

    /// Activations behind the choice
    pub forward: &'a ForwardPass,

    /// Chosen action
    pub action: Action,

    /// State after the step
    pub next_state: CartPoleState,

    /// Reward of the step
    pub reward: f64,

    /// Whether the step ended the episode
    pub terminated: bool,
}

/// Receives snapshots of trainer progress
///
/// Both methods default to doing nothing, so renderers, charts and
/// visualizers only implement what they draw.
pub trait TrainingObserver {
    /// Called after every environment step
    fn on_step(&mut self, _view: &StepView<'_>) {}

    /// Called after every training episode, once the update is applied
    ///
    /// `policy` exposes the updated weights and the latest activations.
    fn on_episode(&mut self, _report: &EpisodeReport, _policy: &PolicyNetwork) {}
}

impl TrainingObserver for () {}

impl<T: TrainingObserver + ?Sized> TrainingObserver for &mut T {
    fn on_step(&mut self, view: &StepView<'_>) {
        (**self).on_step(view);
    }

    fn on_episode(&mut self, report: &EpisodeReport, policy: &PolicyNetwork) {
        (**self).on_episode(report, policy);
    }
}

/// Decides, between episodes, whether continuous training goes on
pub trait EpisodeScheduler {
    /// Yield point after each training episode
    fn yield_between(&mut self, report: &EpisodeReport) -> ControlFlow<()>;
}

impl<F> EpisodeScheduler for F
where
    F: FnMut(&EpisodeReport) -> ControlFlow<()>,
{
    fn yield_between(&mut self, report: &EpisodeReport) -> ControlFlow<()> {
        self(report)
    }
}

/// Stop after a fixed number of episodes
///
/// The count includes the episode that runs before the first yield point, so
/// a limit of 0 still trains once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeLimit {
    remaining: usize,
}

impl EpisodeLimit {
    /// Allow `episodes` training episodes
    pub fn new(episodes: usize) -> Self {
        Self { remaining: episodes }
    }
}

impl EpisodeScheduler for EpisodeLimit {
    fn yield_between(&mut self, _report: &EpisodeReport) -> ControlFlow<()> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    }
}

/// Shared cooperative stop request
///
/// Clones share the same flag. As a scheduler it yields the thread between
/// episodes and stops once a stop has been requested.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stop: Arc<AtomicBool>,
}

impl StopFlag {
    /// Create a flag with no stop requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the training loop to stop at its next yield point
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

impl EpisodeScheduler for StopFlag {
    fn yield_between(&mut self, _report: &EpisodeReport) -> ControlFlow<()> {
        thread::yield_now();
        if self.is_stop_requested() { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    }
}
