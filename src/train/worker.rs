//! Background training thread
//!
//! [`TrainingWorker`] moves a [`Trainer`] onto its own thread and runs
//! continuous training until asked to stop. Progress flows back over a
//! bounded channel; when the consumer falls behind, updates are dropped
//! rather than stalling training. Stopping is cooperative: the flag is
//! checked between episodes only, and joining hands the trainer back.
//! Dropping a worker, or losing every update receiver, stops it too.
//!
//! [`TrainingSession`] is the start/stop/replay state machine a UI drives.

use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::{
    control::{StopFlag, TrainingObserver},
    reinforce::{EpisodeReport, PlaybackSummary, Trainer},
};
use crate::policy::{PolicyNetwork, PolicyWeights};

/// Default number of buffered episode updates
pub const DEFAULT_UPDATE_CAPACITY: usize = 256;

/// Whether a session is currently training
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    /// No training thread is running
    Idle,

    /// A training thread is running
    Training,
}

/// Progress message sent after each training episode
#[derive(Debug, Clone)]
pub struct EpisodeUpdate {
    /// Episode summary
    pub report: EpisodeReport,

    /// Weights after the episode's update
    pub weights: PolicyWeights,
}

struct ChannelObserver {
    sender: Sender<EpisodeUpdate>,
    stop: StopFlag,
}

impl TrainingObserver for ChannelObserver {
    fn on_episode(&mut self, report: &EpisodeReport, policy: &PolicyNetwork) {
        let update = EpisodeUpdate { report: report.clone(), weights: policy.snapshot() };
        match self.sender.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!(episode = report.episode, "Update channel full, dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Update receiver gone, stopping training");
                self.stop.request_stop();
            }
        }
    }
}

/// What the training thread hands back: the trainer and how its loop ended
type WorkerExit = (Trainer, Result<usize>);

/// Trainer running on a background thread
///
/// Dropping the worker requests a stop and waits for the current episode
/// to finish.
pub struct TrainingWorker {
    stop: StopFlag,
    handle: Option<JoinHandle<WorkerExit>>,
    updates: Receiver<EpisodeUpdate>,
}

impl TrainingWorker {
    /// Start continuous training with the default update capacity
    pub fn spawn(trainer: Trainer) -> Result<Self> {
        Self::spawn_with_capacity(trainer, DEFAULT_UPDATE_CAPACITY)
    }

    /// Start continuous training, buffering at most `capacity` updates
    pub fn spawn_with_capacity(mut trainer: Trainer, capacity: usize) -> Result<Self> {
        let (sender, updates) = crossbeam_channel::bounded(capacity);
        let stop = StopFlag::new();
        let mut scheduler = stop.clone();

        let handle = thread::Builder::new()
            .name("reinforce-trainer".to_string())
            .spawn(move || {
                let mut observer = ChannelObserver { sender, stop: scheduler.clone() };
                let result = trainer.train(&mut scheduler, &mut observer);
                (trainer, result)
            })
            .context("failed to spawn training thread")?;

        Ok(Self { stop, handle: Some(handle), updates })
    }

    /// Receiver of per-episode updates
    pub fn updates(&self) -> &Receiver<EpisodeUpdate> {
        &self.updates
    }

    /// Whether the training thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop at the next episode boundary and take the trainer back
    ///
    /// If the training loop failed, its error is returned and the trainer is
    /// dropped with it; [`TrainingSession::stop`] keeps the trainer instead.
    pub fn stop(mut self) -> Result<Trainer> {
        let (trainer, result) = self.join()?;
        result.map(|_| trainer)
    }

    /// Request a stop and wait for the thread
    ///
    /// Errors only when the thread panicked, in which case the trainer is
    /// gone.
    fn join(&mut self) -> Result<WorkerExit> {
        self.stop.request_stop();
        let handle = self.handle.take().ok_or_else(|| anyhow!("training thread already joined"))?;
        handle.join().map_err(|_| anyhow!("training thread panicked"))
    }
}

impl Drop for TrainingWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            match self.join() {
                Ok((_, Err(e))) => tracing::warn!("Training stopped with an error: {e:#}"),
                Ok(_) => tracing::debug!("Training worker dropped"),
                Err(e) => tracing::warn!("{e}"),
            }
        }
    }
}

/// Start/stop/replay controller around one trainer
///
/// The trainer lives either in the session (idle) or on the worker thread
/// (training), never both, so a replay can only run while nothing trains.
/// Dropping a training session stops its worker.
///
/// A training loop that fails leaves the session idle with its trainer
/// back in place. A panicked training thread takes the trainer with it;
/// the session is then idle without a trainer and [`Self::start`] fails.
pub struct TrainingSession {
    trainer: Option<Trainer>,
    worker: Option<TrainingWorker>,
}

impl TrainingSession {
    /// Create an idle session
    pub fn new(trainer: Trainer) -> Self {
        Self { trainer: Some(trainer), worker: None }
    }

    /// Current state
    pub fn state(&self) -> TrainerState {
        if self.worker.is_some() { TrainerState::Training } else { TrainerState::Idle }
    }

    /// Start training; returns `false` if already training
    pub fn start(&mut self) -> Result<bool> {
        if self.worker.is_some() {
            return Ok(false);
        }
        let trainer = self.trainer.take().ok_or_else(|| anyhow!("trainer was lost"))?;
        self.worker = Some(TrainingWorker::spawn(trainer)?);
        tracing::info!("Training started");
        Ok(true)
    }

    /// Stop training; returns `false` if already idle
    ///
    /// The session is idle afterwards even when this returns an error.
    pub fn stop(&mut self) -> Result<bool> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(false);
        };
        let (trainer, result) = worker.join()?;
        self.trainer = Some(trainer);
        result.context("training loop failed")?;
        tracing::info!("Training stopped");
        Ok(true)
    }

    /// Idle trainer, `None` while training
    pub fn trainer(&self) -> Option<&Trainer> {
        self.trainer.as_ref()
    }

    /// Update receiver of the running worker, `None` while idle
    pub fn updates(&self) -> Option<&Receiver<EpisodeUpdate>> {
        self.worker.as_ref().map(TrainingWorker::updates)
    }

    /// Replay the best policy, pausing training around it
    ///
    /// Training resumes afterwards if it was running before, also when the
    /// replay itself fails.
    pub fn play_best<O>(
        &mut self,
        duration: Duration,
        observer: &mut O,
    ) -> Result<Option<PlaybackSummary>>
    where
        O: TrainingObserver + ?Sized,
    {
        let was_training = self.stop()?;
        let trainer = self.trainer.as_mut().ok_or_else(|| anyhow!("trainer was lost"))?;
        let summary = trainer.play_best(duration, observer);
        if was_training {
            self.start()?;
        }
        summary
    }

    /// Stop training if needed and take the trainer out
    pub fn into_trainer(mut self) -> Result<Trainer> {
        self.stop()?;
        self.trainer.take().ok_or_else(|| anyhow!("trainer was lost"))
    }
}
