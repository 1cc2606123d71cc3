//! REINFORCE trainer: rollout, returns, baseline and checkpointing

use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow, bail};

use super::{
    config::ReinforceConfig,
    stats::{EpisodeReport, TrainingStats},
};
use crate::{
    buffer::{StepRecord, Trajectory},
    env::{
        Environment,
        cartpole::{Action, CartPole, CartPoleState},
    },
    policy::{Decision, PolicyNetwork, PolicyWeights},
    train::control::{EpisodeScheduler, StepView, TrainingObserver},
};

/// Result of one rollout
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    /// Step records; empty for greedy rollouts
    pub trajectory: Trajectory,

    /// Undiscounted reward sum
    pub total_reward: f64,

    /// Environment steps taken
    pub steps: usize,

    /// Whether the episode ended by failure rather than the step cap
    pub terminated: bool,
}

/// Weights of the best training episode seen so far
#[derive(Debug, Clone, PartialEq)]
pub struct BestPolicy {
    /// Deep copy of the weights right after that episode's update
    pub weights: PolicyWeights,

    /// Reward of that episode
    pub reward: f64,

    /// Episode number that produced it
    pub episode: usize,
}

/// Outcome of a best-policy replay
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSummary {
    /// Environment steps taken
    pub steps: usize,

    /// Undiscounted reward sum
    pub total_reward: f64,

    /// Whether the pole fell or the cart left the track
    pub terminated: bool,

    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// REINFORCE trainer for the cart-pole policy
///
/// Owns the environment, the policy, the return baseline and the
/// best-policy slot. Every mutating operation takes `&mut self`, so a replay
/// can never interleave with an update.
#[derive(Debug)]
pub struct Trainer {
    config: ReinforceConfig,
    env: CartPole,
    policy: PolicyNetwork,
    baseline: f64,
    best_reward: f64,
    best: Option<BestPolicy>,
    stats: TrainingStats,
}

impl Trainer {
    /// Create a trainer with a fresh environment and policy
    ///
    /// With a seed in `config`, the environment uses it directly and the
    /// policy uses the next value, making the whole run reproducible.
    pub fn new(config: ReinforceConfig) -> Result<Self> {
        config.validate()?;

        let obs_dim = CartPoleState::DIM;
        let action_dim = Action::ALL.len();
        let (env, policy) = match config.seed {
            Some(seed) => (
                CartPole::new(seed),
                PolicyNetwork::new(obs_dim, config.hidden_dim, action_dim, seed.wrapping_add(1))?,
            ),
            None => (
                CartPole::from_entropy(),
                PolicyNetwork::from_entropy(obs_dim, config.hidden_dim, action_dim)?,
            ),
        };

        Self::with_parts(config, env, policy)
    }

    /// Create a trainer around an existing environment and policy
    ///
    /// The policy's hidden width must match `config.hidden_dim`; its
    /// learning rate is replaced by the configured one.
    pub fn with_parts(config: ReinforceConfig, env: CartPole, policy: PolicyNetwork) -> Result<Self> {
        config.validate()?;

        let obs_dim = env.observation_space().size();
        let action_dim = env.action_space().size();
        if policy.input_dim() != obs_dim {
            bail!(
                "policy expects {} inputs but the environment observes {}",
                policy.input_dim(),
                obs_dim
            );
        }
        if policy.output_dim() != action_dim {
            bail!(
                "policy produces {} outputs but the environment has {} actions",
                policy.output_dim(),
                action_dim
            );
        }
        if policy.hidden_dim() != config.hidden_dim {
            bail!(
                "policy has {} hidden units but the config asks for {}",
                policy.hidden_dim(),
                config.hidden_dim
            );
        }
        let policy = policy.with_learning_rate(config.learning_rate)?;

        tracing::debug!(
            hidden_dim = policy.hidden_dim(),
            learning_rate = config.learning_rate,
            gamma = config.gamma,
            "Created REINFORCE trainer"
        );

        Ok(Self {
            config,
            env,
            policy,
            baseline: 0.0,
            best_reward: 0.0,
            best: None,
            stats: TrainingStats::zeros(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &ReinforceConfig {
        &self.config
    }

    /// Get the environment
    pub fn env(&self) -> &CartPole {
        &self.env
    }

    /// Get the policy
    pub fn policy(&self) -> &PolicyNetwork {
        &self.policy
    }

    /// Current return baseline
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Best training episode reward so far (0 before any improvement)
    pub fn best_reward(&self) -> f64 {
        self.best_reward
    }

    /// Best-policy snapshot, if any episode improved on the initial best
    pub fn best(&self) -> Option<&BestPolicy> {
        self.best.as_ref()
    }

    /// Running training statistics
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Run one episode from a fresh reset
    ///
    /// Actions are sampled when `explore` is set and chosen greedily
    /// otherwise. Exploring episodes record every step, then receive their
    /// discounted returns and advantages against the baseline in effect at
    /// the start of the episode; the baseline then moves towards the
    /// episode's first return. Greedy episodes leave the baseline untouched
    /// and return an empty trajectory.
    pub fn run_episode<O>(
        &mut self,
        explore: bool,
        max_steps: usize,
        observer: &mut O,
    ) -> Result<EpisodeOutcome>
    where
        O: TrainingObserver + ?Sized,
    {
        let mut trajectory =
            if explore { Trajectory::with_capacity(max_steps) } else { Trajectory::new() };
        let mut state = self.env.reset()?;
        let mut total_reward = 0.0;
        let mut steps = 0;
        let mut terminated = false;

        for t in 0..max_steps {
            let input = state.as_array();
            let decision = if explore {
                self.policy.act(&input)
            } else {
                self.policy.act_greedy(&input)
            };
            let action = to_action(&decision)?;
            let result = self.env.step(action)?;
            total_reward += result.reward;
            steps += 1;

            observer.on_step(&StepView {
                step: t,
                explore,
                state,
                forward: &decision.forward,
                action,
                next_state: result.observation,
                reward: result.reward,
                terminated: result.terminated,
            });

            if explore {
                let Decision { action: index, forward } = decision;
                trajectory.push(StepRecord::new(
                    input.to_vec(),
                    forward.hidden,
                    forward.probs,
                    index,
                    result.reward,
                ));
            }

            state = result.observation;
            if result.terminated {
                terminated = true;
                break;
            }
        }

        if explore {
            if let Some(first_return) = self.assign_advantages(&mut trajectory) {
                let alpha = self.config.baseline_alpha;
                self.baseline = (1.0 - alpha) * self.baseline + alpha * first_return;
            }
        }

        Ok(EpisodeOutcome { trajectory, total_reward, steps, terminated })
    }

    /// Fill returns and advantages; returns the episode's first return
    fn assign_advantages(&self, trajectory: &mut Trajectory) -> Option<f64> {
        trajectory.compute_returns(self.config.gamma);
        trajectory.assign_advantages(self.baseline);
        trajectory.first_return()
    }

    /// Run one exploring episode and learn from it
    ///
    /// Applies the policy update, folds the episode into the statistics and
    /// snapshots the weights when the episode reward strictly beats the best
    /// so far.
    pub fn train_episode<O>(&mut self, observer: &mut O) -> Result<EpisodeReport>
    where
        O: TrainingObserver + ?Sized,
    {
        let outcome = self.run_episode(true, self.config.max_steps, observer)?;
        let grad_norm = self.policy.update(outcome.trajectory.records());

        self.stats.record_episode(
            outcome.total_reward,
            outcome.trajectory.len(),
            self.config.reward_avg_alpha,
        );
        let episode = self.stats.episodes;

        let new_best = outcome.total_reward > self.best_reward;
        if new_best {
            self.best_reward = outcome.total_reward;
            self.best = Some(BestPolicy {
                weights: self.policy.snapshot(),
                reward: outcome.total_reward,
                episode,
            });
            tracing::info!("Episode {} | New best reward: {:.1}", episode, outcome.total_reward);
        }

        let report = EpisodeReport {
            episode,
            steps: outcome.steps,
            total_reward: outcome.total_reward,
            moving_avg_reward: self.stats.moving_avg_reward,
            best_reward: self.best_reward,
            baseline: self.baseline,
            new_best,
            grad_norm,
        };

        tracing::debug!(
            episode,
            steps = report.steps,
            reward = report.total_reward,
            baseline = report.baseline,
            grad_norm,
            "Finished training episode"
        );
        if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
            tracing::info!(
                "Episode {} | Reward: {:.1} | Avg: {:.1} | Best: {:.1} | Steps: {}",
                episode,
                report.total_reward,
                report.moving_avg_reward,
                report.best_reward,
                self.stats.total_steps,
            );
        }

        observer.on_episode(&report, &self.policy);
        Ok(report)
    }

    /// Train episode after episode until the scheduler says stop
    ///
    /// The scheduler is asked once after every episode, after its update has
    /// been applied. Returns the number of episodes run.
    pub fn train<S, O>(&mut self, scheduler: &mut S, observer: &mut O) -> Result<usize>
    where
        S: EpisodeScheduler + ?Sized,
        O: TrainingObserver + ?Sized,
    {
        tracing::info!("Starting continuous training at episode {}", self.stats.episodes + 1);
        let mut episodes = 0;
        loop {
            let report = self.train_episode(observer)?;
            episodes += 1;
            if scheduler.yield_between(&report).is_break() {
                break;
            }
        }
        tracing::info!(
            "Stopped training after {} episodes (best reward {:.1})",
            episodes,
            self.best_reward
        );
        Ok(episodes)
    }

    /// Replay the best policy greedily for up to `duration`
    ///
    /// Swaps the best weights in, runs one greedy episode until it fails or
    /// the time is up, and swaps the live weights back, also when the
    /// rollout errors. Returns `None` when no best policy exists yet.
    ///
    /// Steps are paced by `config.replay_step_interval`; with no interval the
    /// rollout runs as fast as the observer lets it.
    pub fn play_best<O>(
        &mut self,
        duration: Duration,
        observer: &mut O,
    ) -> Result<Option<PlaybackSummary>>
    where
        O: TrainingObserver + ?Sized,
    {
        let Some(best) = self.best.as_ref() else {
            tracing::warn!("No best policy to replay yet");
            return Ok(None);
        };

        let live = self.policy.snapshot();
        self.policy.restore(&best.weights)?;
        tracing::info!("Replaying best policy (reward {:.1}) for {:?}", best.reward, duration);

        let result = self.greedy_rollout(duration, observer);
        self.policy.restore(&live)?;
        result.map(Some)
    }

    fn greedy_rollout<O>(&mut self, duration: Duration, observer: &mut O) -> Result<PlaybackSummary>
    where
        O: TrainingObserver + ?Sized,
    {
        let start = Instant::now();
        let mut state = self.env.reset()?;
        let mut steps = 0;
        let mut total_reward = 0.0;
        let mut terminated = false;
        let interval = self.config.replay_step_interval;

        while !terminated && start.elapsed() < duration {
            let decision = self.policy.act_greedy(&state.as_array());
            let action = to_action(&decision)?;
            let result = self.env.step(action)?;

            observer.on_step(&StepView {
                step: steps,
                explore: false,
                state,
                forward: &decision.forward,
                action,
                next_state: result.observation,
                reward: result.reward,
                terminated: result.terminated,
            });

            steps += 1;
            total_reward += result.reward;
            terminated = result.terminated;
            state = result.observation;

            if let Some(interval) = interval {
                if !terminated {
                    thread::sleep(interval.min(duration.saturating_sub(start.elapsed())));
                }
            }
        }

        Ok(PlaybackSummary { steps, total_reward, terminated, elapsed: start.elapsed() })
    }
}

fn to_action(decision: &Decision) -> Result<Action> {
    Action::from_index(decision.action)
        .ok_or_else(|| anyhow!("policy chose action {} outside the action space", decision.action))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trainer(seed: u64) -> Trainer {
        Trainer::new(ReinforceConfig::new().seed(seed).log_interval(0)).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        states: Vec<CartPoleState>,
        episodes: Vec<EpisodeReport>,
    }

    impl TrainingObserver for Recorder {
        fn on_step(&mut self, view: &StepView<'_>) {
            self.states.push(view.state);
        }

        fn on_episode(&mut self, report: &EpisodeReport, _policy: &PolicyNetwork) {
            self.episodes.push(report.clone());
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Trainer::new(ReinforceConfig::new().gamma(2.0)).is_err());
        assert!(Trainer::new(ReinforceConfig::new().hidden_dim(0)).is_err());
        assert!(Trainer::new(ReinforceConfig::new().learning_rate(f64::NAN)).is_err());
    }

    #[test]
    fn test_with_parts_rejects_dimension_mismatch() {
        let config = ReinforceConfig::new();
        let wrong_input = PolicyNetwork::new(3, 16, 2, 0).unwrap();
        assert!(Trainer::with_parts(config.clone(), CartPole::new(0), wrong_input).is_err());

        let wrong_output = PolicyNetwork::new(4, 16, 3, 0).unwrap();
        assert!(Trainer::with_parts(config.clone(), CartPole::new(0), wrong_output).is_err());

        let wrong_hidden = PolicyNetwork::new(4, 8, 2, 0).unwrap();
        let err = Trainer::with_parts(config.clone(), CartPole::new(0), wrong_hidden).unwrap_err();
        assert!(err.to_string().contains("hidden units"));

        let ok = PolicyNetwork::new(4, 8, 2, 0).unwrap();
        let trainer =
            Trainer::with_parts(config.hidden_dim(8).learning_rate(0.01), CartPole::new(0), ok)
                .unwrap();
        assert_eq!(trainer.policy().learning_rate(), 0.01);
        assert_eq!(trainer.config().hidden_dim, trainer.policy().hidden_dim());
    }

    #[test]
    fn test_exploring_episode_records_every_step() {
        let mut trainer = trainer(1);
        let mut recorder = Recorder::default();
        let outcome = trainer.run_episode(true, 500, &mut recorder).unwrap();

        assert_eq!(outcome.trajectory.len(), outcome.steps);
        assert_eq!(recorder.states.len(), outcome.steps);
        assert_eq!(outcome.total_reward, outcome.trajectory.total_reward());
        for (record, state) in outcome.trajectory.iter().zip(&recorder.states) {
            assert_eq!(record.state, state.as_array().to_vec());
            assert_eq!(record.hidden.len(), 16);
            assert!((record.probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        if outcome.terminated {
            assert_eq!(outcome.trajectory.records().last().unwrap().reward, 0.0);
            assert_eq!(outcome.total_reward, (outcome.steps - 1) as f64);
        }
    }

    #[test]
    fn test_step_cap() {
        let mut trainer = trainer(2);
        let outcome = trainer.run_episode(true, 3, &mut ()).unwrap();
        assert!(outcome.steps <= 3);
        assert!(outcome.trajectory.len() <= 3);
    }

    #[test]
    fn test_baseline_tracks_first_return() {
        let mut trainer = trainer(3);
        assert_eq!(trainer.baseline(), 0.0);

        let first = trainer.run_episode(true, 500, &mut ()).unwrap();
        let g0 = first.trajectory.first_return().unwrap();
        for record in first.trajectory.iter() {
            assert_eq!(record.advantage, record.ret);
        }
        assert!((trainer.baseline() - 0.05 * g0).abs() < 1e-12);

        let before = trainer.baseline();
        let second = trainer.run_episode(true, 500, &mut ()).unwrap();
        let g1 = second.trajectory.first_return().unwrap();
        for record in second.trajectory.iter() {
            assert!((record.advantage - (record.ret - before)).abs() < 1e-12);
        }
        assert!((trainer.baseline() - (0.95 * before + 0.05 * g1)).abs() < 1e-12);
    }

    #[test]
    fn test_greedy_episode_leaves_learning_state_alone() {
        let mut trainer = trainer(4);
        trainer.train_episode(&mut ()).unwrap();
        let baseline = trainer.baseline();
        let weights = trainer.policy().snapshot();

        let outcome = trainer.run_episode(false, 500, &mut ()).unwrap();
        assert!(outcome.trajectory.is_empty());
        assert!(outcome.steps > 0);
        assert_eq!(trainer.baseline(), baseline);
        assert_eq!(trainer.policy().weights(), &weights);
    }

    #[test]
    fn test_train_episode_updates_and_checkpoints() {
        let mut trainer = trainer(5);
        let before = trainer.policy().snapshot();
        let mut recorder = Recorder::default();
        let report = trainer.train_episode(&mut recorder).unwrap();

        assert_eq!(report.episode, 1);
        assert_eq!(recorder.episodes, vec![report.clone()]);
        assert_eq!(trainer.stats().episodes, 1);
        assert_eq!(trainer.stats().total_steps, report.steps);
        assert_ne!(trainer.policy().weights(), &before);

        if report.total_reward > 0.0 {
            assert!(report.new_best);
            let best = trainer.best().unwrap();
            assert_eq!(best.reward, report.total_reward);
            assert_eq!(&best.weights, trainer.policy().weights());
        }
    }

    #[test]
    fn test_best_only_on_strict_improvement() {
        let mut trainer = trainer(6);
        for _ in 0..30 {
            let previous_best = trainer.best_reward();
            let report = trainer.train_episode(&mut ()).unwrap();
            assert_eq!(report.new_best, report.total_reward > previous_best);
            assert!(trainer.best_reward() >= previous_best);
            if !report.new_best {
                assert_eq!(trainer.best_reward(), previous_best);
            }
        }
    }

    #[test]
    fn test_train_stops_at_yield_point() {
        let mut trainer = trainer(7);
        let mut limit = crate::train::control::EpisodeLimit::new(4);
        let episodes = trainer.train(&mut limit, &mut ()).unwrap();
        assert_eq!(episodes, 4);
        assert_eq!(trainer.stats().episodes, 4);
    }

    #[test]
    fn test_play_best_without_best_is_none() {
        let mut trainer = trainer(8);
        let result = trainer.play_best(Duration::from_millis(10), &mut ()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_replay_is_paced_by_step_interval() {
        let config = ReinforceConfig::new()
            .seed(12)
            .log_interval(0)
            .replay_step_interval(Duration::from_millis(10));
        let mut trainer = Trainer::new(config).unwrap();
        while trainer.best().is_none() {
            trainer.train_episode(&mut ()).unwrap();
        }

        let summary = trainer.play_best(Duration::from_millis(100), &mut ()).unwrap().unwrap();
        assert!(summary.steps >= 1);
        // At most one step per interval fits into the duration
        assert!(summary.steps <= 11, "took {} steps in 100ms", summary.steps);
        assert!(summary.terminated || summary.elapsed >= Duration::from_millis(100));
    }

    #[test]
    fn test_play_best_restores_live_weights() {
        let mut trainer = trainer(9);
        while trainer.best().is_none() {
            trainer.train_episode(&mut ()).unwrap();
        }
        // Move the live weights away from the snapshot
        trainer.train_episode(&mut ()).unwrap();
        let live = trainer.policy().snapshot();

        let mut recorder = Recorder::default();
        let summary = trainer
            .play_best(Duration::from_secs(1), &mut recorder)
            .unwrap()
            .expect("best policy exists");

        assert_eq!(trainer.policy().weights(), &live);
        assert_eq!(summary.steps, recorder.states.len());
        assert!(summary.steps > 0);
    }
}
