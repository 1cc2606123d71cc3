//! Train a REINFORCE agent to balance the cart-pole
//!
//! Trains on a background thread for a fixed wall-clock budget, streams the
//! per-episode reward curve as JSON lines, then replays the best policy and
//! saves its weights.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example train_cartpole
//! ```

use std::time::{Duration, Instant};

use anyhow::Result;
use balance_rl::{
    env::{Environment, SpaceType, cartpole::CartPole},
    train::{ReinforceConfig, StepView, Trainer, TrainingObserver, TrainingSession},
};
use crossbeam_channel::RecvTimeoutError;

/// Logs every replay step the way a renderer would draw it
struct ReplayLogger;

impl TrainingObserver for ReplayLogger {
    fn on_step(&mut self, view: &StepView<'_>) {
        tracing::debug!(
            step = view.step,
            x = view.next_state.x,
            theta = view.next_state.theta,
            action = ?view.action,
            p_right = view.forward.probs[1],
            "replay"
        );
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    tracing::info!("🚀 Starting cart-pole REINFORCE training");

    const TRAIN_TIME: Duration = Duration::from_secs(20);
    const REPLAY_TIME: Duration = Duration::from_secs(10);
    const SEED: u64 = 42;

    let config = ReinforceConfig::new()
        .seed(SEED)
        .log_interval(50)
        .replay_step_interval(Duration::from_millis(20));
    let env = CartPole::new(SEED);
    let action_dim = match env.action_space().dtype {
        SpaceType::Discrete(n) => n,
        SpaceType::Continuous => anyhow::bail!("expected a discrete action space"),
    };

    tracing::info!("Environment: cart-pole");
    tracing::info!("  Observation dim: {}", env.observation_space().size());
    tracing::info!("  Action dim: {}", action_dim);
    tracing::info!("  Hidden dim: {}", config.hidden_dim);
    tracing::info!("  Learning rate: {}", config.learning_rate);

    let mut session = TrainingSession::new(Trainer::new(config)?);
    session.start()?;

    let start = Instant::now();
    let mut received = 0usize;
    while start.elapsed() < TRAIN_TIME {
        let Some(updates) = session.updates() else { break };
        match updates.recv_timeout(Duration::from_millis(100)) {
            Ok(update) => {
                received += 1;
                if update.report.new_best {
                    println!("{}", serde_json::to_string(&update.report)?);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    session.stop()?;
    tracing::info!("✅ Training complete! ({} updates received)", received);

    if let Some(trainer) = session.trainer() {
        let stats = trainer.stats();
        tracing::info!("Total episodes: {}", stats.episodes);
        tracing::info!("Total steps: {}", stats.total_steps);
        tracing::info!("Moving average reward: {:.1}", stats.moving_avg_reward);
        tracing::info!("Best reward: {:.1}", trainer.best_reward());
    }

    match session.play_best(REPLAY_TIME, &mut ReplayLogger)? {
        Some(summary) => tracing::info!(
            "🎬 Replay: {} steps, reward {:.1}, fell: {}, {:.1}s",
            summary.steps,
            summary.total_reward,
            summary.terminated,
            summary.elapsed.as_secs_f64()
        ),
        None => tracing::warn!("No best policy to replay"),
    }

    // Save best weights
    let trainer = session.into_trainer()?;
    if let Some(best) = trainer.best() {
        let save_path = "cartpole_best_policy.json";
        std::fs::write(save_path, best.weights.to_json()?)?;
        tracing::info!("💾 Best policy (episode {}) saved to {}", best.episode, save_path);
    }

    Ok(())
}
