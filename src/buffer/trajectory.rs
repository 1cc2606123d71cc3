//! Episode trajectory storage and return computation
//!
//! A trajectory holds one record per environment step of an exploring
//! episode. Each record keeps the forward-pass values captured during the
//! rollout so the policy update reuses them instead of recomputing them.

/// One environment step of an exploring episode
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Network input: the state before the step
    pub state: Vec<f64>,

    /// Hidden-layer activation for `state`
    pub hidden: Vec<f64>,

    /// Action probabilities for `state`
    pub probs: Vec<f64>,

    /// Index of the chosen action
    pub action: usize,

    /// Immediate reward
    pub reward: f64,

    /// Discounted return from this step on (filled after the episode)
    pub ret: f64,

    /// Return minus the baseline in effect when the episode started
    pub advantage: f64,
}

impl StepRecord {
    /// Create a record whose return and advantage are not yet known
    pub fn new(state: Vec<f64>, hidden: Vec<f64>, probs: Vec<f64>, action: usize, reward: f64) -> Self {
        Self { state, hidden, probs, action, reward, ret: 0.0, advantage: 0.0 }
    }
}

/// Ordered step records of one episode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    records: Vec<StepRecord>,
}

impl Trajectory {
    /// Create an empty trajectory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty trajectory with room for `capacity` steps
    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    /// Append a step
    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no step was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in step order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Iterate over records in step order
    pub fn iter(&self) -> std::slice::Iter<'_, StepRecord> {
        self.records.iter()
    }

    /// Undiscounted sum of rewards
    pub fn total_reward(&self) -> f64 {
        self.records.iter().map(|r| r.reward).sum()
    }

    /// Discounted return of the first step, i.e. of the whole episode
    pub fn first_return(&self) -> Option<f64> {
        self.records.first().map(|r| r.ret)
    }

    /// Fill every record's `ret` with its discounted return
    pub fn compute_returns(&mut self, gamma: f64) {
        let mut g = 0.0;
        for record in self.records.iter_mut().rev() {
            g = record.reward + gamma * g;
            record.ret = g;
        }
    }

    /// Set every record's advantage to `ret - baseline`
    pub fn assign_advantages(&mut self, baseline: f64) {
        for record in &mut self.records {
            record.advantage = record.ret - baseline;
        }
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a StepRecord;
    type IntoIter = std::slice::Iter<'a, StepRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Discounted returns of a reward sequence
///
/// Right-to-left scan:
/// ```text
/// G_{n-1} = r_{n-1}
/// G_t     = r_t + γ * G_{t+1}
/// ```
pub fn discounted_returns(rewards: &[f64], gamma: f64) -> Vec<f64> {
    let mut returns = vec![0.0; rewards.len()];
    let mut g = 0.0;
    for t in (0..rewards.len()).rev() {
        g = rewards[t] + gamma * g;
        returns[t] = g;
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trajectory_from_rewards(rewards: &[f64]) -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(rewards.len());
        for &reward in rewards {
            trajectory.push(StepRecord::new(vec![0.0; 4], vec![0.0; 2], vec![0.5, 0.5], 0, reward));
        }
        trajectory
    }

    #[test]
    fn test_discounted_returns_literal() {
        let returns = discounted_returns(&[1.0, 1.0, 0.0], 0.99);
        // G2 = 0, G1 = 1 + 0.99 * 0, G0 = 1 + 0.99 * 1
        let expected = [1.99, 1.0, 0.0];
        for (got, want) in returns.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_discounted_returns_empty() {
        assert!(discounted_returns(&[], 0.99).is_empty());
    }

    #[test]
    fn test_trajectory_returns_match_free_function() {
        let rewards = [1.0, 1.0, 1.0, 1.0, 0.0];
        let mut trajectory = trajectory_from_rewards(&rewards);
        trajectory.compute_returns(0.9);

        let expected = discounted_returns(&rewards, 0.9);
        for (record, want) in trajectory.iter().zip(expected) {
            assert!((record.ret - want).abs() < 1e-12);
        }
        assert_eq!(trajectory.first_return(), Some(trajectory.records()[0].ret));
        assert_eq!(trajectory.total_reward(), 4.0);
    }

    #[test]
    fn test_advantages_subtract_baseline() {
        let mut trajectory = trajectory_from_rewards(&[1.0, 1.0, 0.0]);
        trajectory.compute_returns(0.99);
        trajectory.assign_advantages(1.0);

        let advantages: Vec<f64> = trajectory.iter().map(|r| r.advantage).collect();
        assert!((advantages[0] - 0.99).abs() < 1e-12);
        assert!(advantages[1].abs() < 1e-12);
        assert!((advantages[2] - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_trajectory() {
        let mut trajectory = Trajectory::new();
        trajectory.compute_returns(0.99);
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.first_return(), None);
        assert_eq!(trajectory.total_reward(), 0.0);
    }
}
