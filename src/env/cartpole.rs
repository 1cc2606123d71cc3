//! Cart-pole environment
//!
//! A pole is hinged to a cart that moves along a frictionless track. The
//! controller pushes the cart left or right with a fixed force each step and
//! must keep the pole upright and the cart on the track.
//!
//! # Physics
//!
//! - State: [x, x_dot, theta, theta_dot] (cart position, cart velocity, pole
//!   angle from vertical, pole angular velocity)
//! - Actions: `Left` (push with -10 N) or `Right` (push with +10 N)
//! - Reward: +1 for each step that does not end the episode, 0 for the one
//!   that does
//! - Termination: |theta| > 12° or |x| > 2.4
//!
//! The simulator never truncates on its own; step caps belong to the caller.

use anyhow::Result;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    env::{Environment, SpaceInfo, SpaceType, StepResult},
    utils::random::sample_normal,
};

/// Standard deviation of each component of a freshly reset state
const RESET_STD: f64 = 0.05;

/// Discrete control applied to the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Push the cart towards negative x
    Left,
    /// Push the cart towards positive x
    Right,
}

impl Action {
    /// All actions in network output order
    pub const ALL: [Action; 2] = [Action::Left, Action::Right];

    /// Index of this action in the policy output
    pub fn index(self) -> usize {
        match self {
            Action::Left => 0,
            Action::Right => 1,
        }
    }

    /// Action for a policy output index
    pub fn from_index(index: usize) -> Option<Action> {
        Self::ALL.get(index).copied()
    }

    /// Signed force for the given magnitude
    pub fn force(self, magnitude: f64) -> f64 {
        match self {
            Action::Left => -magnitude,
            Action::Right => magnitude,
        }
    }
}

/// Continuous state of the cart-pole system
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartPoleState {
    /// Cart position
    pub x: f64,
    /// Cart velocity
    pub x_dot: f64,
    /// Pole angle from vertical (radians)
    pub theta: f64,
    /// Pole angular velocity
    pub theta_dot: f64,
}

impl CartPoleState {
    /// Number of state components
    pub const DIM: usize = 4;

    /// Create a state from its components
    pub fn new(x: f64, x_dot: f64, theta: f64, theta_dot: f64) -> Self {
        Self { x, x_dot, theta, theta_dot }
    }

    /// State as [x, x_dot, theta, theta_dot]
    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.x_dot, self.theta, self.theta_dot]
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 4]> for CartPoleState {
    fn from(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }
}

/// Cart-pole environment
///
/// Owns its state and a seeded random generator used only by `reset`, so
/// runs are reproducible for a given seed and `step` is a pure function of
/// state and action.
#[derive(Debug, Clone)]
pub struct CartPole {
    state: CartPoleState,

    // Episode tracking
    steps: usize,

    // Physics constants
    gravity: f64,
    mass_cart: f64,
    mass_pole: f64,
    total_mass: f64,
    length: f64,           // Half-length of pole
    pole_mass_length: f64, // mass_pole * length
    force_mag: f64,
    tau: f64, // Time step

    // Thresholds
    theta_threshold: f64,
    x_threshold: f64,

    rng: StdRng,
}

impl CartPole {
    /// Create a new environment whose resets are driven by `seed`
    ///
    /// Physics constants:
    /// - gravity = 9.8 m/s²
    /// - cart mass = 1.0 kg
    /// - pole mass = 0.1 kg
    /// - pole half-length = 0.5 m
    /// - force magnitude = 10.0 N
    /// - timestep = 0.02 s
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a new environment seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        let gravity = 9.8;
        let mass_cart = 1.0;
        let mass_pole = 0.1;
        let total_mass = mass_cart + mass_pole;
        let length = 0.5;
        let pole_mass_length = mass_pole * length;
        let force_mag = 10.0;
        let tau = 0.02;
        let theta_threshold = 12.0 * std::f64::consts::PI / 180.0; // ~0.2094 radians
        let x_threshold = 2.4;

        let mut env = Self {
            state: CartPoleState::default(),
            steps: 0,
            gravity,
            mass_cart,
            mass_pole,
            total_mass,
            length,
            pole_mass_length,
            force_mag,
            tau,
            theta_threshold,
            x_threshold,
            rng,
        };
        env.reset_state();
        env
    }

    /// Current state
    pub fn state(&self) -> CartPoleState {
        self.state
    }

    /// Overwrite the current state, e.g. to stage a scenario
    pub fn set_state(&mut self, state: CartPoleState) {
        self.state = state;
    }

    /// Steps taken since the last reset
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Cart mass (kg)
    pub fn mass_cart(&self) -> f64 {
        self.mass_cart
    }

    /// Half-length of the pole, for rendering
    pub fn half_pole_length(&self) -> f64 {
        self.length
    }

    /// Track half-width beyond which the episode ends
    pub fn x_threshold(&self) -> f64 {
        self.x_threshold
    }

    /// Pole angle (radians) beyond which the episode ends
    pub fn theta_threshold(&self) -> f64 {
        self.theta_threshold
    }

    /// Sample a new state around equilibrium
    ///
    /// Each component is drawn independently from N(0, 0.05²).
    fn reset_state(&mut self) {
        self.state = CartPoleState {
            x: sample_normal(&mut self.rng, RESET_STD),
            x_dot: sample_normal(&mut self.rng, RESET_STD),
            theta: sample_normal(&mut self.rng, RESET_STD),
            theta_dot: sample_normal(&mut self.rng, RESET_STD),
        };
        self.steps = 0;
    }

    /// Advance the physics by one timestep
    ///
    /// ```text
    /// temp = (force + pole_mass_length * theta_dot² * sin(theta)) / total_mass
    /// theta_acc = (g * sin(theta) - cos(theta) * temp) /
    ///             (length * (4/3 - mass_pole * cos²(theta) / total_mass))
    /// x_acc = temp - pole_mass_length * theta_acc * cos(theta) / total_mass
    /// ```
    ///
    /// Velocities are integrated before positions (semi-implicit Euler).
    fn physics_step(&mut self, action: Action) {
        let force = action.force(self.force_mag);
        let s = &mut self.state;

        let cos_theta = s.theta.cos();
        let sin_theta = s.theta.sin();

        let temp =
            (force + self.pole_mass_length * s.theta_dot * s.theta_dot * sin_theta) / self.total_mass;
        let theta_acc = (self.gravity * sin_theta - cos_theta * temp)
            / (self.length * (4.0 / 3.0 - self.mass_pole * cos_theta * cos_theta / self.total_mass));
        let x_acc = temp - self.pole_mass_length * theta_acc * cos_theta / self.total_mass;

        s.x_dot += self.tau * x_acc;
        s.x += self.tau * s.x_dot;
        s.theta_dot += self.tau * theta_acc;
        s.theta += self.tau * s.theta_dot;
    }

    /// Check if the pole fell or the cart left the track
    fn is_terminated(&self) -> bool {
        let s = &self.state;
        s.x < -self.x_threshold
            || s.x > self.x_threshold
            || s.theta < -self.theta_threshold
            || s.theta > self.theta_threshold
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Environment for CartPole {
    type Observation = CartPoleState;
    type Action = Action;

    fn reset(&mut self) -> Result<Self::Observation> {
        self.reset_state();
        Ok(self.state)
    }

    fn step(&mut self, action: Self::Action) -> Result<StepResult<Self::Observation>> {
        self.physics_step(action);
        self.steps += 1;
        debug_assert!(self.state.is_finite(), "non-finite cart-pole state {:?}", self.state);

        let terminated = self.is_terminated();
        let reward = if terminated { 0.0 } else { 1.0 };

        Ok(StepResult { observation: self.state, reward, terminated })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![CartPoleState::DIM], dtype: SpaceType::Continuous }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![], dtype: SpaceType::Discrete(Action::ALL.len()) }
    }
}
