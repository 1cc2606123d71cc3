//! Policy network, weights and gradient
//!
//! The policy is a two-layer tanh/softmax perceptron written directly in
//! Rust. Its update is a hand-derived REINFORCE gradient rather than an
//! autodiff graph.

pub mod gradient;
pub mod mlp;
pub mod weights;

pub use gradient::PolicyGradient;
pub use mlp::{Activation, Decision, ForwardPass, PolicyNetwork, argmax, sample_index, softmax};
pub use weights::PolicyWeights;
