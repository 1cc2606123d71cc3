//! Experience storage for on-policy training
//!
//! Episodes are collected into a [`Trajectory`], turned into discounted
//! returns and advantages, consumed by one policy update and discarded.

pub mod trajectory;

pub use trajectory::{StepRecord, Trajectory, discounted_returns};
