//! Agent-driven play: how a decision policy sees the board, how its answer
//! becomes a turn, and how a whole game is scored.
//!
//! # Architecture
//!
//! ```text
//! Session Runner (one game to completion, fitness)
//!     ↓ uses
//! Action Codec (board → features, outputs → action)
//!     ↓ uses
//! Agent (features → outputs)
//! ```
//!
//! - [`Agent`] - any policy mapping a feature vector to an output vector
//! - [`action_codec`] - feature encoding, action decoding and fitness
//! - [`session_runner`] - drives one [`GameSession`](slidris_engine::GameSession)
//!   under agent control with move and stall limits
//!
//! Every run owns its session, so runs for different agents can execute
//! concurrently as long as the agents themselves are `Sync`.

use std::fmt;

pub mod action_codec;
pub mod session_runner;

/// A decision policy.
///
/// Receives [`action_codec::FEATURE_LEN`] features and is expected to return
/// [`action_codec::OUTPUT_LEN`] values. Activation takes `&self` so that one
/// agent can be evaluated from several threads.
pub trait Agent: fmt::Debug + Send + Sync {
    fn activate(&self, features: &[f32]) -> Vec<f32>;
}

impl<A> Agent for &A
where
    A: Agent + ?Sized,
{
    fn activate(&self, features: &[f32]) -> Vec<f32> {
        (**self).activate(features)
    }
}

impl<A> Agent for Box<A>
where
    A: Agent + ?Sized,
{
    fn activate(&self, features: &[f32]) -> Vec<f32> {
        (**self).activate(features)
    }
}

/// Agent that answers every board with the same output.
///
/// Useful as a baseline and for exercising stall handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantAgent {
    output: Vec<f32>,
}

impl ConstantAgent {
    #[must_use]
    pub fn new(output: Vec<f32>) -> Self {
        Self { output }
    }

    /// An agent whose output is all zeros.
    #[must_use]
    pub fn zeros() -> Self {
        Self::new(vec![0.0; action_codec::OUTPUT_LEN])
    }
}

impl Agent for ConstantAgent {
    fn activate(&self, _features: &[f32]) -> Vec<f32> {
        self.output.clone()
    }
}
