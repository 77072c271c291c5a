//! Training of board-playing agents by neuro-evolution.
//!
//! # How Training Works
//!
//! 1. **Population** - random feedforward networks ([`network`])
//! 2. **Evaluation** - every network plays one game on a fresh board
//!    ([`slidris_agent::session_runner`])
//! 3. **Fitness** - the game's score, with a penalty for early stalls
//! 4. **Reproduction** - elitism, tournament selection, crossover and
//!    mutation ([`genetic`])
//! 5. **Repeat** - until stopped or a generation limit is reached
//!    ([`orchestrator`])
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (generation loop, pause/stop, records)
//!     ↓ drives
//! Optimizer (population, fitness, evolution)
//!     ↓ provides
//! Genomes (agents)
//!     ↓ evaluated by
//! Session Runner
//! ```
//!
//! The orchestrator only depends on the [`Optimizer`] trait, so any policy
//! source with `assign_fitness`/`evolve` semantics can be trained by it.

use slidris_agent::Agent;

pub mod config;
pub mod genetic;
pub mod model;
pub mod network;
pub mod orchestrator;
pub mod weights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("got {actual} fitness values for a population of {expected}")]
pub struct FitnessLengthError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("invalid training config: {_0}")]
    Config(config::ConfigError),
    #[display("fitness assignment failed: {_0}")]
    FitnessLength(FitnessLengthError),
    #[display("an evaluation thread panicked")]
    #[from(ignore)]
    EvaluationPanicked,
}

/// A population-based optimizer over agents.
///
/// Per generation the caller evaluates [`Self::population`] in order, hands
/// the fitness values back through [`Self::assign_fitness`], and then calls
/// [`Self::evolve`]. The population is never mutated between those calls.
pub trait Optimizer {
    type Genome: Agent + Clone;

    /// Index of the current generation, starting at 0.
    fn generation(&self) -> usize;

    fn population(&self) -> &[Self::Genome];

    /// Records one fitness value per population member, in population order.
    ///
    /// A length mismatch is rejected before anything is recorded.
    fn assign_fitness(&mut self, fitness: &[f32]) -> Result<(), FitnessLengthError>;

    /// Population index and fitness of the fittest member of the current
    /// generation, once fitness is assigned. Ties go to the earlier member.
    fn best(&self) -> Option<(usize, f32)>;

    /// Replaces the population with the next generation.
    fn evolve(&mut self);
}
