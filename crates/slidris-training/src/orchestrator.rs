//! The generation loop.
//!
//! Per generation the [`Trainer`]:
//!
//! 1. waits while paused, and ends the run if stopped or the generation
//!    limit is reached
//! 2. plays one game per population member on its own freshly seeded board
//!    (sequentially or on scoped threads)
//! 3. hands the fitness vector to the optimizer
//! 4. optionally replays the best member's game to an observer
//! 5. records `(generation, best, average)` fitness
//! 6. asks the optimizer to evolve
//!
//! # Evaluation
//!
//! Board seeds are drawn from the trainer's own generator before any game
//! starts, one per member in population order. Parallel runs spawn one
//! scoped thread per member over the borrowed population; results are
//! collected in population order, so sequential and parallel runs with the
//! same seed produce identical records.
//!
//! # Control
//!
//! [`TrainingControl`] is shared with other threads (the CLI reads it from
//! stdin). Pause and stop are only honoured between generations; a
//! generation that has started is always evaluated completely. Stopping a
//! paused run wakes it up and ends it.
//!
//! # Records
//!
//! Each generation yields a [`GenerationRecord`]. The run returns them in a
//! [`TrainingRecord`] together with the fittest genome seen in any
//! generation (as ranked by [`Optimizer::best`]) and the highest game score.
//!
//! # Current Limitations
//!
//! - Every member plays a single game per generation, so fitness is noisy
//!   from one board to the next.
//! - The best-member replay runs on the training thread and delays the next
//!   generation by one game.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread,
};

use rand::Rng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use slidris_agent::{
    Agent,
    session_runner::{SessionObserver, SessionOutcome, SessionRunner},
};
use slidris_engine::BoardSeed;
use tracing::{debug, info};

use crate::{Optimizer, TrainingError, config::TrainingConfig};

#[derive(Debug, Default)]
struct ControlFlags {
    paused: bool,
    stopped: bool,
}

/// Cloneable handle for pausing, resuming and stopping a training run from
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct TrainingControl {
    shared: Arc<(Mutex<ControlFlags>, Condvar)>,
}

impl TrainingControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, ControlFlags> {
        self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pause(&self) {
        self.flags().paused = true;
    }

    pub fn resume(&self) {
        self.flags().paused = false;
        self.shared.1.notify_all();
    }

    /// Ends the run at the next generation boundary, even while paused.
    pub fn stop(&self) {
        self.flags().stopped = true;
        self.shared.1.notify_all();
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flags().paused
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.flags().stopped
    }

    /// Blocks while paused. Returns `false` once the run has been stopped.
    pub fn wait_while_paused(&self) -> bool {
        let (lock, condvar) = &*self.shared;
        let flags = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let flags = condvar
            .wait_while(flags, |flags| flags.paused && !flags.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        !flags.stopped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: f32,
    pub avg_fitness: f32,
}

impl GenerationRecord {
    #[must_use]
    pub fn from_fitness(generation: usize, fitness: &[f32]) -> Self {
        let best_fitness = fitness.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        #[expect(clippy::cast_precision_loss)]
        let avg_fitness = if fitness.is_empty() {
            0.0
        } else {
            fitness.iter().sum::<f32>() / fitness.len() as f32
        };
        Self {
            generation,
            best_fitness: if fitness.is_empty() { 0.0 } else { best_fitness },
            avg_fitness,
        }
    }
}

/// Per-generation history of a run, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub generations: Vec<GenerationRecord>,
}

#[derive(Debug, Clone)]
pub struct BestGenome<G> {
    pub genome: G,
    pub fitness: f32,
    pub generation: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary<G> {
    pub record: TrainingRecord,
    /// Fittest genome seen in any generation.
    pub best: Option<BestGenome<G>>,
    /// Highest game score seen in any generation.
    pub best_ever_score: u64,
}

/// Receives progress from a training run. All methods default to doing
/// nothing.
pub trait TrainingObserver {
    fn on_generation(&mut self, record: &GenerationRecord) {
        let _ = record;
    }

    /// When this returns an observer, the best member's game of every
    /// generation is replayed into it.
    fn best_replay_observer(&mut self) -> Option<&mut dyn SessionObserver> {
        None
    }
}

impl TrainingObserver for () {}

/// Runs the generation loop for an [`Optimizer`].
///
/// # Example
///
/// ```
/// use slidris_training::{
///     Optimizer,
///     config::TrainingConfig,
///     genetic::NeuroEvolution,
///     orchestrator::{Trainer, TrainingControl},
/// };
///
/// let config = TrainingConfig {
///     population_size: 4,
///     elite_count: 1,
///     hidden_size: 2,
///     move_limit: 20,
///     max_generations: Some(2),
///     seed: Some(1),
///     ..Default::default()
/// };
/// let mut optimizer = NeuroEvolution::new(&config, config.rng(0)).unwrap();
/// let mut trainer = Trainer::new(&config, config.rng(1), TrainingControl::new()).unwrap();
///
/// let summary = trainer.run(&mut optimizer, &mut ()).unwrap();
/// assert_eq!(summary.record.generations.len(), 2);
/// assert_eq!(optimizer.generation(), 2);
/// assert!(summary.best.is_some());
/// ```
#[derive(Debug)]
pub struct Trainer {
    runner: SessionRunner,
    parallel: bool,
    max_generations: Option<usize>,
    control: TrainingControl,
    rng: Pcg32,
}

impl Trainer {
    /// Validates `config` and takes the run limits from it.
    pub fn new(
        config: &TrainingConfig,
        rng: Pcg32,
        control: TrainingControl,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        Ok(Self {
            runner: config.runner(),
            parallel: config.parallel,
            max_generations: config.max_generations,
            control,
            rng,
        })
    }

    #[must_use]
    pub fn control(&self) -> &TrainingControl {
        &self.control
    }

    pub fn run<O, T>(
        &mut self,
        optimizer: &mut O,
        observer: &mut T,
    ) -> Result<TrainingSummary<O::Genome>, TrainingError>
    where
        O: Optimizer + ?Sized,
        T: TrainingObserver + ?Sized,
    {
        let mut summary = TrainingSummary {
            record: TrainingRecord::default(),
            best: None,
            best_ever_score: 0,
        };

        loop {
            if self.control.is_paused() {
                info!("training paused");
            }
            if !self.control.wait_while_paused() {
                info!("training stopped");
                break;
            }
            if self
                .max_generations
                .is_some_and(|max| summary.record.generations.len() >= max)
            {
                info!(generations = summary.record.generations.len(), "generation limit reached");
                break;
            }

            let generation = optimizer.generation();
            let seeds: Vec<BoardSeed> = (0..optimizer.population().len())
                .map(|_| self.rng.random())
                .collect();
            let outcomes = self.evaluate(optimizer.population(), &seeds)?;
            for (member, outcome) in outcomes.iter().enumerate() {
                debug!(
                    generation,
                    member,
                    score = outcome.score,
                    moves = outcome.successful_moves,
                    end_reason = ?outcome.end_reason,
                    fitness = outcome.fitness,
                    "member evaluated"
                );
            }

            let fitness: Vec<f32> = outcomes.iter().map(|o| o.fitness).collect();
            optimizer.assign_fitness(&fitness)?;

            let generation_score = outcomes.iter().map(|o| o.score).max().unwrap_or(0);
            summary.best_ever_score = summary.best_ever_score.max(generation_score);

            let record = GenerationRecord::from_fitness(generation, &fitness);
            info!(
                generation,
                best_fitness = record.best_fitness,
                avg_fitness = record.avg_fitness,
                best_ever_score = summary.best_ever_score,
                "generation evaluated"
            );

            if let Some((best_index, best_fitness)) = optimizer.best()
                && let Some(genome) = optimizer.population().get(best_index)
            {
                if summary
                    .best
                    .as_ref()
                    .is_none_or(|best| best_fitness > best.fitness)
                {
                    summary.best = Some(BestGenome {
                        genome: genome.clone(),
                        fitness: best_fitness,
                        generation,
                    });
                }
                if let Some(replay) = observer.best_replay_observer() {
                    self.runner
                        .run_observed(genome, seeds[best_index], replay);
                }
            }

            observer.on_generation(&record);
            summary.record.generations.push(record);
            optimizer.evolve();
        }

        Ok(summary)
    }

    fn evaluate<G>(
        &self,
        genomes: &[G],
        seeds: &[BoardSeed],
    ) -> Result<Vec<SessionOutcome>, TrainingError>
    where
        G: Agent,
    {
        let runner = self.runner;
        if !self.parallel {
            return Ok(genomes
                .iter()
                .zip(seeds)
                .map(|(genome, seed)| runner.run(genome, *seed))
                .collect());
        }
        thread::scope(|s| {
            let handles: Vec<_> = genomes
                .iter()
                .zip(seeds)
                .map(|(genome, seed)| s.spawn(move || runner.run(genome, *seed)))
                .collect();
            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            joined
                .into_iter()
                .map(|result| result.map_err(|_| TrainingError::EvaluationPanicked))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slidris_agent::{ConstantAgent, action_codec::AgentAction};
    use slidris_engine::Board;

    use crate::{FitnessLengthError, config::ConfigError, genetic::NeuroEvolution};

    use super::*;

    fn config(parallel: bool, max_generations: usize) -> TrainingConfig {
        TrainingConfig {
            population_size: 4,
            elite_count: 1,
            tournament_size: 2,
            hidden_size: 2,
            move_limit: 30,
            parallel,
            max_generations: Some(max_generations),
            seed: Some(42),
            ..TrainingConfig::default()
        }
    }

    fn setup(config: &TrainingConfig) -> (NeuroEvolution, Trainer) {
        let optimizer = NeuroEvolution::new(config, config.rng(0)).unwrap();
        let trainer = Trainer::new(config, config.rng(1), TrainingControl::new()).unwrap();
        (optimizer, trainer)
    }

    #[derive(Default)]
    struct Recorder {
        generations: Vec<usize>,
        replayed_actions: usize,
        replay: ReplayCounter,
        stop_after: Option<(usize, TrainingControl)>,
    }

    #[derive(Default)]
    struct ReplayCounter(usize);

    impl SessionObserver for ReplayCounter {
        fn on_action(&mut self, _board: &Board, _action: &AgentAction) {
            self.0 += 1;
        }
    }

    impl TrainingObserver for Recorder {
        fn on_generation(&mut self, record: &GenerationRecord) {
            self.generations.push(record.generation);
            self.replayed_actions = self.replay.0;
            if let Some((after, control)) = &self.stop_after
                && self.generations.len() >= *after
            {
                control.stop();
            }
        }

        fn best_replay_observer(&mut self) -> Option<&mut dyn SessionObserver> {
            Some(&mut self.replay)
        }
    }

    #[test]
    fn test_generation_record_stats() {
        let record = GenerationRecord::from_fitness(3, &[1.0, 4.0, 1.0]);
        assert_eq!(record.generation, 3);
        assert!((record.best_fitness - 4.0).abs() < f32::EPSILON);
        assert!((record.avg_fitness - 2.0).abs() < f32::EPSILON);
        let empty = GenerationRecord::from_fitness(0, &[]);
        assert!(empty.best_fitness.abs() < f32::EPSILON);
        assert!(empty.avg_fitness.abs() < f32::EPSILON);
    }

    #[test]
    fn test_training_record_json_shape() {
        let record = TrainingRecord {
            generations: vec![GenerationRecord {
                generation: 0,
                best_fitness: 1.5,
                avg_fitness: 0.5,
            }],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "generations": [{ "generation": 0, "best_fitness": 1.5, "avg_fitness": 0.5 }]
            })
        );
    }

    #[test]
    fn test_runs_until_generation_limit() {
        for parallel in [false, true] {
            let config = config(parallel, 3);
            let (mut optimizer, mut trainer) = setup(&config);
            let mut recorder = Recorder::default();
            let summary = trainer.run(&mut optimizer, &mut recorder).unwrap();

            assert_eq!(recorder.generations, [0, 1, 2]);
            assert_eq!(optimizer.generation(), 3);
            let generations: Vec<_> = summary
                .record
                .generations
                .iter()
                .map(|r| r.generation)
                .collect();
            assert_eq!(generations, [0, 1, 2]);
            let best = summary.best.unwrap();
            let top = summary
                .record
                .generations
                .iter()
                .map(|r| r.best_fitness)
                .fold(f32::NEG_INFINITY, f32::max);
            assert!((best.fitness - top).abs() < f32::EPSILON);
            assert!(recorder.replayed_actions > 0);
        }
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let (mut a_opt, mut a_trainer) = setup(&config(false, 2));
        let (mut b_opt, mut b_trainer) = setup(&config(true, 2));
        let a = a_trainer.run(&mut a_opt, &mut ()).unwrap();
        let b = b_trainer.run(&mut b_opt, &mut ()).unwrap();
        assert_eq!(a.record, b.record);
        assert_eq!(a.best_ever_score, b.best_ever_score);
    }

    #[test]
    fn test_stopped_before_start_runs_nothing() {
        let (mut optimizer, mut trainer) = setup(&config(false, 5));
        trainer.control().stop();
        let summary = trainer.run(&mut optimizer, &mut ()).unwrap();
        assert!(summary.record.generations.is_empty());
        assert!(summary.best.is_none());
        assert_eq!(optimizer.generation(), 0);
    }

    #[test]
    fn test_stop_takes_effect_at_generation_boundary() {
        let (mut optimizer, mut trainer) = setup(&config(false, 10));
        let mut recorder = Recorder {
            stop_after: Some((2, trainer.control().clone())),
            ..Recorder::default()
        };
        let summary = trainer.run(&mut optimizer, &mut recorder).unwrap();
        assert_eq!(summary.record.generations.len(), 2);
        assert_eq!(optimizer.generation(), 2);
    }

    #[test]
    fn test_pause_blocks_until_resumed() {
        let (mut optimizer, mut trainer) = setup(&config(false, 1));
        let control = trainer.control().clone();
        control.pause();
        assert!(control.is_paused());
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            control.resume();
        });
        let summary = trainer.run(&mut optimizer, &mut ()).unwrap();
        resumer.join().unwrap();
        assert_eq!(summary.record.generations.len(), 1);
        assert!(!trainer.control().is_paused());
    }

    #[test]
    fn test_stop_releases_a_paused_run() {
        let (mut optimizer, mut trainer) = setup(&config(false, 3));
        let control = trainer.control().clone();
        control.pause();
        control.stop();
        let summary = trainer.run(&mut optimizer, &mut ()).unwrap();
        assert!(summary.record.generations.is_empty());
    }

    #[derive(Debug)]
    struct ShortFitnessOptimizer {
        population: Vec<ConstantAgent>,
    }

    impl Optimizer for ShortFitnessOptimizer {
        type Genome = ConstantAgent;

        fn generation(&self) -> usize {
            0
        }

        fn population(&self) -> &[ConstantAgent] {
            &self.population
        }

        fn assign_fitness(&mut self, fitness: &[f32]) -> Result<(), FitnessLengthError> {
            Err(FitnessLengthError {
                expected: fitness.len() + 1,
                actual: fitness.len(),
            })
        }

        fn best(&self) -> Option<(usize, f32)> {
            None
        }

        fn evolve(&mut self) {}
    }

    #[test]
    fn test_fitness_length_error_is_reported() {
        let config = config(false, 1);
        let mut trainer = Trainer::new(&config, config.rng(1), TrainingControl::new()).unwrap();
        let mut optimizer = ShortFitnessOptimizer {
            population: vec![ConstantAgent::zeros(); 2],
        };
        let err = trainer.run(&mut optimizer, &mut ()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::FitnessLength(FitnessLengthError {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[derive(Debug)]
    struct FixedBestOptimizer {
        population: Vec<ConstantAgent>,
        generation: usize,
    }

    impl Optimizer for FixedBestOptimizer {
        type Genome = ConstantAgent;

        fn generation(&self) -> usize {
            self.generation
        }

        fn population(&self) -> &[ConstantAgent] {
            &self.population
        }

        fn assign_fitness(&mut self, _fitness: &[f32]) -> Result<(), FitnessLengthError> {
            Ok(())
        }

        fn best(&self) -> Option<(usize, f32)> {
            Some((1, 42.0))
        }

        fn evolve(&mut self) {
            self.generation += 1;
        }
    }

    #[test]
    fn test_best_genome_comes_from_optimizer_ranking() {
        let config = config(false, 2);
        let mut trainer = Trainer::new(&config, config.rng(1), TrainingControl::new()).unwrap();
        let marked = ConstantAgent::new(vec![1.0; 3]);
        let mut optimizer = FixedBestOptimizer {
            population: vec![ConstantAgent::zeros(), marked.clone()],
            generation: 0,
        };
        let summary = trainer.run(&mut optimizer, &mut ()).unwrap();
        let best = summary.best.unwrap();
        assert_eq!(best.genome, marked);
        assert!((best.fitness - 42.0).abs() < f32::EPSILON);
        assert_eq!(best.generation, 0);
        assert_eq!(summary.record.generations.len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrainingConfig {
            tournament_size: 0,
            ..config(false, 1)
        };
        let err = Trainer::new(&config, config.rng(1), TrainingControl::new()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::Config(ConfigError::EmptyTournament)
        ));
    }
}
