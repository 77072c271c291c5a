use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use slidris_agent::session_runner::{DEFAULT_FAILURE_LIMIT, DEFAULT_MOVE_LIMIT, SessionRunner};

/// Parameters of a training run.
///
/// Every field has a default, so a JSON config only needs the values it
/// changes:
///
/// ```
/// use slidris_training::config::TrainingConfig;
///
/// let config: TrainingConfig =
///     serde_json::from_str(r#"{ "population_size": 20, "parallel": false }"#).unwrap();
/// assert_eq!(config.population_size, 20);
/// assert_eq!(config.elite_count, TrainingConfig::default().elite_count);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of genomes per generation
    pub population_size: usize,
    /// Top genomes copied unchanged into the next generation
    pub elite_count: usize,
    /// Genomes drawn per tournament (larger = stronger selection pressure)
    pub tournament_size: usize,
    /// Units in the hidden layer
    pub hidden_size: usize,
    /// Genes are kept within `[-weight_bound, weight_bound]`
    pub weight_bound: f32,
    /// Per-gene mutation probability
    pub mutation_rate: f32,
    /// Standard deviation of the Gaussian mutation noise
    pub mutation_sigma: f32,
    /// BLX-α range expansion
    pub blx_alpha: f32,
    /// Attempted turns per game
    pub move_limit: usize,
    /// Consecutive failed turns that end a game
    pub failure_limit: usize,
    /// Evaluate genomes on scoped threads
    pub parallel: bool,
    /// Stop after this many generations; unlimited when `None`
    pub max_generations: Option<usize>,
    /// Seed for the population and the boards; random when `None`
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            elite_count: 5,
            tournament_size: 3,
            hidden_size: 16,
            weight_bound: 2.0,
            mutation_rate: 0.3,
            mutation_sigma: 0.2,
            blx_alpha: 0.5,
            move_limit: DEFAULT_MOVE_LIMIT,
            failure_limit: DEFAULT_FAILURE_LIMIT,
            parallel: true,
            max_generations: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("population size must be at least 1")]
    EmptyPopulation,
    #[display("elite count {elite_count} exceeds population size {population_size}")]
    TooManyElites {
        elite_count: usize,
        population_size: usize,
    },
    #[display("tournament size must be at least 1")]
    EmptyTournament,
    #[display("hidden layer must have at least 1 unit")]
    EmptyHiddenLayer,
    #[display("weight bound must be positive and finite, got {_0}")]
    WeightBound(#[error(not(source))] f32),
    #[display("mutation rate must be within [0, 1], got {_0}")]
    MutationRate(#[error(not(source))] f32),
    #[display("mutation sigma must be non-negative and finite, got {_0}")]
    MutationSigma(#[error(not(source))] f32),
    #[display("BLX-α must be non-negative and finite, got {_0}")]
    BlxAlpha(#[error(not(source))] f32),
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.elite_count > self.population_size {
            return Err(ConfigError::TooManyElites {
                elite_count: self.elite_count,
                population_size: self.population_size,
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::EmptyTournament);
        }
        if self.hidden_size == 0 {
            return Err(ConfigError::EmptyHiddenLayer);
        }
        if !(self.weight_bound.is_finite() && self.weight_bound > 0.0) {
            return Err(ConfigError::WeightBound(self.weight_bound));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::MutationRate(self.mutation_rate));
        }
        if !(self.mutation_sigma.is_finite() && self.mutation_sigma >= 0.0) {
            return Err(ConfigError::MutationSigma(self.mutation_sigma));
        }
        if !(self.blx_alpha.is_finite() && self.blx_alpha >= 0.0) {
            return Err(ConfigError::BlxAlpha(self.blx_alpha));
        }
        Ok(())
    }

    #[must_use]
    pub fn runner(&self) -> SessionRunner {
        SessionRunner::new(self.move_limit, self.failure_limit)
    }

    /// Generator for one consumer of randomness. With a configured seed,
    /// distinct `stream`s give independent but reproducible sequences.
    #[must_use]
    pub fn rng(&self, stream: u64) -> Pcg32 {
        match self.seed {
            Some(seed) => Pcg32::new(seed, stream),
            None => Pcg32::from_rng(&mut rand::rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.population_size, 50);
        assert_eq!(config.elite_count, 5);
        assert_eq!(config.runner(), SessionRunner::default());
    }

    #[test]
    fn test_seeded_rng_streams() {
        use rand::RngCore as _;

        let config = TrainingConfig {
            seed: Some(5),
            ..TrainingConfig::default()
        };
        assert_eq!(config.rng(0).next_u64(), config.rng(0).next_u64());
        assert_ne!(config.rng(0).next_u64(), config.rng(1).next_u64());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TrainingConfig {
            max_generations: Some(3),
            seed: Some(9),
            ..TrainingConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: TrainingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_validation_errors() {
        let base = TrainingConfig::default();
        let cases = [
            (
                TrainingConfig {
                    population_size: 0,
                    elite_count: 0,
                    ..base.clone()
                },
                ConfigError::EmptyPopulation,
            ),
            (
                TrainingConfig {
                    elite_count: 51,
                    ..base.clone()
                },
                ConfigError::TooManyElites {
                    elite_count: 51,
                    population_size: 50,
                },
            ),
            (
                TrainingConfig {
                    tournament_size: 0,
                    ..base.clone()
                },
                ConfigError::EmptyTournament,
            ),
            (
                TrainingConfig {
                    mutation_rate: 1.5,
                    ..base.clone()
                },
                ConfigError::MutationRate(1.5),
            ),
            (
                TrainingConfig {
                    mutation_sigma: -1.0,
                    ..base.clone()
                },
                ConfigError::MutationSigma(-1.0),
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
        let nan_bound = TrainingConfig {
            weight_bound: f32::NAN,
            ..base
        };
        assert!(matches!(
            nan_bound.validate(),
            Err(ConfigError::WeightBound(_))
        ));
    }
}
