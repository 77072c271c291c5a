//! Neuro-evolution of network genomes.
//!
//! [`NeuroEvolution`] evolves a population of fixed-shape
//! [`Network`]s. It implements [`Optimizer`], so the orchestrator drives it
//! like any other policy source: evaluate, [`assign_fitness`], [`evolve`].
//!
//! # Algorithm Overview
//!
//! Each generation:
//!
//! 1. **Elitism** - the top `elite_count` genomes carry over unchanged
//! 2. **Tournament selection** - two parents, each the fittest of
//!    `tournament_size` random picks
//! 3. **BLX-α crossover** - gene-wise blend of the parents
//!    ([`weights::blx_alpha`])
//! 4. **Gaussian mutation** - each gene perturbed with probability
//!    `mutation_rate` ([`weights::mutate`])
//!
//! Steps 2 to 4 repeat until the population is full again.
//!
//! # Design Decisions
//!
//! ## Ranking
//!
//! Members are ranked by fitness with a stable sort, so equal fitness keeps
//! population order and the earlier member wins ties, both for elites and
//! for [`Optimizer::best`]. A generation that never received fitness ranks
//! every member as `0.0`.
//!
//! ## Initial Diversity
//!
//! Fresh populations start from random networks that each receive 2 to 4
//! extra perturbations ([`weights::perturb`]), so no two members start
//! identical even with a narrow weight bound.
//!
//! ## Import
//!
//! [`NeuroEvolution::import`] replaces the first member with a saved network.
//! The network is validated and shape-checked before anything changes.
//!
//! ## Determinism
//!
//! All randomness comes from the [`Pcg32`] passed to [`NeuroEvolution::new`];
//! the same config and generator give the same populations.
//!
//! # Current Limitations
//!
//! - Topology is fixed: crossover and mutation only change weights, never the
//!   number of hidden units.
//! - Tournament picks are drawn without replacement, so a `tournament_size`
//!   larger than the population degrades to picking the overall best.
//!
//! [`assign_fitness`]: Optimizer::assign_fitness
//! [`evolve`]: Optimizer::evolve

use rand::{Rng, seq::IndexedRandom as _};
use rand_distr::Normal;
use rand_pcg::Pcg32;

use crate::{
    FitnessLengthError, Optimizer,
    config::{ConfigError, TrainingConfig},
    model::GenomeImportError,
    network::Network,
    weights,
};

/// Number of perturbations applied to each fresh network.
const INITIAL_PERTURBATIONS: std::ops::RangeInclusive<usize> = 2..=4;

/// Evolution parameters taken from [`TrainingConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionParams {
    pub elite_count: usize,
    pub tournament_size: usize,
    pub weight_bound: f32,
    pub mutation_rate: f32,
    pub mutation_sigma: f32,
    pub blx_alpha: f32,
}

impl From<&TrainingConfig> for EvolutionParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            elite_count: config.elite_count,
            tournament_size: config.tournament_size,
            weight_bound: config.weight_bound,
            mutation_rate: config.mutation_rate,
            mutation_sigma: config.mutation_sigma,
            blx_alpha: config.blx_alpha,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Scored<'a> {
    index: usize,
    network: &'a Network,
    fitness: f32,
}

/// Genetic optimizer over [`Network`] genomes.
///
/// # Example
///
/// ```
/// use rand::SeedableRng as _;
/// use slidris_training::{Optimizer, config::TrainingConfig, genetic::NeuroEvolution};
///
/// let config = TrainingConfig { population_size: 6, elite_count: 2, hidden_size: 4, ..Default::default() };
/// let mut optimizer = NeuroEvolution::new(&config, rand_pcg::Pcg32::seed_from_u64(1)).unwrap();
///
/// optimizer.assign_fitness(&[1.0, 5.0, 2.0, 0.0, 3.0, 4.0]).unwrap();
/// let (best, _) = optimizer.best().unwrap();
/// let best = optimizer.population()[best].clone();
/// optimizer.evolve();
///
/// assert_eq!(optimizer.generation(), 1);
/// assert_eq!(optimizer.population().len(), 6);
/// assert_eq!(optimizer.population()[0], best); // elites lead the next generation
/// ```
#[derive(Debug, Clone)]
pub struct NeuroEvolution {
    params: EvolutionParams,
    normal: Normal<f32>,
    population: Vec<Network>,
    fitness: Option<Vec<f32>>,
    generation: usize,
    rng: Pcg32,
}

impl NeuroEvolution {
    /// Creates a random initial population.
    pub fn new(config: &TrainingConfig, mut rng: Pcg32) -> Result<Self, ConfigError> {
        config.validate()?;
        let params = EvolutionParams::from(config);
        let normal = Normal::new(0.0, params.mutation_sigma)
            .map_err(|_| ConfigError::MutationSigma(params.mutation_sigma))?;
        let population = (0..config.population_size)
            .map(|_| {
                let mut network = Network::random(&mut rng, config.hidden_size, params.weight_bound);
                let count = rng.random_range(INITIAL_PERTURBATIONS);
                weights::perturb(
                    network.genes_mut(),
                    count,
                    &normal,
                    params.weight_bound,
                    &mut rng,
                );
                network
            })
            .collect();
        Ok(Self {
            params,
            normal,
            population,
            fitness: None,
            generation: 0,
            rng,
        })
    }

    #[must_use]
    pub fn params(&self) -> &EvolutionParams {
        &self.params
    }

    /// Fitness of the current generation, if it has been assigned.
    #[must_use]
    pub fn fitness(&self) -> Option<&[f32]> {
        self.fitness.as_deref()
    }

    /// Replaces the first population member with an imported network.
    ///
    /// The network is validated first; on error the population is untouched.
    pub fn import(&mut self, network: Network) -> Result<(), GenomeImportError> {
        network.validate()?;
        if let Some(first) = self.population.first()
            && !first.has_same_shape(&network)
        {
            return Err(GenomeImportError::HiddenSizeMismatch {
                expected: first.hidden(),
                actual: network.hidden(),
            });
        }
        if let Some(first) = self.population.first_mut() {
            *first = network;
        }
        self.fitness = None;
        Ok(())
    }

    /// Population ranked best first. Unassigned fitness counts as zero.
    fn ranked(&self) -> Vec<Scored<'_>> {
        let mut ranked: Vec<Scored<'_>> = self
            .population
            .iter()
            .enumerate()
            .map(|(i, network)| Scored {
                index: i,
                network,
                fitness: self
                    .fitness
                    .as_ref()
                    .and_then(|f| f.get(i).copied())
                    .unwrap_or(0.0),
            })
            .collect();
        // stable, so equal fitness keeps population order
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        ranked
    }
}

impl Optimizer for NeuroEvolution {
    type Genome = Network;

    fn generation(&self) -> usize {
        self.generation
    }

    fn population(&self) -> &[Network] {
        &self.population
    }

    fn assign_fitness(&mut self, fitness: &[f32]) -> Result<(), FitnessLengthError> {
        if fitness.len() != self.population.len() {
            return Err(FitnessLengthError {
                expected: self.population.len(),
                actual: fitness.len(),
            });
        }
        self.fitness = Some(fitness.to_vec());
        Ok(())
    }

    fn best(&self) -> Option<(usize, f32)> {
        self.fitness.as_ref()?;
        self.ranked()
            .first()
            .map(|scored| (scored.index, scored.fitness))
    }

    fn evolve(&mut self) {
        let params = self.params;
        let ranked = self.ranked();
        let mut rng = self.rng.clone();

        let mut next: Vec<Network> = ranked
            .iter()
            .take(params.elite_count)
            .map(|scored| scored.network.clone())
            .collect();

        while next.len() < ranked.len() {
            let p1 = tournament_select(&ranked, params.tournament_size, &mut rng);
            let p2 = tournament_select(&ranked, params.tournament_size, &mut rng);
            let mut genes = weights::blx_alpha(
                p1.genes(),
                p2.genes(),
                params.blx_alpha,
                params.weight_bound,
                &mut rng,
            );
            weights::mutate(
                &mut genes,
                &self.normal,
                params.weight_bound,
                f64::from(params.mutation_rate),
                &mut rng,
            );
            next.push(p1.with_genes(genes));
        }

        self.population = next;
        self.rng = rng;
        self.fitness = None;
        self.generation += 1;
    }
}

/// Fittest of `tournament_size` distinct random picks.
fn tournament_select<'a, R>(ranked: &[Scored<'a>], tournament_size: usize, rng: &mut R) -> &'a Network
where
    R: Rng + ?Sized,
{
    ranked
        .choose_multiple(rng, tournament_size)
        .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
        .map_or(ranked[0].network, |scored| scored.network)
}
