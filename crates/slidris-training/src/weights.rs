//! Gene vector operators used by [`NeuroEvolution`](crate::genetic::NeuroEvolution).
//!
//! A gene vector is the flat list of weights and biases of a
//! [`Network`](crate::network::Network). Every operator here works on plain
//! `f32` slices and knows nothing about the network layout.
//!
//! # Operations
//!
//! - **Initialization**: [`random`] samples uniformly
//! - **Crossover**: [`blx_alpha`] blends two parents
//! - **Mutation**: [`mutate`] adds Gaussian noise gene by gene
//! - **Perturbation**: [`perturb`] adds noise to a few randomly picked genes
//!
//! # Design Decisions
//!
//! ## Signed, clamped genes
//!
//! Genes live in `[-bound, bound]` and every operator clamps its result back
//! into that range. Network weights take both signs, so genes are never
//! normalized.
//!
//! ## BLX-α Crossover
//!
//! Each child gene is drawn from the parents' interval widened by `α` times
//! its length on both sides. With `α = 0` children stay between the parents;
//! identical parent genes are copied as they are.
//!
//! ## Gaussian Mutation vs. Perturbation
//!
//! [`mutate`] visits every gene and flips a `rate` coin for each.
//! [`perturb`] touches a fixed number of genes and is used to spread out a
//! freshly generated population.
//!
//! # Current Limitations
//!
//! - The mutation strength is fixed for the whole run; there is no schedule
//!   that narrows `sigma` as training converges.
//! - [`blx_alpha`] panics on parents of different lengths. Genomes of one
//!   population always share a shape, so callers never hit it.

use rand::Rng;
use rand_distr::Normal;

/// Samples `len` genes uniformly from `[-bound, bound]`.
///
/// # Arguments
///
/// * `rng` - Random source
/// * `bound` - Largest absolute gene value
/// * `len` - Number of genes
pub fn random<R>(rng: &mut R, bound: f32, len: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    (0..len).map(|_| rng.random_range(-bound..=bound)).collect()
}

/// BLX-α crossover.
///
/// For each gene pair, samples from `[min - α·d, max + α·d]` where `d` is the
/// distance between the parents, then clamps to `[-bound, bound]`.
///
/// # Arguments
///
/// * `p1`, `p2` - Parent genes, of equal length
/// * `alpha` - Range expansion; `0.0` keeps children between the parents
/// * `bound` - Largest absolute gene value
/// * `rng` - Random source
///
/// # Returns
///
/// A child gene vector of the parents' length.
///
/// ```
/// use rand::SeedableRng as _;
/// use slidris_training::weights;
///
/// let mut rng = rand_pcg::Pcg32::seed_from_u64(1);
/// let child = weights::blx_alpha(&[0.0, 1.0], &[0.5, 1.0], 0.0, 1.0, &mut rng);
/// assert!((0.0..=0.5).contains(&child[0]));
/// assert_eq!(child[1], 1.0);
/// ```
pub fn blx_alpha<R>(p1: &[f32], p2: &[f32], alpha: f32, bound: f32, rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    p1.iter()
        .zip(p2)
        .map(|(&x1, &x2)| {
            let min = f32::min(x1, x2);
            let max = f32::max(x1, x2);
            let d = max - min;
            let lower = min - alpha * d;
            let upper = max + alpha * d;
            rng.random_range(lower..=upper).clamp(-bound, bound)
        })
        .collect()
}

/// Gaussian mutation: each gene is perturbed with probability `rate`.
///
/// # Arguments
///
/// * `genes` - Genes to mutate in place
/// * `normal` - Noise distribution, usually `N(0, sigma²)`
/// * `bound` - Largest absolute gene value
/// * `rate` - Per-gene mutation probability, within `[0, 1]`
/// * `rng` - Random source
pub fn mutate<R>(genes: &mut [f32], normal: &Normal<f32>, bound: f32, rate: f64, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for g in genes {
        if rng.random_bool(rate) {
            *g = (*g + rng.sample(normal)).clamp(-bound, bound);
        }
    }
}

/// Adds Gaussian noise to `count` genes picked at random (with repetition).
pub fn perturb<R>(genes: &mut [f32], count: usize, normal: &Normal<f32>, bound: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    if genes.is_empty() {
        return;
    }
    for _ in 0..count {
        let i = rng.random_range(0..genes.len());
        genes[i] = (genes[i] + rng.sample(normal)).clamp(-bound, bound);
    }
}
