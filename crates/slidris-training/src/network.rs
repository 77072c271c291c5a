//! Feedforward network genome.
//!
//! One hidden layer with `tanh` activation on both layers:
//!
//! ```text
//! features (88) → hidden (tanh) → outputs (27, tanh)
//! ```
//!
//! All weights, biases included, live in a single gene vector so that the
//! genetic operators in [`weights`](crate::weights) work on it directly.
//! Layout: for each hidden unit, its input weights followed by its bias;
//! then for each output unit, its hidden weights followed by its bias.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slidris_agent::{
    Agent,
    action_codec::{FEATURE_LEN, OUTPUT_LEN},
};

use crate::{model::GenomeImportError, weights};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    inputs: usize,
    hidden: usize,
    outputs: usize,
    genes: Vec<f32>,
}

/// Number of genes for the given layer sizes.
#[must_use]
pub const fn gene_count(inputs: usize, hidden: usize, outputs: usize) -> usize {
    (inputs + 1) * hidden + (hidden + 1) * outputs
}

impl Network {
    /// Creates a network shaped for the agent codec with uniform random
    /// weights in `[-weight_bound, weight_bound]`.
    pub fn random<R>(rng: &mut R, hidden: usize, weight_bound: f32) -> Self
    where
        R: Rng + ?Sized,
    {
        let genes = weights::random(rng, weight_bound, gene_count(FEATURE_LEN, hidden, OUTPUT_LEN));
        Self {
            inputs: FEATURE_LEN,
            hidden,
            outputs: OUTPUT_LEN,
            genes,
        }
    }

    /// Builds a network from its parts, checking the gene count.
    pub fn from_genes(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        genes: Vec<f32>,
    ) -> Result<Self, GenomeImportError> {
        let network = Self {
            inputs,
            hidden,
            outputs,
            genes,
        };
        network.validate_genes()?;
        Ok(network)
    }

    #[must_use]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    #[must_use]
    pub fn hidden(&self) -> usize {
        self.hidden
    }

    #[must_use]
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    #[must_use]
    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    /// Same shape, different genes.
    pub(crate) fn with_genes(&self, genes: Vec<f32>) -> Self {
        debug_assert_eq!(genes.len(), self.genes.len());
        Self {
            inputs: self.inputs,
            hidden: self.hidden,
            outputs: self.outputs,
            genes,
        }
    }

    pub(crate) fn genes_mut(&mut self) -> &mut [f32] {
        &mut self.genes
    }

    #[must_use]
    pub fn has_same_shape(&self, other: &Self) -> bool {
        self.inputs == other.inputs && self.hidden == other.hidden && self.outputs == other.outputs
    }

    fn validate_genes(&self) -> Result<(), GenomeImportError> {
        let expected = gene_count(self.inputs, self.hidden, self.outputs);
        if self.genes.len() != expected {
            return Err(GenomeImportError::GeneCount {
                expected,
                actual: self.genes.len(),
            });
        }
        if let Some(index) = self.genes.iter().position(|g| !g.is_finite()) {
            return Err(GenomeImportError::NonFiniteGene { index });
        }
        Ok(())
    }

    /// Checks that the network fits the agent codec and holds usable genes.
    pub fn validate(&self) -> Result<(), GenomeImportError> {
        if self.inputs != FEATURE_LEN || self.outputs != OUTPUT_LEN || self.hidden == 0 {
            return Err(GenomeImportError::Shape {
                inputs: self.inputs,
                hidden: self.hidden,
                outputs: self.outputs,
            });
        }
        self.validate_genes()
    }
}

impl Agent for Network {
    fn activate(&self, features: &[f32]) -> Vec<f32> {
        let (hidden_genes, output_genes) = self.genes.split_at((self.inputs + 1) * self.hidden);
        let hidden: Vec<f32> = hidden_genes
            .chunks_exact(self.inputs + 1)
            .map(|unit| layer_unit(unit, features))
            .collect();
        output_genes
            .chunks_exact(self.hidden + 1)
            .map(|unit| layer_unit(unit, &hidden))
            .collect()
    }
}

/// `tanh(bias + Σ wᵢ·xᵢ)`; the bias is the last gene of `unit`.
fn layer_unit(unit: &[f32], inputs: &[f32]) -> f32 {
    let (weights, bias) = unit.split_at(unit.len() - 1);
    let sum: f32 = weights.iter().zip(inputs).map(|(w, x)| w * x).sum();
    (sum + bias[0]).tanh()
}
