use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::Network;

/// A saved genome: the network plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeModel {
    pub name: String,
    pub trained_at: DateTime<Utc>,
    pub generation: usize,
    pub fitness: f32,
    pub network: Network,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum GenomeImportError {
    #[display("malformed genome JSON: {_0}")]
    Parse(serde_json::Error),
    #[display(
        "network shape {inputs}→{hidden}→{outputs} does not fit the agent inputs and outputs"
    )]
    #[from(ignore)]
    Shape {
        inputs: usize,
        hidden: usize,
        outputs: usize,
    },
    #[display("network has {actual} genes, expected {expected}")]
    #[from(ignore)]
    GeneCount { expected: usize, actual: usize },
    #[display("gene {index} is not a finite number")]
    #[from(ignore)]
    NonFiniteGene { index: usize },
    #[display("hidden layer size {actual} does not match the population's {expected}")]
    #[from(ignore)]
    HiddenSizeMismatch { expected: usize, actual: usize },
}

impl GenomeModel {
    #[must_use]
    pub fn new(name: impl Into<String>, generation: usize, fitness: f32, network: Network) -> Self {
        Self {
            name: name.into(),
            trained_at: Utc::now(),
            generation,
            fitness,
            network,
        }
    }

    /// Parses and validates a model. Nothing is returned unless the network
    /// is fully usable.
    pub fn from_json(json: &str) -> Result<Self, GenomeImportError> {
        let model: Self = serde_json::from_str(json)?;
        model.network.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
