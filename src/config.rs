use std::path::Path;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    aggregators_helper::{AggregateError, Result},
    executor::{MergeTopology, Partitioning},
};

/// Execution settings for the merge-tree driver and the clusterer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub partitions: usize,
    pub topology: MergeTopology,
    pub partitioning: Partitioning,
    /// `None` draws a fresh OS seed per run.
    pub kmeans_seed: Option<u64>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            topology: MergeTopology::default(),
            partitioning: Partitioning::default(),
            kmeans_seed: None,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(partitions: usize, partitioning: Partitioning, topology: MergeTopology) -> Self {
        Self { partitions, partitioning, topology, ..Self::default() }
    }

    pub fn single() -> Self {
        Self { partitions: 1, topology: MergeTopology::Linear, ..Self::default() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            partitioning: Partitioning::Shuffled { seed },
            kmeans_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(AggregateError::Config("partitions must be at least 1".into()));
        }
        Ok(())
    }

    /// Random source for `KMeans::fit_with_config`.
    pub fn rng(&self) -> StdRng {
        match self.kmeans_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
