//! A host-side model of the merge-tree: split rows across workers, absorb
//! each subset into its own accumulator, then combine the partials in a
//! chosen topology.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    aggregators_helper::{Accumulator, Result},
    ExecConfig,
};

/// How rows are split across workers. Every strategy yields exactly
/// `partitions` subsets; some may be empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partitioning {
    #[default]
    RoundRobin,
    Contiguous,
    Shuffled { seed: u64 },
}

impl Partitioning {
    pub fn split<T>(&self, items: Vec<T>, partitions: usize) -> Vec<Vec<T>> {
        let partitions = partitions.max(1);
        let mut out: Vec<Vec<T>> = (0..partitions).map(|_| Vec::new()).collect();
        match self {
            Partitioning::RoundRobin => {
                for (i, item) in items.into_iter().enumerate() {
                    out[i % partitions].push(item);
                }
            }
            Partitioning::Contiguous => {
                let chunk = items.len().div_ceil(partitions).max(1);
                for (i, item) in items.into_iter().enumerate() {
                    out[i / chunk].push(item);
                }
            }
            Partitioning::Shuffled { seed } => {
                let mut items = items;
                items.shuffle(&mut StdRng::seed_from_u64(*seed));
                for (i, item) in items.into_iter().enumerate() {
                    out[i % partitions].push(item);
                }
            }
        }
        out
    }
}

/// Order and grouping in which partials are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeTopology {
    /// ((p0 + p1) + p2) + ...
    Linear,
    /// Pairwise rounds: (p0 + p1), (p2 + p3), ... until one is left.
    #[default]
    Balanced,
    /// The last partial receives every other one.
    FanIn,
    /// Left fold over the reversed list.
    Reversed,
}

impl MergeTopology {
    /// Folds `parts` with `merge(receiver, partner)`. `None` for no parts.
    pub fn fold<T, F>(&self, parts: Vec<T>, mut merge: F) -> Result<Option<T>>
    where
        F: FnMut(&mut T, T) -> Result<()>,
    {
        match self {
            MergeTopology::Linear => left_fold(parts, merge),
            MergeTopology::Reversed => {
                let mut parts = parts;
                parts.reverse();
                left_fold(parts, merge)
            }
            MergeTopology::FanIn => {
                let mut parts = parts;
                let Some(mut root) = parts.pop() else { return Ok(None) };
                for p in parts {
                    merge(&mut root, p)?;
                }
                Ok(Some(root))
            }
            MergeTopology::Balanced => {
                let mut level = parts;
                let mut round = 0usize;
                while level.len() > 1 {
                    debug!(round, partials = level.len(), "merge round");
                    let mut next = Vec::with_capacity(level.len().div_ceil(2));
                    let mut it = level.into_iter();
                    while let Some(mut a) = it.next() {
                        if let Some(b) = it.next() {
                            merge(&mut a, b)?;
                        }
                        next.push(a);
                    }
                    level = next;
                    round += 1;
                }
                Ok(level.pop())
            }
        }
    }
}

fn left_fold<T, F>(parts: Vec<T>, mut merge: F) -> Result<Option<T>>
where
    F: FnMut(&mut T, T) -> Result<()>,
{
    let mut it = parts.into_iter();
    let Some(mut acc) = it.next() else { return Ok(None) };
    for p in it {
        merge(&mut acc, p)?;
    }
    Ok(Some(acc))
}

/// Drives typed accumulators through a partition + merge plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeTree {
    pub partitions: usize,
    pub partitioning: Partitioning,
    pub topology: MergeTopology,
}

impl Default for MergeTree {
    fn default() -> Self {
        let cfg = ExecConfig::default();
        Self { partitions: cfg.partitions, partitioning: cfg.partitioning, topology: cfg.topology }
    }
}

impl MergeTree {
    pub fn new(partitions: usize, partitioning: Partitioning, topology: MergeTopology) -> Self {
        Self { partitions: partitions.max(1), partitioning, topology }
    }

    pub fn from_config(cfg: &ExecConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(cfg.partitions, cfg.partitioning, cfg.topology))
    }

    /// Merges partials; no partials is the identity state.
    pub fn reduce<A: Accumulator>(&self, partials: Vec<A>) -> Result<A> {
        let merged = self.topology.fold(partials, |a, b| a.merge(b))?;
        Ok(merged.unwrap_or_default())
    }

    /// Partitions `rows`, absorbs each subset into a fresh accumulator and
    /// reduces the partials.
    pub fn run<A: Accumulator>(&self, rows: Vec<A::Input>) -> Result<A> {
        let parts = self.partitioning.split(rows, self.partitions);
        debug!(partitions = parts.len(), topology = ?self.topology, "merge tree run");
        let mut partials = Vec::with_capacity(parts.len());
        for part in parts {
            let mut acc = A::default();
            for row in part {
                acc.absorb(row)?;
            }
            partials.push(acc);
        }
        self.reduce(partials)
    }

    /// `run` followed by `finish`.
    pub fn aggregate<A: Accumulator>(&self, rows: Vec<A::Input>) -> Result<A::Output> {
        Ok(self.run::<A>(rows)?.finish())
    }
}
