use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::aggregators_helper::{args, Accumulator, JsonAggregate, Result};

/// Occurrence counts over a discrete string support. Feed the result to
/// `map_entropy` for the entropy of the observed distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramAcc {
    counts: IndexMap<String, u64>,
}

impl HistogramAcc {
    fn increment(&mut self, label: String, amount: u64) {
        *self.counts.entry(label).or_insert(0) += amount;
    }

    pub fn total(&self) -> u64 { self.counts.values().sum() }
}

impl Accumulator for HistogramAcc {
    type Input = Option<String>;
    type Output = IndexMap<String, u64>;

    fn absorb(&mut self, label: Option<String>) -> Result<()> {
        if let Some(label) = label {
            self.increment(label, 1);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        for (label, n) in other.counts {
            self.increment(label, n);
        }
        Ok(())
    }

    fn finish(&self) -> IndexMap<String, u64> { self.counts.clone() }
}

impl JsonAggregate for HistogramAcc {
    const NAME: &'static str = "histogram";
    const SIGNATURE: &'static str = "histogram(label)";

    fn decode(args: &[Value]) -> Result<Option<String>> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_str(Self::NAME, v)
    }

    fn encode(output: IndexMap<String, u64>) -> Value {
        Value::Object(output.into_iter().map(|(k, n)| (k, json!(n))).collect::<Map<_, _>>())
    }
}
