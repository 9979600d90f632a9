use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    seq::SliceRandom,
    Rng,
};
use serde_json::Value;
use tracing::debug;

use crate::aggregators_helper::{args, AggregateError, Result};

/// Index drawn with probability proportional to `weights[i]`.
///
/// Falls back to a uniform draw when no weight is positive (all points already
/// chosen as centers, or duplicates). `None` only for an empty slice.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    match WeightedIndex::<f64>::new(weights) {
        Ok(dist) => Some(dist.sample(rng)),
        Err(err) => {
            debug!(%err, len = weights.len(), "weighted draw degenerated, sampling uniformly");
            Some(rng.random_range(0..weights.len()))
        }
    }
}

/// At most `n` elements of `items`, chosen uniformly without replacement.
/// When `n` covers the whole input it is returned unchanged.
pub fn sample<T: Clone, R: Rng + ?Sized>(n: usize, items: &[T], rng: &mut R) -> Vec<T> {
    if n >= items.len() {
        return items.to_vec();
    }
    let mut copy = items.to_vec();
    copy.shuffle(rng);
    copy.truncate(n);
    copy
}

/// JSON entry point for `sample(n, array)`. A null argument gives null; a
/// negative `n` is an argument error.
pub fn sample_json<R: Rng + ?Sized>(n: &Value, array: &Value, rng: &mut R) -> Result<Value> {
    let (Some(n), Some(items)) = (args::opt_i64("sample", n)?, args::opt_array("sample", array)?) else {
        return Ok(Value::Null);
    };
    let n = usize::try_from(n)
        .map_err(|_| AggregateError::invalid_argument("sample", format!("requires a nonnegative count, got {n}")))?;
    Ok(Value::Array(sample(n, &items, rng)))
}
