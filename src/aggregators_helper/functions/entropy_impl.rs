use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::aggregators_helper::{args, opt_float_value, Accumulator, AggregateError, JsonAggregate, Result};

/// Normalized base-2 Shannon entropy of a column of counts, in one pass.
///
/// With S = sum(x):
///
/// ```text
/// -H = sum((x / S) * ln(x / S))
///    = (1 / S) * sum(x * ln x) - ln S
/// ```
///
/// so two running sums are enough and partials merge by plain addition.
/// Nulls are ignored, zero counts contribute nothing, and a negative (or NaN)
/// count poisons the group: the result becomes null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntropyAcc {
    sum_x: f64,
    sum_x_log_x: f64,
    poisoned: bool,
}

impl EntropyAcc {
    fn poison(&mut self) {
        if !self.poisoned {
            warn!("entropy: negative or NaN mass, result is undefined for this group");
        }
        self.poisoned = true;
    }

    pub fn is_poisoned(&self) -> bool { self.poisoned }

    fn add(&mut self, x: Option<f64>) {
        let Some(x) = x else { return };
        if self.poisoned {
            return;
        }
        if x > 0.0 {
            self.sum_x += x;
            self.sum_x_log_x += x * x.ln();
        } else if x == 0.0 {
            // 0 * ln 0 is taken as 0
        } else {
            self.poison();
        }
    }
}

impl Accumulator for EntropyAcc {
    type Input = Option<f64>;
    type Output = Option<f64>;

    fn absorb(&mut self, x: Option<f64>) -> Result<()> {
        self.add(x);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if other.poisoned {
            self.poison();
        }
        self.sum_x += other.sum_x;
        self.sum_x_log_x += other.sum_x_log_x;
        Ok(())
    }

    fn finish(&self) -> Option<f64> {
        if self.poisoned {
            return None;
        }
        if self.sum_x == 0.0 {
            return Some(0.0);
        }
        let entropy = -self.sum_x_log_x / self.sum_x + self.sum_x.ln();
        // clip rounding noise
        if entropy < 0.0 { Some(0.0) } else { Some(entropy / LN_2) }
    }
}

impl JsonAggregate for EntropyAcc {
    const NAME: &'static str = "entropy";
    const SIGNATURE: &'static str = "entropy(count)";

    fn decode(args: &[Value]) -> Result<Option<f64>> {
        let [x] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_f64(Self::NAME, x)
    }

    fn encode(output: Option<f64>) -> Value { opt_float_value(output) }
}

/// Normalized base-2 entropy of a histogram (label -> count), e.g. the output
/// of `histogram`. Same rules as the `entropy` aggregate.
pub fn map_entropy<I>(counts: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut acc = EntropyAcc::default();
    for c in counts {
        acc.add(c);
    }
    acc.finish()
}

/// JSON entry point for `map_entropy(histogram)`: null map is null, null
/// counts are ignored, non-numeric counts are an argument error.
pub fn map_entropy_json(histogram: &Value) -> Result<Value> {
    let Some(map) = args::opt_object("map_entropy", histogram)? else {
        return Ok(Value::Null);
    };
    let counts = map
        .values()
        .map(|v| args::opt_f64("map_entropy", v))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| match e {
            AggregateError::FunctionArgMismatch { got, .. } => {
                AggregateError::arg_mismatch("map_entropy", "map<string, number>", got)
            }
            other => other,
        })?;
    Ok(opt_float_value(map_entropy(counts)))
}
