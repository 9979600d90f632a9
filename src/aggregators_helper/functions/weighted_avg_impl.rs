use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregators_helper::{args, opt_float_value, Accumulator, JsonAggregate, Result};

/// SUM(value * weight) / SUM(weight) in one pass.
///
/// A row with a null value or a null weight contributes nothing. If every
/// contributing weight sums to zero the result is NaN (surfaced as `null` on
/// the JSON layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedAvgAcc {
    sum_value: Option<f64>,
    sum_weight: Option<f64>,
}

fn add(acc: &mut Option<f64>, x: f64) {
    *acc = Some(acc.map_or(x, |s| s + x));
}

impl Accumulator for WeightedAvgAcc {
    type Input = (Option<f64>, Option<f64>);
    type Output = Option<f64>;

    fn absorb(&mut self, input: Self::Input) -> Result<()> {
        let (Some(value), Some(weight)) = input else {
            return Ok(());
        };
        add(&mut self.sum_value, value * weight);
        add(&mut self.sum_weight, weight);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if let Some(v) = other.sum_value {
            add(&mut self.sum_value, v);
        }
        if let Some(w) = other.sum_weight {
            add(&mut self.sum_weight, w);
        }
        Ok(())
    }

    fn finish(&self) -> Option<f64> {
        Some(self.sum_value? / self.sum_weight?)
    }
}

impl JsonAggregate for WeightedAvgAcc {
    const NAME: &'static str = "weighted_avg";
    const SIGNATURE: &'static str = "weighted_avg(value, weight)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [v, w] = args::unpack::<2>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((args::opt_f64(Self::NAME, v)?, args::opt_f64(Self::NAME, w)?))
    }

    fn encode(output: Option<f64>) -> Value { opt_float_value(output) }
}
