use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aggregators_helper::{args, opt_float_value, Accumulator, JsonAggregate, Result};

/// COUNT of rows whose condition is true ("not false and also not null").
/// Lets several conditions be tracked side by side in one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountWhereAcc {
    count: i64,
}

impl Accumulator for CountWhereAcc {
    type Input = Option<bool>;
    type Output = i64;

    fn absorb(&mut self, condition: Option<bool>) -> Result<()> {
        if condition == Some(true) {
            self.count += 1;
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.count += other.count;
        Ok(())
    }

    fn finish(&self) -> i64 { self.count }
}

impl JsonAggregate for CountWhereAcc {
    const NAME: &'static str = "count_where";
    const SIGNATURE: &'static str = "count_where(condition)";

    fn decode(args: &[Value]) -> Result<Option<bool>> {
        let [c] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_bool(Self::NAME, c)
    }

    fn encode(output: i64) -> Value { json!(output) }
}

/// SUM of values whose condition is true. Rows with a null value or a
/// null/false condition are skipped; no contributing row at all yields null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SumWhereAcc {
    sum: Option<f64>,
}

fn add_nullable(acc: &mut Option<f64>, x: Option<f64>) {
    if let Some(x) = x {
        *acc = Some(acc.map_or(x, |s| s + x));
    }
}

impl Accumulator for SumWhereAcc {
    type Input = (Option<f64>, Option<bool>);
    type Output = Option<f64>;

    fn absorb(&mut self, (value, condition): Self::Input) -> Result<()> {
        if condition == Some(true) {
            add_nullable(&mut self.sum, value);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        add_nullable(&mut self.sum, other.sum);
        Ok(())
    }

    fn finish(&self) -> Option<f64> { self.sum }
}

impl JsonAggregate for SumWhereAcc {
    const NAME: &'static str = "sum_where";
    const SIGNATURE: &'static str = "sum_where(value, condition)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [v, c] = args::unpack::<2>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((args::opt_f64(Self::NAME, v)?, args::opt_bool(Self::NAME, c)?))
    }

    fn encode(output: Option<f64>) -> Value { opt_float_value(output) }
}
