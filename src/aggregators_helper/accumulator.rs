use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::aggregators_helper::{AggregateError, Result};

/// The per-group aggregation state.
///
/// The merge-tree will:
///   1) create one accumulator per group and worker via `Default` (the identity state)
///   2) call `absorb` once per row of that worker's subset
///   3) ship partials around and fold them together with `merge`, in any order
///      and any grouping
///   4) call `finish` once on the surviving accumulator
///
/// `merge` must be associative and commutative up to floating point rounding:
/// every valid merge topology over the same input multiset yields the same
/// `finish()`.
pub trait Accumulator: Default + Send {
    /// One row worth of (already coerced, possibly null) arguments.
    type Input;
    /// The externally visible result.
    type Output;

    fn absorb(&mut self, input: Self::Input) -> Result<()>;

    /// Fold another partial into this one. The partner is consumed.
    fn merge(&mut self, other: Self) -> Result<()>;

    fn finish(&self) -> Self::Output;
}

/// Bridges a typed accumulator to the host's JSON row interface: argument
/// decoding on the way in and output encoding on the way out. The serde
/// representation of the accumulator is its partial state.
pub trait JsonAggregate: Accumulator + Serialize + DeserializeOwned + 'static {
    /// Canonical lowercase function name.
    const NAME: &'static str;
    /// Call shape used in argument errors, e.g. `sum_where(value, condition)`.
    const SIGNATURE: &'static str;

    fn decode(args: &[Value]) -> Result<Self::Input>;

    fn encode(output: Self::Output) -> Value;
}

/// Object-safe view of an accumulator as the host sees it.
/// The executor will:
///   1) evaluate the function's arguments per row into serde_json::Value
///   2) call `update(&mut self, &args)`
///   3) ship `partial()` to whichever worker merges it, which calls `merge_partial`
///   4) after the last merge, call `finalize()`
pub trait RowAccumulator: Send {
    fn update(&mut self, args: &[Value]) -> Result<()>;

    fn partial(&self) -> Result<Value>;

    fn merge_partial(&mut self, partial: Value) -> Result<()>;

    fn finalize(&self) -> Value;
}

impl<A: JsonAggregate> RowAccumulator for A {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        let input = A::decode(args)?;
        self.absorb(input)
    }

    fn partial(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn merge_partial(&mut self, partial: Value) -> Result<()> {
        let other: A = serde_json::from_value(partial).map_err(|e| AggregateError::InvalidPartial {
            name: A::NAME.to_string(),
            message: e.to_string(),
        })?;
        self.merge(other)
    }

    fn finalize(&self) -> Value {
        A::encode(self.finish())
    }
}

/// JSON number for a float, `null` when it is not finite.
pub fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

pub fn opt_float_value(f: Option<f64>) -> Value {
    f.map(float_value).unwrap_or(Value::Null)
}
