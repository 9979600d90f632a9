use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregators_helper::{args, Accumulator, JsonAggregate, Result};

/// Arg-max: the key carrying the greatest non-null score.
///
/// Only a strictly greater score replaces the current key, so among equal
/// scores the receiver keeps its own; which of several tied keys is reported
/// is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopAcc {
    key: Option<Value>,
    score: Option<f64>,
}

impl TopAcc {
    fn offer(&mut self, key: Value, score: f64) {
        if self.score.is_none_or(|best| score > best) {
            self.key = Some(key);
            self.score = Some(score);
        }
    }
}

impl Accumulator for TopAcc {
    type Input = (Value, Option<f64>);
    type Output = Option<Value>;

    fn absorb(&mut self, (key, score): Self::Input) -> Result<()> {
        if let Some(score) = score.filter(|s| !s.is_nan()) {
            self.offer(key, score);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if let (Some(key), Some(score)) = (other.key, other.score) {
            self.offer(key, score);
        }
        Ok(())
    }

    fn finish(&self) -> Option<Value> { self.key.clone() }
}

impl JsonAggregate for TopAcc {
    const NAME: &'static str = "top";
    const SIGNATURE: &'static str = "top(key, score)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [key, score] = args::unpack::<2>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((key.clone(), args::opt_f64(Self::NAME, score)?))
    }

    fn encode(output: Option<Value>) -> Value { output.unwrap_or(Value::Null) }
}

/// Some non-null value of the group: the first one the receiver saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChooseOneAcc {
    chosen: Option<Value>,
}

impl Accumulator for ChooseOneAcc {
    type Input = Value;
    type Output = Option<Value>;

    fn absorb(&mut self, value: Value) -> Result<()> {
        if self.chosen.is_none() && !value.is_null() {
            self.chosen = Some(value);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if self.chosen.is_none() {
            self.chosen = other.chosen;
        }
        Ok(())
    }

    fn finish(&self) -> Option<Value> { self.chosen.clone() }
}

impl JsonAggregate for ChooseOneAcc {
    const NAME: &'static str = "choose_one";
    const SIGNATURE: &'static str = "choose_one(value)";

    fn decode(args: &[Value]) -> Result<Value> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        Ok(v.clone())
    }

    fn encode(output: Option<Value>) -> Value { output.unwrap_or(Value::Null) }
}

/// Longest non-null string, measured in chars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupLongestAcc {
    longest: Option<String>,
}

impl GroupLongestAcc {
    fn offer(&mut self, candidate: String) {
        let len = candidate.chars().count();
        if self.longest.as_ref().is_none_or(|cur| len > cur.chars().count()) {
            self.longest = Some(candidate);
        }
    }
}

impl Accumulator for GroupLongestAcc {
    type Input = Option<String>;
    type Output = Option<String>;

    fn absorb(&mut self, s: Option<String>) -> Result<()> {
        if let Some(s) = s {
            self.offer(s);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> { self.absorb(other.longest) }

    fn finish(&self) -> Option<String> { self.longest.clone() }
}

impl JsonAggregate for GroupLongestAcc {
    const NAME: &'static str = "group_longest";
    const SIGNATURE: &'static str = "group_longest(string)";

    fn decode(args: &[Value]) -> Result<Option<String>> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_str(Self::NAME, v)
    }

    fn encode(output: Option<String>) -> Value { output.map(Value::String).unwrap_or(Value::Null) }
}
