use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregators_helper::{args, Accumulator, JsonAggregate, Result};

/// Every non-null value, in arrival order, duplicates kept. Merge concatenates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectAcc {
    elements: Vec<Value>,
}

impl Accumulator for CollectAcc {
    type Input = Value;
    type Output = Vec<Value>;

    fn absorb(&mut self, value: Value) -> Result<()> {
        if !value.is_null() {
            self.elements.push(value);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.elements.extend(other.elements);
        Ok(())
    }

    fn finish(&self) -> Vec<Value> { self.elements.clone() }
}

impl JsonAggregate for CollectAcc {
    const NAME: &'static str = "collect";
    const SIGNATURE: &'static str = "collect(value)";

    fn decode(args: &[Value]) -> Result<Value> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        Ok(v.clone())
    }

    fn encode(output: Vec<Value>) -> Value { Value::Array(output) }
}

/// Like `collect`, restricted to rows whose condition is true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectWhereAcc {
    inner: CollectAcc,
}

impl Accumulator for CollectWhereAcc {
    type Input = (Value, Option<bool>);
    type Output = Vec<Value>;

    fn absorb(&mut self, (value, condition): Self::Input) -> Result<()> {
        if condition == Some(true) {
            self.inner.absorb(value)?;
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> { self.inner.merge(other.inner) }

    fn finish(&self) -> Vec<Value> { self.inner.finish() }
}

impl JsonAggregate for CollectWhereAcc {
    const NAME: &'static str = "collect_where";
    const SIGNATURE: &'static str = "collect_where(value, condition)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [v, c] = args::unpack::<2>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((v.clone(), args::opt_bool(Self::NAME, c)?))
    }

    fn encode(output: Vec<Value>) -> Value { Value::Array(output) }
}

/// Distinct elements of all observed arrays. Output order is unspecified;
/// compare results as sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "Vec<Value>")]
pub struct UnionSetAcc {
    // keyed by compact JSON text; serde_json maps are key-sorted so equal
    // values always render the same
    set: IndexMap<String, Value>,
}

impl UnionSetAcc {
    fn insert(&mut self, value: Value) {
        self.set.entry(value.to_string()).or_insert(value);
    }

    pub fn len(&self) -> usize { self.set.len() }

    pub fn is_empty(&self) -> bool { self.set.is_empty() }
}

impl From<Vec<Value>> for UnionSetAcc {
    fn from(values: Vec<Value>) -> Self {
        let mut acc = Self::default();
        for v in values {
            acc.insert(v);
        }
        acc
    }
}

impl From<UnionSetAcc> for Vec<Value> {
    fn from(acc: UnionSetAcc) -> Self { acc.set.into_values().collect() }
}

impl Accumulator for UnionSetAcc {
    type Input = Option<Vec<Value>>;
    type Output = Vec<Value>;

    fn absorb(&mut self, items: Option<Vec<Value>>) -> Result<()> {
        for v in items.into_iter().flatten() {
            self.insert(v);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        for (k, v) in other.set {
            self.set.entry(k).or_insert(v);
        }
        Ok(())
    }

    fn finish(&self) -> Vec<Value> { self.set.values().cloned().collect() }
}

impl JsonAggregate for UnionSetAcc {
    const NAME: &'static str = "union_set";
    const SIGNATURE: &'static str = "union_set(array)";

    fn decode(args: &[Value]) -> Result<Option<Vec<Value>>> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_array(Self::NAME, v)
    }

    fn encode(output: Vec<Value>) -> Value { Value::Array(output) }
}

/// Union of all observed maps.
///
/// When the same key arrives with different values, which value survives
/// depends on absorb and merge order and is not part of the contract. Only the
/// key set and single-valuedness are guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionMapAcc {
    map: Map<String, Value>,
}

impl Accumulator for UnionMapAcc {
    type Input = Option<Map<String, Value>>;
    type Output = Map<String, Value>;

    fn absorb(&mut self, entries: Option<Map<String, Value>>) -> Result<()> {
        if let Some(entries) = entries {
            self.map.extend(entries);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.map.extend(other.map);
        Ok(())
    }

    fn finish(&self) -> Map<String, Value> { self.map.clone() }
}

impl JsonAggregate for UnionMapAcc {
    const NAME: &'static str = "union_map";
    const SIGNATURE: &'static str = "union_map(map)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_object(Self::NAME, v)
    }

    fn encode(output: Map<String, Value>) -> Value { Value::Object(output) }
}

/// Builds one map from (key, value) rows; both must be non-null. Duplicate
/// keys follow the same caveat as `union_map`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectMapAcc {
    inner: UnionMapAcc,
}

impl Accumulator for CollectMapAcc {
    type Input = (Option<String>, Value);
    type Output = Map<String, Value>;

    fn absorb(&mut self, (key, value): Self::Input) -> Result<()> {
        if let Some(key) = key.filter(|_| !value.is_null()) {
            self.inner.map.insert(key, value);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> { self.inner.merge(other.inner) }

    fn finish(&self) -> Map<String, Value> { self.inner.finish() }
}

impl JsonAggregate for CollectMapAcc {
    const NAME: &'static str = "collect_map";
    const SIGNATURE: &'static str = "collect_map(key, value)";

    fn decode(args: &[Value]) -> Result<Self::Input> {
        let [k, v] = args::unpack::<2>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((args::opt_str(Self::NAME, k)?, v.clone()))
    }

    fn encode(output: Map<String, Value>) -> Value { Value::Object(output) }
}
