use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::aggregators_helper::{
    AggregateError, AggregateImpl, AggregateOf, AllAcc, AnyAcc, ChooseOneAcc, CollectAcc, CollectMapAcc,
    CollectWhereAcc, CountWhereAcc, EntropyAcc, GroupLongestAcc, HistogramAcc, Result, RowAccumulator, SumWhereAcc,
    TopAcc, TopNAcc, UnionMapAcc, UnionSetAcc, WeightedAvgAcc, WeightedPercentileAcc,
};

static GLOBAL: Lazy<AggregateRegistry> = Lazy::new(AggregateRegistry::default_aggregate_registry);

/// Case-insensitive registry of aggregates.
#[derive(Default)]
pub struct AggregateRegistry {
    by_name: HashMap<String, Arc<dyn AggregateImpl>>,
}

impl AggregateRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    pub fn register<I: AggregateImpl + 'static>(&mut self, impl_: I) {
        self.by_name.insert(impl_.name().to_ascii_lowercase(), Arc::new(impl_));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AggregateImpl>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    /// Fresh accumulator for `name`, or `FunctionNotFound`.
    pub fn create(&self, name: &str) -> Result<Box<dyn RowAccumulator>> {
        self.get(name)
            .map(|imp| imp.create_accumulator())
            .ok_or_else(|| AggregateError::FunctionNotFound(name.to_string()))
    }

    pub fn default_aggregate_registry() -> Self {
        let mut registry = Self::new();
        registry.register(AggregateOf::<AllAcc>::new());
        registry.register(AggregateOf::<AnyAcc>::new());
        registry.register(AggregateOf::<CountWhereAcc>::new());
        registry.register(AggregateOf::<SumWhereAcc>::new());
        registry.register(AggregateOf::<WeightedAvgAcc>::new());
        registry.register(AggregateOf::<EntropyAcc>::new());
        registry.register(AggregateOf::<WeightedPercentileAcc>::new());
        registry.register(AggregateOf::<TopNAcc<Value>>::new());
        registry.register(AggregateOf::<TopAcc>::new());
        registry.register(AggregateOf::<CollectAcc>::new());
        registry.register(AggregateOf::<CollectWhereAcc>::new());
        registry.register(AggregateOf::<UnionSetAcc>::new());
        registry.register(AggregateOf::<UnionMapAcc>::new());
        registry.register(AggregateOf::<CollectMapAcc>::new());
        registry.register(AggregateOf::<HistogramAcc>::new());
        registry.register(AggregateOf::<ChooseOneAcc>::new());
        registry.register(AggregateOf::<GroupLongestAcc>::new());
        registry
    }

    /// Process-wide default registry, built on first use and read-only after.
    pub fn global() -> &'static AggregateRegistry { &GLOBAL }
}
