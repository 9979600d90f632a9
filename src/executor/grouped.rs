use std::{collections::HashMap, sync::Arc};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    aggregators_helper::{args, AggregateError, AggregateImpl, AggregateRegistry, Result, RowAccumulator},
    executor::{aggregate_call::AggregateCall, helpers::Helpers, merge_tree::MergeTree},
};

/// Per-partition state of one group: its key values and one accumulator per call.
type GroupEntry = (Vec<Value>, Vec<Box<dyn RowAccumulator>>);

/// Group-by over JSON object rows.
///
/// Each partition of the input gets its own accumulators per group. Their
/// partials cross partition boundaries only as JSON values, the way they would
/// between workers, and are merged following the tree's topology. The output
/// has one object per group: key columns first, then one column per call,
/// sorted by key (nulls last).
pub struct GroupedAggregation {
    group_keys: Vec<String>,
    calls: Vec<AggregateCall>,
    impls: Vec<Arc<dyn AggregateImpl>>,
    tree: MergeTree,
}

impl GroupedAggregation {
    /// Resolves every call up front so unknown functions fail before any row is read.
    pub fn new(
        registry: &AggregateRegistry,
        group_keys: Vec<String>,
        calls: Vec<AggregateCall>,
        tree: MergeTree,
    ) -> Result<Self> {
        let impls = calls
            .iter()
            .map(|c| registry.get(&c.func).ok_or_else(|| AggregateError::FunctionNotFound(c.func.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { group_keys, calls, impls, tree })
    }

    fn fresh_accumulators(&self) -> Vec<Box<dyn RowAccumulator>> {
        self.impls.iter().map(|imp| imp.create_accumulator()).collect()
    }

    /// Absorbs one partition and returns `group key -> (key values, partials)`.
    fn absorb_partition(&self, rows: Vec<Value>) -> Result<HashMap<String, (Vec<Value>, Vec<Value>)>> {
        let mut groups: HashMap<String, GroupEntry> = HashMap::new();
        for v in rows {
            let Value::Object(obj) = v else {
                return Err(AggregateError::arg_mismatch("group_by", "object row", args::kind(&v)));
            };
            let gb_vals: Vec<Value> = self.group_keys.iter().map(|k| Helpers::column(&obj, k)).collect();
            let gk = Helpers::canonical_tuple(&gb_vals);

            let entry = groups.entry(gk).or_insert_with(|| (gb_vals, self.fresh_accumulators()));
            for (call, acc) in self.calls.iter().zip(entry.1.iter_mut()) {
                acc.update(&call.eval_args(&obj))?;
            }
        }

        groups
            .into_iter()
            .map(|(gk, (vals, accs))| {
                let partials = accs.iter().map(|a| a.partial()).collect::<Result<Vec<_>>>()?;
                Ok((gk, (vals, partials)))
            })
            .collect()
    }

    /// Rebuilds an accumulator on the receiving side from a shipped partial.
    fn revive(&self, call: usize, partial: Value) -> Result<Box<dyn RowAccumulator>> {
        let mut acc = self.impls[call].create_accumulator();
        acc.merge_partial(partial)?;
        Ok(acc)
    }

    pub fn execute(&self, rows: Vec<Value>) -> Result<Vec<Value>> {
        let parts = self.tree.partitioning.split(rows, self.tree.partitions);

        // group key -> (key values, per call: partials in partition order)
        let mut gathered: HashMap<String, (Vec<Value>, Vec<Vec<Value>>)> = HashMap::new();
        for part in parts {
            for (gk, (vals, partials)) in self.absorb_partition(part)? {
                let slot = gathered
                    .entry(gk)
                    .or_insert_with(|| (vals, vec![Vec::new(); self.calls.len()]));
                for (per_call, p) in slot.1.iter_mut().zip(partials) {
                    per_call.push(p);
                }
            }
        }

        // a global aggregate over no rows still yields one row of identities
        if gathered.is_empty() && self.group_keys.is_empty() {
            gathered.insert(Helpers::canonical_tuple(&[]), (Vec::new(), vec![Vec::new(); self.calls.len()]));
        }
        debug!(groups = gathered.len(), calls = self.calls.len(), "grouped aggregation merged partitions");

        let names = AggregateCall::output_names(&self.calls, &self.group_keys);
        let mut out: Vec<(Vec<Value>, Value)> = Vec::with_capacity(gathered.len());
        for (_gk, (gb_vals, per_call)) in gathered {
            let mut m = Map::new();
            for (k, v) in self.group_keys.iter().zip(&gb_vals) {
                m.insert(k.clone(), v.clone());
            }
            for (i, partials) in per_call.into_iter().enumerate() {
                let accs = partials.into_iter().map(|p| self.revive(i, p)).collect::<Result<Vec<_>>>()?;
                let merged = self.tree.topology.fold(accs, |a, b| a.merge_partial(b.partial()?))?;
                let result = match merged {
                    Some(acc) => acc.finalize(),
                    None => self.impls[i].create_accumulator().finalize(),
                };
                m.insert(names[i].clone(), result);
            }
            out.push((gb_vals, Value::Object(m)));
        }
        out.sort_by(|a, b| Helpers::cmp_tuples(&a.0, &b.0));
        Ok(out.into_iter().map(|(_, row)| row).collect())
    }
}
