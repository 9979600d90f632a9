use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::aggregators_helper::{args, float_value, Accumulator, AggregateError, JsonAggregate, Result};

const NAME: &str = "percentile";

/// One row for the weighted percentile: the value, its weight and the
/// percentiles requested for the group.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileRow {
    pub value: Option<f64>,
    pub weight: Option<f64>,
    pub percentiles: Vec<f64>,
}

impl PercentileRow {
    pub fn weighted(value: f64, weight: f64, percentiles: &[f64]) -> Self {
        Self { value: Some(value), weight: Some(weight), percentiles: percentiles.to_vec() }
    }

    pub fn unweighted(value: f64, percentiles: &[f64]) -> Self {
        Self::weighted(value, 1.0, percentiles)
    }
}

/// Weighted percentiles over a frequency table (value -> summed weight).
///
/// This is the cumulative-weight definition with midpoint positions, not the
/// percentile of the sample obtained by replicating each value `weight`
/// times. For rows (0, 1) and (1, 99) the median is 0.99, not 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedPercentileAcc {
    #[serde(with = "freq_table")]
    counts: BTreeMap<OrderedFloat<f64>, f64>,
    percentiles: Option<Vec<f64>>,
    poisoned: bool,
}

mod freq_table {
    use std::collections::BTreeMap;

    use ordered_float::OrderedFloat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(table: &BTreeMap<OrderedFloat<f64>, f64>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(table.iter().map(|(k, w)| (k.0, *w)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<OrderedFloat<f64>, f64>, D::Error> {
        let entries = Vec::<(f64, f64)>::deserialize(d)?;
        let mut table = BTreeMap::new();
        for (k, w) in entries {
            *table.entry(OrderedFloat(k)).or_insert(0.0) += w;
        }
        Ok(table)
    }
}

impl WeightedPercentileAcc {
    fn adopt_percentiles(&mut self, percentiles: Vec<f64>) -> Result<()> {
        if self.percentiles.is_some() {
            return Ok(());
        }
        if let Some(bad) = percentiles.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(AggregateError::invalid_argument(
                NAME,
                format!("Percentile value must be in [0,1], got {bad}"),
            ));
        }
        self.percentiles = Some(percentiles);
        Ok(())
    }

    fn increment(&mut self, value: f64, weight: f64) {
        *self.counts.entry(OrderedFloat(value)).or_insert(0.0) += weight;
    }

    fn poison(&mut self) {
        if !self.poisoned {
            warn!("percentile: negative weight, result is undefined for this group");
        }
        self.poisoned = true;
    }
}

/// Value at `position` (= total weight * p) over sorted `(value, e_n)` pairs
/// where `e_n = S_n - w_n / 2`.
fn percentile_at(entries: &[(f64, f64)], position: f64) -> f64 {
    let k = entries.partition_point(|&(_, e)| e < position);
    if k == entries.len() {
        return entries[k - 1].0;
    }
    let (v_k, e_k) = entries[k];
    if e_k == position || k == 0 {
        return v_k;
    }
    let (v_km1, e_km1) = entries[k - 1];
    v_km1 + (position - e_km1) / (e_k - e_km1) * (v_k - v_km1)
}

impl Accumulator for WeightedPercentileAcc {
    type Input = PercentileRow;
    type Output = Option<Vec<f64>>;

    fn absorb(&mut self, row: PercentileRow) -> Result<()> {
        self.adopt_percentiles(row.percentiles)?;
        let (Some(value), Some(weight)) = (row.value, row.weight) else {
            return Ok(());
        };
        if value.is_nan() {
            return Ok(());
        }
        if weight < 0.0 || weight.is_nan() {
            self.poison();
            return Ok(());
        }
        self.increment(value, weight);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if other.poisoned {
            self.poison();
        }
        if let Some(p) = other.percentiles {
            self.adopt_percentiles(p)?;
        }
        for (k, w) in other.counts {
            self.increment(k.0, w);
        }
        Ok(())
    }

    fn finish(&self) -> Option<Vec<f64>> {
        if self.poisoned || self.counts.is_empty() {
            return None;
        }
        let mut total = 0.0_f64;
        let entries: Vec<(f64, f64)> = self
            .counts
            .iter()
            .map(|(k, w)| {
                total += w;
                (k.0, total - w / 2.0)
            })
            .collect();
        let percentiles = self.percentiles.as_deref().unwrap_or_default();
        Some(percentiles.iter().map(|p| percentile_at(&entries, total * p)).collect())
    }
}

impl JsonAggregate for WeightedPercentileAcc {
    const NAME: &'static str = NAME;
    const SIGNATURE: &'static str = "percentile(value, [weight,] percentiles)";

    fn decode(args: &[Value]) -> Result<PercentileRow> {
        let (value, weight, percentiles) = match args {
            [v, p] => (args::opt_f64(Self::NAME, v)?, Some(1.0), p),
            [v, w, p] => (args::opt_f64(Self::NAME, v)?, args::opt_f64(Self::NAME, w)?, p),
            _ => return Err(AggregateError::arg_mismatch(Self::NAME, Self::SIGNATURE, format!("{} args", args.len()))),
        };
        Ok(PercentileRow { value, weight, percentiles: args::f64_list(Self::NAME, percentiles)? })
    }

    fn encode(output: Option<Vec<f64>>) -> Value {
        match output {
            Some(values) => Value::Array(values.into_iter().map(float_value).collect()),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::aggregators_helper::RowAccumulator;

    fn run(rows: &[(f64, f64)], ps: &[f64]) -> Option<Vec<f64>> {
        let mut acc = WeightedPercentileAcc::default();
        for (v, w) in rows {
            acc.absorb(PercentileRow::weighted(*v, *w, ps)).unwrap();
        }
        acc.finish()
    }

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn weighted_median_differs_from_replication() {
        let out = run(&[(0.0, 1.0), (1.0, 99.0)], &[0.5]).unwrap();
        assert!(out[0] < 1.0);
        assert!(close(out[0], 0.99));
    }

    #[test]
    fn extremes_and_exact_hits() {
        let rows = [(10.0, 1.0), (20.0, 1.0), (30.0, 1.0), (40.0, 1.0)];
        // positions 0.5, 1.5, 2.5, 3.5 over a total of 4
        let out = run(&rows, &[0.0, 0.125, 0.375, 0.5, 1.0]).unwrap();
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 10.0);
        assert_eq!(out[2], 20.0);
        assert!(close(out[3], 25.0));
        assert_eq!(out[4], 40.0);
    }

    #[test]
    fn unweighted_rows_use_weight_one() {
        let mut acc = WeightedPercentileAcc::default();
        for v in [3.0, 1.0, 2.0] {
            acc.absorb(PercentileRow::unweighted(v, &[0.5])).unwrap();
        }
        assert_eq!(acc.finish(), Some(vec![2.0]));
    }

    #[test]
    fn repeated_values_accumulate_weight() {
        let a = run(&[(5.0, 1.0), (5.0, 1.0), (7.0, 2.0)], &[0.5]).unwrap();
        let b = run(&[(5.0, 2.0), (7.0, 2.0)], &[0.5]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_percentile_is_an_argument_error() {
        let mut acc = WeightedPercentileAcc::default();
        let err = acc.absorb(PercentileRow::unweighted(1.0, &[0.5, 1.5])).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidArgument { .. }));

        let mut acc = WeightedPercentileAcc::default();
        assert!(acc.absorb(PercentileRow::unweighted(1.0, &[-0.1])).is_err());
    }

    #[test]
    fn first_percentile_list_wins() {
        let mut acc = WeightedPercentileAcc::default();
        acc.absorb(PercentileRow::unweighted(1.0, &[0.0])).unwrap();
        acc.absorb(PercentileRow::unweighted(9.0, &[1.0])).unwrap();
        assert_eq!(acc.finish(), Some(vec![1.0]));
    }

    #[test]
    fn nulls_skip_and_empty_is_null() {
        let mut acc = WeightedPercentileAcc::default();
        acc.absorb(PercentileRow { value: None, weight: Some(1.0), percentiles: vec![0.5] }).unwrap();
        acc.absorb(PercentileRow { value: Some(1.0), weight: None, percentiles: vec![0.5] }).unwrap();
        assert_eq!(acc.finish(), None);
    }

    #[test]
    fn negative_weight_poisons_through_merge() {
        let mut bad = WeightedPercentileAcc::default();
        bad.absorb(PercentileRow::weighted(1.0, -2.0, &[0.5])).unwrap();
        let mut good = WeightedPercentileAcc::default();
        good.absorb(PercentileRow::weighted(1.0, 2.0, &[0.5])).unwrap();
        good.merge(bad).unwrap();
        assert_eq!(good.finish(), None);
    }

    #[test]
    fn merge_adopts_percentiles_from_partner() {
        let mut empty = WeightedPercentileAcc::default();
        let mut full = WeightedPercentileAcc::default();
        full.absorb(PercentileRow::weighted(0.0, 1.0, &[0.5])).unwrap();
        full.absorb(PercentileRow::weighted(1.0, 99.0, &[0.5])).unwrap();
        empty.merge(full).unwrap();
        let out = empty.finish().unwrap();
        assert!(close(out[0], 0.99));
    }

    #[test]
    fn row_layer_partial_round_trip() {
        let mut a = WeightedPercentileAcc::default();
        let mut b = WeightedPercentileAcc::default();
        a.update(&[json!(0), json!(1), json!([0.5])]).unwrap();
        b.update(&[json!(1), json!(99), json!([0.5])]).unwrap();
        b.update(&[json!(1), Value::Null, json!([0.5])]).unwrap();
        a.merge_partial(b.partial().unwrap()).unwrap();
        let out = a.finalize();
        assert!(close(out[0].as_f64().unwrap(), 0.99));

        let mut u = WeightedPercentileAcc::default();
        u.update(&[json!(4), json!([0.0, 1.0])]).unwrap();
        assert_eq!(u.finalize(), json!([4.0, 4.0]));
        assert!(u.update(&[json!(4)]).is_err());
    }
}
