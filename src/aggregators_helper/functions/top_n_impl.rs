use std::{cmp::Ordering, collections::BinaryHeap};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::aggregators_helper::{args, Accumulator, AggregateError, JsonAggregate, Result};

const NAME: &str = "top_n";

/// Total order on keys used to break score ties at the N boundary.
///
/// The order depends only on the keys themselves, so the retained set is the
/// same whichever partial receives the merge.
pub trait RankKey {
    fn rank_cmp(&self, other: &Self) -> Ordering;
}

/// JSON keys compare by their compact text.
impl RankKey for Value {
    fn rank_cmp(&self, other: &Self) -> Ordering { self.to_string().cmp(&other.to_string()) }
}

impl RankKey for String {
    fn rank_cmp(&self, other: &Self) -> Ordering { self.cmp(other) }
}

impl RankKey for &str {
    fn rank_cmp(&self, other: &Self) -> Ordering { (*self).cmp(*other) }
}

impl RankKey for i64 {
    fn rank_cmp(&self, other: &Self) -> Ordering { self.cmp(other) }
}

/// A retained (key, score) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ranked<K> {
    score: OrderedFloat<f64>,
    key: K,
}

// Heap order: the greatest element is the next one to evict, i.e. the lowest
// score, and among equal scores the greatest key.
impl<K: RankKey> Ord for Ranked<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.score.cmp(&self.score).then_with(|| self.key.rank_cmp(&other.key))
    }
}

impl<K: RankKey> PartialOrd for Ranked<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<K: RankKey> PartialEq for Ranked<K> {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl<K: RankKey> Eq for Ranked<K> {}

/// One row for top-n: a key, its score and the group's bound N.
pub type TopNRow<K> = (K, Option<f64>, Option<i64>);

/// Keeps the N keys with the highest scores.
///
/// N is fixed by the first row. A row or a merge partner carrying a different
/// N poisons the group (result is null) instead of silently picking a side.
/// Rows with a null score are ignored. Among equal scores at the boundary the
/// keys lowest in `RankKey` order are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: Deserialize<'de> + RankKey"))]
pub struct TopNAcc<K = Value> {
    heap: BinaryHeap<Ranked<K>>,
    n: Option<usize>,
    poisoned: bool,
}

impl<K: RankKey> Default for TopNAcc<K> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), n: None, poisoned: false }
    }
}

impl<K: RankKey> TopNAcc<K> {
    pub fn bound(&self) -> Option<usize> { self.n }

    pub fn is_poisoned(&self) -> bool { self.poisoned }

    fn poison(&mut self, mine: usize, theirs: usize) {
        if !self.poisoned {
            warn!(mine, theirs, "top_n: inconsistent N within one group, result is undefined");
        }
        self.poisoned = true;
    }

    fn negotiate(&mut self, n: usize) {
        match self.n {
            None => self.n = Some(n),
            Some(mine) if mine != n => self.poison(mine, n),
            Some(_) => {}
        }
    }

    fn push(&mut self, key: K, score: OrderedFloat<f64>) {
        self.heap.push(Ranked { score, key });
    }

    fn prune(&mut self) {
        let Some(n) = self.n else { return };
        while self.heap.len() > n {
            self.heap.pop();
        }
    }
}

impl<K: RankKey + Clone + Send> Accumulator for TopNAcc<K> {
    type Input = TopNRow<K>;
    type Output = Option<Vec<K>>;

    fn absorb(&mut self, (key, score, n): TopNRow<K>) -> Result<()> {
        match n {
            Some(n) if n < 0 => {
                return Err(AggregateError::invalid_argument(NAME, format!("N must be non-negative, got {n}")));
            }
            Some(n) => self.negotiate(n as usize),
            None if self.n.is_none() => {
                return Err(AggregateError::invalid_argument(NAME, "N must not be null"));
            }
            None => {}
        }
        let Some(score) = score.filter(|s| !s.is_nan()) else {
            return Ok(());
        };
        self.push(key, OrderedFloat(score));
        self.prune();
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if other.poisoned {
            self.poisoned = true;
        }
        if let Some(n) = other.n {
            self.negotiate(n);
        }
        self.heap.extend(other.heap);
        self.prune();
        Ok(())
    }

    /// Retained keys from lowest to highest score.
    fn finish(&self) -> Option<Vec<K>> {
        if self.poisoned {
            return None;
        }
        let sorted = self.heap.clone().into_sorted_vec();
        Some(sorted.into_iter().rev().map(|r| r.key).collect())
    }
}

impl JsonAggregate for TopNAcc<Value> {
    const NAME: &'static str = NAME;
    const SIGNATURE: &'static str = "top_n(key, score, n)";

    fn decode(args: &[Value]) -> Result<TopNRow<Value>> {
        let [key, score, n] = args::unpack::<3>(Self::NAME, Self::SIGNATURE, args)?;
        Ok((key.clone(), args::opt_f64(Self::NAME, score)?, args::opt_i64(Self::NAME, n)?))
    }

    fn encode(output: Option<Vec<Value>>) -> Value {
        output.map(Value::Array).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::aggregators_helper::RowAccumulator;

    fn top2(scores: &[f64]) -> Vec<String> {
        let mut acc = TopNAcc::<String>::default();
        for s in scores {
            acc.absorb((format!("k{s}"), Some(*s), Some(2))).unwrap();
        }
        acc.finish().unwrap()
    }

    #[test]
    fn keeps_highest_scores_in_ascending_order() {
        assert_eq!(top2(&[5.0, 1.0, 9.0, 3.0]), vec!["k5", "k9"]);
    }

    #[test]
    fn retained_set_is_independent_of_absorb_order() {
        let orders = [
            [5.0, 1.0, 9.0, 3.0],
            [9.0, 5.0, 3.0, 1.0],
            [1.0, 3.0, 5.0, 9.0],
            [3.0, 9.0, 1.0, 5.0],
        ];
        for o in orders {
            assert_eq!(top2(&o), vec!["k5", "k9"]);
        }
    }

    #[test]
    fn null_scores_are_ignored() {
        let mut acc = TopNAcc::<&str>::default();
        acc.absorb(("a", None, Some(3))).unwrap();
        acc.absorb(("b", Some(1.0), Some(3))).unwrap();
        assert_eq!(acc.finish(), Some(vec!["b"]));
    }

    #[test]
    fn merge_prunes_to_n() {
        let mut a = TopNAcc::<&str>::default();
        let mut b = TopNAcc::<&str>::default();
        a.absorb(("five", Some(5.0), Some(2))).unwrap();
        a.absorb(("one", Some(1.0), Some(2))).unwrap();
        b.absorb(("nine", Some(9.0), Some(2))).unwrap();
        b.absorb(("three", Some(3.0), Some(2))).unwrap();
        a.merge(b).unwrap();
        assert_eq!(a.finish(), Some(vec!["five", "nine"]));
    }

    #[test]
    fn empty_partner_does_not_disturb_bound() {
        let mut a = TopNAcc::<&str>::default();
        a.absorb(("x", Some(1.0), Some(1))).unwrap();
        a.merge(TopNAcc::default()).unwrap();
        assert_eq!(a.bound(), Some(1));

        let mut empty = TopNAcc::<&str>::default();
        empty.merge(a).unwrap();
        assert_eq!(empty.bound(), Some(1));
        assert_eq!(empty.finish(), Some(vec!["x"]));
    }

    #[test]
    fn mismatched_bounds_poison() {
        let mut a = TopNAcc::<&str>::default();
        let mut b = TopNAcc::<&str>::default();
        a.absorb(("x", Some(1.0), Some(2))).unwrap();
        b.absorb(("y", Some(2.0), Some(3))).unwrap();
        a.merge(b).unwrap();
        assert!(a.is_poisoned());
        assert_eq!(a.finish(), None);

        let mut c = TopNAcc::<&str>::default();
        c.absorb(("x", Some(1.0), Some(2))).unwrap();
        c.absorb(("y", Some(1.0), Some(4))).unwrap();
        assert_eq!(c.finish(), None);
    }

    #[test]
    fn bad_bound_is_an_argument_error() {
        let mut acc = TopNAcc::<&str>::default();
        assert!(acc.absorb(("x", Some(1.0), None)).is_err());
        assert!(acc.absorb(("x", Some(1.0), Some(-1))).is_err());

        let mut zero = TopNAcc::<&str>::default();
        zero.absorb(("x", Some(1.0), Some(0))).unwrap();
        assert_eq!(zero.finish(), Some(vec![]));
    }

    #[test]
    fn tied_scores_keep_the_same_keys_in_either_merge_direction() {
        let one = |key: &'static str| {
            let mut acc = TopNAcc::<&str>::default();
            acc.absorb((key, Some(5.0), Some(1))).unwrap();
            acc
        };
        let mut ab = one("a");
        ab.merge(one("b")).unwrap();
        let mut ba = one("b");
        ba.merge(one("a")).unwrap();
        assert_eq!(ab.finish(), Some(vec!["a"]));
        assert_eq!(ba.finish(), Some(vec!["a"]));

        let mut absorbed = TopNAcc::<&str>::default();
        for key in ["d", "b", "c", "a"] {
            absorbed.absorb((key, Some(1.0), Some(2))).unwrap();
        }
        assert_eq!(absorbed.finish(), Some(vec!["b", "a"]));
    }

    #[test]
    fn json_keys_break_ties_by_text() {
        let mut a = TopNAcc::<Value>::default();
        let mut b = TopNAcc::<Value>::default();
        a.update(&[json!("y"), json!(2), json!(1)]).unwrap();
        b.update(&[json!("x"), json!(2), json!(1)]).unwrap();
        let (pa, pb) = (a.partial().unwrap(), b.partial().unwrap());
        a.merge_partial(pb).unwrap();
        b.merge_partial(pa).unwrap();
        assert_eq!(a.finalize(), json!(["x"]));
        assert_eq!(b.finalize(), json!(["x"]));
    }

    #[test]
    fn row_layer_partial_round_trip() {
        let mut a = TopNAcc::<Value>::default();
        let mut b = TopNAcc::<Value>::default();
        a.update(&[json!("a"), json!(5), json!(2)]).unwrap();
        a.update(&[json!("b"), json!(1), json!(2)]).unwrap();
        b.update(&[json!("c"), json!(9), json!(2)]).unwrap();
        b.update(&[json!("d"), Value::Null, json!(2)]).unwrap();
        a.merge_partial(b.partial().unwrap()).unwrap();
        assert_eq!(a.finalize(), json!(["a", "c"]));
    }
}
