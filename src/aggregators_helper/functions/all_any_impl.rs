use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aggregators_helper::{args, Accumulator, JsonAggregate, Result};

/// Three-valued AND over a boolean column.
///
/// Any false decides false. No false but some null is unknown. Zero rows is
/// unknown as well (vacuously true, reported as don't-know).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllAcc {
    decided: Option<bool>,
    saw_any: bool,
}

impl Accumulator for AllAcc {
    type Input = Option<bool>;
    type Output = Option<bool>;

    fn absorb(&mut self, input: Option<bool>) -> Result<()> {
        match (self.decided, input) {
            (Some(false), _) => {}
            (_, None) => self.decided = None,
            (_, Some(false)) => self.decided = Some(false),
            (_, Some(true)) if !self.saw_any => self.decided = Some(true),
            (_, Some(true)) => {}
        }
        self.saw_any = true;
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        // an empty partner has no decision to contribute
        if other.saw_any {
            self.absorb(other.decided)?;
        }
        Ok(())
    }

    fn finish(&self) -> Option<bool> { self.decided }
}

impl JsonAggregate for AllAcc {
    const NAME: &'static str = "all";
    const SIGNATURE: &'static str = "all(bool)";

    fn decode(args: &[Value]) -> Result<Option<bool>> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_bool(Self::NAME, v)
    }

    fn encode(output: Option<bool>) -> Value { json!(output) }
}

/// Three-valued OR over a boolean column.
///
/// Any true decides true. No true but some null is unknown. Zero rows is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyAcc {
    decided: Option<bool>,
    saw_any: bool,
}

impl Default for AnyAcc {
    fn default() -> Self { Self { decided: Some(false), saw_any: false } }
}

impl Accumulator for AnyAcc {
    type Input = Option<bool>;
    type Output = Option<bool>;

    fn absorb(&mut self, input: Option<bool>) -> Result<()> {
        match (self.decided, input) {
            (Some(true), _) => {}
            (_, None) => self.decided = None,
            (_, Some(true)) => self.decided = Some(true),
            (_, Some(false)) => {}
        }
        self.saw_any = true;
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        if other.saw_any {
            self.absorb(other.decided)?;
        }
        Ok(())
    }

    fn finish(&self) -> Option<bool> { self.decided }
}

impl JsonAggregate for AnyAcc {
    const NAME: &'static str = "any";
    const SIGNATURE: &'static str = "any(bool)";

    fn decode(args: &[Value]) -> Result<Option<bool>> {
        let [v] = args::unpack::<1>(Self::NAME, Self::SIGNATURE, args)?;
        args::opt_bool(Self::NAME, v)
    }

    fn encode(output: Option<bool>) -> Value { json!(output) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_of(rows: &[Option<bool>]) -> Option<bool> {
        let mut acc = AllAcc::default();
        for r in rows { acc.absorb(*r).unwrap(); }
        acc.finish()
    }

    fn any_of(rows: &[Option<bool>]) -> Option<bool> {
        let mut acc = AnyAcc::default();
        for r in rows { acc.absorb(*r).unwrap(); }
        acc.finish()
    }

    #[test]
    fn all_three_valued_truth_table() {
        assert_eq!(all_of(&[]), None);
        assert_eq!(all_of(&[Some(true), Some(true)]), Some(true));
        assert_eq!(all_of(&[Some(true), None]), None);
        assert_eq!(all_of(&[None, Some(true)]), None);
        assert_eq!(all_of(&[None, Some(false)]), Some(false));
        assert_eq!(all_of(&[Some(false), None, Some(true)]), Some(false));
    }

    #[test]
    fn any_three_valued_truth_table() {
        assert_eq!(any_of(&[]), Some(false));
        assert_eq!(any_of(&[Some(false), Some(false)]), Some(false));
        assert_eq!(any_of(&[Some(false), None]), None);
        assert_eq!(any_of(&[None, Some(true)]), Some(true));
        assert_eq!(any_of(&[Some(true), None]), Some(true));
    }

    #[test]
    fn merging_an_empty_partial_changes_nothing() {
        let mut all = AllAcc::default();
        all.absorb(Some(true)).unwrap();
        all.merge(AllAcc::default()).unwrap();
        assert_eq!(all.finish(), Some(true));

        let mut empty = AllAcc::default();
        let mut full = AllAcc::default();
        full.absorb(Some(true)).unwrap();
        empty.merge(full).unwrap();
        assert_eq!(empty.finish(), Some(true));

        let mut any = AnyAcc::default();
        any.absorb(None).unwrap();
        any.merge(AnyAcc::default()).unwrap();
        assert_eq!(any.finish(), None);
    }

    #[test]
    fn merge_matches_single_accumulator() {
        let rows = [Some(true), None, Some(true), Some(false), Some(true)];
        for split in 0..=rows.len() {
            let (l, r) = rows.split_at(split);
            let mut a = AllAcc::default();
            let mut b = AllAcc::default();
            for x in l { a.absorb(*x).unwrap(); }
            for x in r { b.absorb(*x).unwrap(); }
            a.merge(b).unwrap();
            assert_eq!(a.finish(), all_of(&rows));

            let mut a = AnyAcc::default();
            let mut b = AnyAcc::default();
            for x in l { a.absorb(*x).unwrap(); }
            for x in r { b.absorb(*x).unwrap(); }
            b.merge(a).unwrap();
            assert_eq!(b.finish(), any_of(&rows));
        }
    }

    #[test]
    fn json_layer_rejects_non_bool() {
        assert!(AllAcc::decode(&[json!(1)]).is_err());
        assert_eq!(AnyAcc::decode(&[Value::Null]).unwrap(), None);
        assert_eq!(AllAcc::encode(None), Value::Null);
    }
}
