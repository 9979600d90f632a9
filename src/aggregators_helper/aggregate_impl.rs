use std::marker::PhantomData;

use crate::aggregators_helper::{JsonAggregate, RowAccumulator};

/// Per-aggregate metadata + factory.
/// One instance is registered globally per function name.
/// It is stateless and thread-safe to share.
pub trait AggregateImpl: Send + Sync {
    /// Canonical lowercase function name ("entropy", "top_n", ...).
    fn name(&self) -> &'static str;

    /// Human readable call shape.
    fn signature(&self) -> &'static str;

    /// Create a fresh accumulator in its identity state for one group.
    fn create_accumulator(&self) -> Box<dyn RowAccumulator>;
}

/// Factory for any typed accumulator that speaks the JSON row protocol.
pub struct AggregateOf<A>(PhantomData<fn() -> A>);

impl<A> AggregateOf<A> {
    pub const fn new() -> Self { Self(PhantomData) }
}

impl<A> Default for AggregateOf<A> {
    fn default() -> Self { Self::new() }
}

impl<A: JsonAggregate> AggregateImpl for AggregateOf<A> {
    fn name(&self) -> &'static str { A::NAME }
    fn signature(&self) -> &'static str { A::SIGNATURE }
    fn create_accumulator(&self) -> Box<dyn RowAccumulator> { Box::new(A::default()) }
}
