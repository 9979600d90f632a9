pub mod helpers;

pub mod aggregate_call;
pub use aggregate_call::*;

pub mod merge_tree;
pub use merge_tree::*;

pub mod grouped;
pub use grouped::*;
