pub mod aggregators_helper;
pub use aggregators_helper::*;

pub mod kmeans;
pub use kmeans::{Cluster, KMeans};

pub mod executor;
pub use executor::{AggregateCall, CallArg, GroupedAggregation, MergeTopology, MergeTree, Partitioning};

pub mod config;
pub use config::ExecConfig;
