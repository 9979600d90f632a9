pub mod sampling;
pub use sampling::*;

pub mod clusterer;
pub use clusterer::*;
