pub mod all_any_impl;
pub use all_any_impl::*;

pub mod conditional_impl;
pub use conditional_impl::*;

pub mod weighted_avg_impl;
pub use weighted_avg_impl::*;

pub mod entropy_impl;
pub use entropy_impl::*;

pub mod weighted_percentile_impl;
pub use weighted_percentile_impl::*;

pub mod top_n_impl;
pub use top_n_impl::*;

pub mod collect_impl;
pub use collect_impl::*;

pub mod histogram_impl;
pub use histogram_impl::*;

pub mod pick_impl;
pub use pick_impl::*;
