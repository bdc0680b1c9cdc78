//! Metric identity, descriptor bookkeeping and the per-query duration summary

pub mod catalog;
pub mod descriptor;
pub mod summary;

pub use catalog::DescriptorCatalog;
pub use descriptor::{metric_name, variable_labels, QueryDescriptors};
pub use summary::DurationSummary;
