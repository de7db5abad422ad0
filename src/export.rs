//! Project-wide export of the latest annotations.
//!
//! Flattens every task's current session into one record per item, joining
//! the first label's attribute indices with their configured value names.

pub mod aggregator;
pub mod types;

pub use aggregator::ExportAggregator;
pub use types::{to_pretty_json, ItemExport, PLACEHOLDER_TIMESTAMP};
