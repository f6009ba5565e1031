//! Output module for reporting harvest results

mod stats;

pub use stats::{print_summary, ItemFailure, RunSummary};
