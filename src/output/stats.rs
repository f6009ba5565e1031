//! Run summary for a harvest
//!
//! Counts of attempted, succeeded and failed items plus the per-item
//! failure records, and their console rendering.

use crate::state::ItemState;

/// One item that did not make it to staging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Ordinal of the item in the crawl
    pub index: usize,

    /// The item link (resolved if resolution succeeded)
    pub url: String,

    /// Stage the item was in when it failed
    pub stage: ItemState,

    /// Error description
    pub message: String,
}

/// Outcome counts of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,

    /// Succeeded items whose staging key was already taken
    pub duplicates: usize,

    pub failures: Vec<ItemFailure>,
}

impl RunSummary {
    /// Creates a new empty run summary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, duplicate: bool) {
        self.attempted += 1;
        self.succeeded += 1;
        if duplicate {
            self.duplicates += 1;
        }
    }

    pub fn record_failure(&mut self, failure: ItemFailure) {
        self.attempted += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }

    /// Number of failures that happened in the given stage
    pub fn failures_in(&self, stage: ItemState) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Items:");
    println!("  Attempted: {}", summary.attempted);
    println!(
        "  Succeeded: {} ({} already staged)",
        summary.succeeded, summary.duplicates
    );
    println!("  Failed: {}", summary.failed);
    println!();

    if !summary.failures.is_empty() {
        println!("Failures by Stage:");
        for stage in [ItemState::Fetching, ItemState::Extracting, ItemState::Persisting] {
            let count = summary.failures_in(stage);
            if count > 0 {
                println!("  {}: {}", stage, count);
            }
        }
        println!();

        println!("Failed Items:");
        let mut failures: Vec<_> = summary.failures.iter().collect();
        failures.sort_by_key(|f| f.index);
        for failure in failures {
            println!(
                "  #{} [{}] {}: {}",
                failure.index, failure.stage, failure.url, failure.message
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items staged)",
        summary.success_rate(),
        summary.succeeded,
        summary.attempted
    );
}
