//! Test listener
//!
//! Aggregates pass/fail/skip counters for a run. Counters only ever grow and
//! always sum to the number of completed tests.

use crate::reporter::TestStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunStats {
    /// Completed tests
    pub total: usize,
    /// Passed tests
    pub passed: usize,
    /// Failed tests
    pub failed: usize,
    /// Skipped tests
    pub skipped: usize,
}

impl TestRunStats {
    /// Count one completed test
    pub fn record_test_result(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
    }

    /// Passed share in percent, rounded to 2 decimals (0 for an empty run)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.passed as f64 / self.total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    /// Summary block logged at the end of a run
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            "========================================".to_string(),
            "TEST EXECUTION SUMMARY".to_string(),
            "========================================".to_string(),
            format!("Total Tests: {}", self.total),
            format!("✓ Passed: {}", self.passed),
            format!("✗ Failed: {}", self.failed),
            format!("⊘ Skipped: {}", self.skipped),
            format!("Success Rate: {:.2}%", self.success_rate()),
            "========================================".to_string(),
        ]
    }
}

/// Shared, thread-safe holder of [`TestRunStats`]
#[derive(Debug, Default)]
pub struct TestListener {
    stats: Mutex<TestRunStats>,
}

impl TestListener {
    /// Create an empty listener
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed test
    pub fn record_test_result(&self, status: TestStatus) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_test_result(status);
    }

    /// Snapshot of the counters
    #[must_use]
    pub fn report(&self) -> TestRunStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
