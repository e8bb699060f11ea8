//! Reporter - Result Export
//!
//! Writes a finished run as `results.json` (machine-readable, every field)
//! and `junit.xml` (for CI dashboards) under the report directory.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌─────────────────────────────┐
//! │ TestOutcome  │───►│  RunReport   │───►│ <report_dir>/results.json   │
//! │ (per test,   │    │ (run id,     │    │ <report_dir>/junit.xml      │
//! │  input order)│    │  stats)      │    └─────────────────────────────┘
//! └──────────────┘    └──────────────┘
//! ```

use crate::listener::TestRunStats;
use crate::logger::Logger;
use crate::result::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// JSON export file name
pub const RESULTS_FILE: &str = "results.json";

/// JUnit export file name
pub const JUNIT_FILE: &str = "junit.xml";

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Lower-case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Case id, for data-driven tests
    pub id: Option<String>,
    /// Test title
    pub name: String,
    /// Final status
    pub status: TestStatus,
    /// Duration of the recorded attempt
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// Failure message
    pub error: Option<String>,
    /// Attempts made (1 = no retry)
    pub attempts: u32,
    /// Screenshots captured for this test
    pub artifacts: Vec<PathBuf>,
}

impl TestOutcome {
    /// Create a passing outcome
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: None,
            name: name.into(),
            status: TestStatus::Passed,
            duration,
            error: None,
            attempts: 1,
            artifacts: Vec::new(),
        }
    }

    /// Create a failing outcome
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Failed,
            error: Some(error.into()),
            ..Self::passed(name, duration)
        }
    }

    /// Create a skipped outcome
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            attempts: 0,
            ..Self::passed(name, Duration::ZERO)
        }
    }

    /// Attach a case id
    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Set the attempt count
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run id
    pub run_id: Uuid,
    /// Suite name
    pub suite: String,
    /// When `before_all` ran
    pub started_at: DateTime<Utc>,
    /// When `after_all` ran
    pub finished_at: DateTime<Utc>,
    /// Aggregated counters
    pub stats: TestRunStats,
    /// Outcomes in input order
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    /// Build a report for `outcomes`
    #[must_use]
    pub fn new(
        suite: impl Into<String>,
        started_at: DateTime<Utc>,
        stats: TestRunStats,
        outcomes: Vec<TestOutcome>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            suite: suite.into(),
            started_at,
            finished_at: Utc::now(),
            stats,
            outcomes,
        }
    }

    /// Sum of recorded durations
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.outcomes.iter().map(|o| o.duration).sum()
    }

    /// Failed outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&TestOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_failed())
            .collect()
    }

    /// True iff nothing failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| !o.status.is_failed())
    }

    /// Generate JUnit XML
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}" timestamp="{}">"#,
            escape_xml(&self.suite),
            self.stats.total,
            self.stats.failed,
            self.stats.skipped,
            self.total_duration().as_secs_f64(),
            self.started_at.to_rfc3339(),
        ));
        xml.push('\n');

        for outcome in &self.outcomes {
            xml.push_str(&format!(
                r#"  <testcase name="{}" classname="{}" time="{:.3}">"#,
                escape_xml(&outcome.name),
                escape_xml(&self.suite),
                outcome.duration.as_secs_f64()
            ));
            xml.push('\n');

            match outcome.status {
                TestStatus::Failed => {
                    let error = outcome.error.as_deref().unwrap_or("failed");
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(error),
                        escape_xml(error)
                    ));
                    xml.push('\n');
                }
                TestStatus::Skipped => xml.push_str("    <skipped/>\n"),
                TestStatus::Passed => {}
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Writes run reports to disk
#[derive(Debug, Clone)]
pub struct Reporter {
    report_dir: PathBuf,
    logger: Arc<Logger>,
}

impl Reporter {
    /// Create a reporter writing into `report_dir`
    #[must_use]
    pub fn new(report_dir: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        Self {
            report_dir: report_dir.into(),
            logger,
        }
    }

    /// Output directory
    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Write `results.json`
    pub async fn write_json(&self, report: &RunReport) -> ProbeResult<PathBuf> {
        let path = self.report_dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::create_dir_all(&self.report_dir).await?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }

    /// Write `junit.xml`
    pub async fn write_junit(&self, report: &RunReport) -> ProbeResult<PathBuf> {
        let path = self.report_dir.join(JUNIT_FILE);
        tokio::fs::create_dir_all(&self.report_dir).await?;
        tokio::fs::write(&path, report.render_junit()).await?;
        Ok(path)
    }

    /// Write every format. Failures are logged and skipped; the paths that
    /// were written are returned.
    pub async fn export(&self, report: &RunReport) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for result in [self.write_json(report).await, self.write_junit(report).await] {
            match result {
                Ok(path) => {
                    self.logger
                        .info(format!("Report written: {}", path.display()));
                    written.push(path);
                }
                Err(e) => self.logger.error(format!("Report export failed: {e}")),
            }
        }
        written
    }
}
