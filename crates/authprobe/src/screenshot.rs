//! Screenshot capture
//!
//! Writes PNG artifacts to the screenshots directory. File names are
//! `<test>_[fullpage_]<timestamp>-<seq>.png`: a millisecond UTC timestamp
//! plus a per-capturer sequence number, so two captures of the same test
//! never collide even within one millisecond.

use crate::driver::Driver;
use crate::logger::Logger;
use crate::result::{ProbeError, ProbeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A captured screenshot on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Test the capture belongs to
    pub test_name: String,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Whether the whole scrollable page was captured
    pub full_page: bool,
    /// Written file
    pub file_path: PathBuf,
}

/// Replace characters that are unsafe in file names with `_`
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "screenshot".to_string()
    } else {
        cleaned
    }
}

/// File name for a capture
#[must_use]
pub fn artifact_file_name(
    test_name: &str,
    full_page: bool,
    timestamp: DateTime<Utc>,
    seq: u64,
) -> String {
    let stamp = timestamp.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let kind = if full_page { "fullpage_" } else { "" };
    format!("{}_{kind}{stamp}-{seq:04}.png", sanitize_name(test_name))
}

/// Captures screenshots into one directory
#[derive(Debug)]
pub struct ScreenshotCapturer {
    dir: PathBuf,
    seq: AtomicU64,
    logger: Arc<Logger>,
}

impl ScreenshotCapturer {
    /// Create a capturer writing into `dir`.
    ///
    /// The directory is created eagerly; failure is logged and retried on
    /// each capture.
    pub fn new(dir: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            logger.warn(format!(
                "Cannot create screenshot directory {}: {e}",
                dir.display()
            ));
        }
        Self {
            dir,
            seq: AtomicU64::new(0),
            logger,
        }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the viewport
    pub async fn capture_screenshot(
        &self,
        driver: &dyn Driver,
        test_name: &str,
    ) -> ProbeResult<Artifact> {
        self.capture(driver, test_name, false).await
    }

    /// Capture the whole scrollable page
    pub async fn capture_full_page(
        &self,
        driver: &dyn Driver,
        test_name: &str,
    ) -> ProbeResult<Artifact> {
        self.capture(driver, test_name, true).await
    }

    /// Capture and write a screenshot.
    ///
    /// # Errors
    ///
    /// `ArtifactCapture` when the driver cannot render or the file cannot be
    /// written. The failure is logged at ERROR first.
    pub async fn capture(
        &self,
        driver: &dyn Driver,
        test_name: &str,
        full_page: bool,
    ) -> ProbeResult<Artifact> {
        let timestamp = Utc::now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let file_path = self
            .dir
            .join(artifact_file_name(test_name, full_page, timestamp, seq));

        match self.write(driver, &file_path, full_page).await {
            Ok(bytes) => {
                self.logger.info_with(
                    format!("Screenshot saved: {}", file_path.display()),
                    json!({ "test": test_name, "full_page": full_page, "bytes": bytes }),
                );
                Ok(Artifact {
                    test_name: test_name.to_string(),
                    timestamp,
                    full_page,
                    file_path,
                })
            }
            Err(message) => {
                let error = ProbeError::ArtifactCapture {
                    test_name: test_name.to_string(),
                    message,
                };
                self.logger.error(error.to_string());
                Err(error)
            }
        }
    }

    async fn write(
        &self,
        driver: &dyn Driver,
        path: &Path,
        full_page: bool,
    ) -> Result<usize, String> {
        let data = driver
            .screenshot(full_page)
            .await
            .map_err(|e| e.to_string())?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| format!("cannot create {}: {e}", self.dir.display()))?;
        tokio::fs::write(path, &data)
            .await
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        Ok(data.len())
    }
}
