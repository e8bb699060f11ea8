//! Result and error types for authprobe.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for authprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Navigation to a URL failed at the driver level
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A required element did not appear before the timeout
    #[error("Element not found: {locator} (waited {elapsed_ms}ms)")]
    ElementNotFound {
        /// Locator that was waited for
        locator: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// A generic wait condition was not met before the timeout
    #[error("Condition not met: {condition} (waited {elapsed_ms}ms)")]
    ConditionTimeout {
        /// Description of the condition
        condition: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// The network did not settle after an action. Only ever logged.
    #[error("Navigation did not settle within {timeout_ms}ms")]
    NavigationSettleTimeout {
        /// Settle budget in milliseconds
        timeout_ms: u64,
    },

    /// Screenshot or other artifact could not be written
    #[error("Artifact capture failed for {test_name}: {message}")]
    ArtifactCapture {
        /// Test the artifact belongs to
        test_name: String,
        /// Error message
        message: String,
    },

    /// External test data was missing or malformed
    #[error("Failed to load test data from {}: {message}", path.display())]
    DataLoad {
        /// Source path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Opaque failure reported by the browser driver
    #[error("Driver error during {operation}: {message}")]
    Driver {
        /// Driver operation that failed
        operation: String,
        /// Error message
        message: String,
    },

    /// Raw driver-level timeout
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Scenario expectation failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A browser session could not be opened or closed
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a driver error for the given operation
    #[must_use]
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error came from a timed wait running out
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ElementNotFound { .. }
                | Self::ConditionTimeout { .. }
                | Self::NavigationSettleTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_message_names_locator_and_elapsed() {
        let err = ProbeError::ElementNotFound {
            locator: "input[name=\"username\"]".to_string(),
            elapsed_ms: 1500,
        };
        let msg = err.to_string();
        assert!(msg.contains("input[name=\"username\"]"));
        assert!(msg.contains("1500ms"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(ProbeError::Timeout { ms: 10 }.is_timeout());
        assert!(ProbeError::ConditionTimeout {
            condition: "x".into(),
            elapsed_ms: 1
        }
        .is_timeout());
        assert!(!ProbeError::driver("click", "detached").is_timeout());
        assert!(!ProbeError::assertion("nope").is_timeout());
    }

    #[test]
    fn test_data_load_display() {
        let err = ProbeError::DataLoad {
            path: PathBuf::from("data/cases.json"),
            message: "missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load test data from data/cases.json: missing"
        );
    }
}
