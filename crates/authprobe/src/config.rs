//! Harness configuration
//!
//! Defaults mirror the target environment the suites were written against.
//! A YAML file may override any field; `BASE_URL` and `LOG_LEVEL` environment
//! variables override `base_url` and `log_level` last.

use crate::logger::LogLevel;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`HarnessConfig::base_url`]
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Environment variable overriding [`HarnessConfig::log_level`]
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Default application under test
pub const DEFAULT_BASE_URL: &str = "https://opensource-demo.orangehrmlive.com";

/// Default login route
pub const DEFAULT_LOGIN_PATH: &str = "/web/index.php/auth/login";

/// Username/password pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account secret
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("Admin", "admin123")
    }
}

/// Output locations for result exports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPaths {
    /// Directory for `results.json` and `junit.xml`
    pub report_dir: PathBuf,
    /// Directory reserved for Allure result files
    pub allure_dir: PathBuf,
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("./test-results"),
            allure_dir: PathBuf::from("./allure-results"),
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Origin of the application under test
    pub base_url: String,
    /// Path of the login page, relative to `base_url`
    pub login_path: String,
    /// Default element wait budget
    pub default_timeout_ms: u64,
    /// Navigation settle budget
    pub navigation_timeout_ms: u64,
    /// Account used by the positive flows
    pub valid_credentials: Credentials,
    /// Minimum emitted log level
    pub log_level: LogLevel,
    /// Outer-runner retries for a failed test
    pub max_retries: u32,
    /// Capture a screenshot when a test fails
    pub screenshot_on_failure: bool,
    /// Record video when a test fails (honoured only by drivers that record)
    pub video_on_failure: bool,
    /// Result export locations
    pub report_paths: ReportPaths,
    /// Log file directory
    pub logs_dir: PathBuf,
    /// Screenshot directory
    pub screenshots_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            default_timeout_ms: 30_000,
            navigation_timeout_ms: 30_000,
            valid_credentials: Credentials::default(),
            log_level: LogLevel::Info,
            max_retries: 2,
            screenshot_on_failure: true,
            video_on_failure: true,
            report_paths: ReportPaths::default(),
            logs_dir: PathBuf::from("./logs"),
            screenshots_dir: PathBuf::from("./screenshots"),
        }
    }
}

impl HarnessConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file; missing fields keep their defaults
    pub fn from_yaml_file(path: &Path) -> ProbeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse from YAML text
    pub fn from_yaml_str(contents: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `BASE_URL` / `LOG_LEVEL` from the process environment
    pub fn apply_env(self) -> ProbeResult<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants the harness relies on
    pub fn validate(&self) -> ProbeResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProbeError::config("base_url must not be empty"));
        }
        if self.default_timeout_ms == 0 {
            return Err(ProbeError::config("default_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Join `path` onto the base URL
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("about:")
        {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Absolute login page URL
    #[must_use]
    pub fn login_url(&self) -> String {
        self.url_for(&self.login_path)
    }

    /// Default element wait budget
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Navigation settle budget
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_target_environment() {
        let config = HarnessConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.default_timeout_ms, 30_000);
        assert_eq!(config.max_retries, 2);
        assert!(config.screenshot_on_failure);
        assert_eq!(config.valid_credentials, Credentials::new("Admin", "admin123"));
    }

    #[test]
    fn test_url_joining() {
        let mut config = HarnessConfig::default();
        config.base_url = "http://localhost:8080/".to_string();
        assert_eq!(config.url_for("/login"), "http://localhost:8080/login");
        assert_eq!(config.url_for("login"), "http://localhost:8080/login");
        assert_eq!(config.url_for(""), "http://localhost:8080");
        assert_eq!(config.url_for("https://other.test/x"), "https://other.test/x");
        assert_eq!(
            HarnessConfig::default().login_url(),
            "https://opensource-demo.orangehrmlive.com/web/index.php/auth/login"
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(BASE_URL_ENV, "http://staging.test"), (LOG_LEVEL_ENV, "debug")]);
        let config = HarnessConfig::default()
            .apply_env_with(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://staging.test");
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_env_override_rejects_bad_level() {
        let result = HarnessConfig::default()
            .apply_env_with(|k| (k == LOG_LEVEL_ENV).then(|| "LOUD".to_string()));
        assert!(matches!(result, Err(ProbeError::Config { .. })));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = HarnessConfig::default()
            .apply_env_with(|_| Some("  ".to_string()))
            .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml_str(
            "base_url: http://localhost:3000\nlog_level: WARN\nreport_paths:\n  report_dir: out\n",
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.report_paths.report_dir, PathBuf::from("out"));
        assert_eq!(config.report_paths.allure_dir, PathBuf::from("./allure-results"));
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
    }

    #[test]
    fn test_yaml_roundtrip_of_defaults() {
        let yaml = HarnessConfig::default().to_yaml().unwrap();
        assert_eq!(HarnessConfig::from_yaml_str(&yaml).unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = HarnessConfig::from_yaml_str("default_timeout_ms: 0\n");
        assert!(matches!(result, Err(ProbeError::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = HarnessConfig::from_yaml_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ProbeError::Config { .. })));
    }
}
