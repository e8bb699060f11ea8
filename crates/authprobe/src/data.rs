//! Test data
//!
//! Scenario rows and the provider that loads, looks up and partitions them.

use crate::logger::Logger;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// One row of a data-driven scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique id (e.g. `TC001`)
    #[serde(rename = "testId")]
    pub id: String,
    /// Short description
    #[serde(rename = "testName")]
    pub name: String,
    /// Username to submit (empty = leave the field untouched)
    pub username: String,
    /// Password to submit (empty = leave the field untouched)
    pub password: String,
    /// Human-readable expectation
    pub expected_result: String,
    /// Whether the login is expected to reach the dashboard
    pub should_succeed: bool,
}

impl TestCase {
    /// Create a row
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        expected_result: impl Into<String>,
        should_succeed: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            username: username.into(),
            password: password.into(),
            expected_result: expected_result.into(),
            should_succeed,
        }
    }

    /// Test title, `"<id> - <name>"`
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

const INVALID_CREDENTIALS: &str = "Invalid credentials message should be displayed";

/// The canonical login table (TC001 to TC008)
#[must_use]
pub fn canonical_login_cases() -> Vec<TestCase> {
    vec![
        TestCase::new(
            "TC001",
            "Valid Login",
            "Admin",
            "admin123",
            "Dashboard should be displayed",
            true,
        ),
        TestCase::new(
            "TC002",
            "Invalid Username",
            "InvalidUser",
            "admin123",
            INVALID_CREDENTIALS,
            false,
        ),
        TestCase::new(
            "TC003",
            "Invalid Password",
            "Admin",
            "wrongpassword",
            INVALID_CREDENTIALS,
            false,
        ),
        TestCase::new(
            "TC004",
            "Empty Username",
            "",
            "admin123",
            "Required field validation message should appear",
            false,
        ),
        TestCase::new(
            "TC005",
            "Empty Password",
            "Admin",
            "",
            "Required field validation message should appear",
            false,
        ),
        TestCase::new(
            "TC006",
            "Both Fields Empty",
            "",
            "",
            "Required field validation messages should appear",
            false,
        ),
        TestCase::new(
            "TC007",
            "Special Characters in Username",
            "Admin@123#",
            "admin123",
            INVALID_CREDENTIALS,
            false,
        ),
        TestCase::new(
            "TC008",
            "Space in Username",
            " Admin ",
            "admin123",
            INVALID_CREDENTIALS,
            false,
        ),
    ]
}

/// Ids that occur more than once, in sorted order
#[must_use]
pub fn duplicate_ids(cases: &[TestCase]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for case in cases {
        *counts.entry(case.id.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Loads and queries scenario rows
#[derive(Debug, Clone)]
pub struct TestDataProvider {
    logger: Arc<Logger>,
}

impl TestDataProvider {
    /// Create a provider logging through `logger`
    #[must_use]
    pub const fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    /// Use rows defined in code
    #[must_use]
    pub fn load_static(&self, rows: Vec<TestCase>) -> Vec<TestCase> {
        self.logger
            .debug(format!("Loaded {} static test rows", rows.len()));
        rows
    }

    /// Load rows from a JSON array file.
    ///
    /// # Errors
    ///
    /// `DataLoad` when the file is missing or does not hold an array of rows.
    pub fn load_from_json(&self, path: &Path) -> ProbeResult<Vec<TestCase>> {
        let result = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                serde_json::from_str::<Vec<TestCase>>(&text).map_err(|e| e.to_string())
            });
        match result {
            Ok(rows) => {
                self.logger
                    .info(format!("Test data loaded from JSON: {}", path.display()));
                Ok(rows)
            }
            Err(message) => {
                let error = ProbeError::DataLoad {
                    path: path.to_path_buf(),
                    message,
                };
                self.logger.error(error.to_string());
                Err(error)
            }
        }
    }

    /// Row with `id`, or `None` (logged at WARN)
    #[must_use]
    pub fn find_by_id<'a>(&self, cases: &'a [TestCase], id: &str) -> Option<&'a TestCase> {
        let found = cases.iter().find(|c| c.id == id);
        if found.is_none() {
            self.logger
                .warn(format!("Test data not found for ID: {id}"));
        }
        found
    }

    /// Row named `name`, or `None` (logged at WARN)
    #[must_use]
    pub fn find_by_name<'a>(&self, cases: &'a [TestCase], name: &str) -> Option<&'a TestCase> {
        let found = cases.iter().find(|c| c.name == name);
        if found.is_none() {
            self.logger
                .warn(format!("Test data not found for name: {name}"));
        }
        found
    }

    /// Rows matching `predicate`, in input order
    #[must_use]
    pub fn filter<F>(&self, cases: &[TestCase], predicate: F) -> Vec<TestCase>
    where
        F: Fn(&TestCase) -> bool,
    {
        cases.iter().filter(|c| predicate(c)).cloned().collect()
    }

    /// Rows expected to log in
    #[must_use]
    pub fn positive_cases(&self, cases: &[TestCase]) -> Vec<TestCase> {
        self.filter(cases, |c| c.should_succeed)
    }

    /// Rows expected to be rejected
    #[must_use]
    pub fn negative_cases(&self, cases: &[TestCase]) -> Vec<TestCase> {
        self.filter(cases, |c| !c.should_succeed)
    }

    /// Fail when any id is used twice.
    ///
    /// # Errors
    ///
    /// `Config` naming the duplicated ids.
    pub fn validate_unique_ids(&self, cases: &[TestCase]) -> ProbeResult<()> {
        let dupes = duplicate_ids(cases);
        if dupes.is_empty() {
            Ok(())
        } else {
            let error = ProbeError::config(format!("duplicate test ids: {}", dupes.join(", ")));
            self.logger.error(error.to_string());
            Err(error)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn provider() -> (TestDataProvider, Arc<Logger>) {
        let logger = Arc::new(Logger::in_memory(LogLevel::Debug));
        (TestDataProvider::new(logger.clone()), logger)
    }

    mod table_tests {
        use super::*;

        #[test]
        fn test_canonical_table() {
            let cases = canonical_login_cases();
            assert_eq!(cases.len(), 8);
            assert!(duplicate_ids(&cases).is_empty());
            assert_eq!(cases.iter().filter(|c| c.should_succeed).count(), 1);
            assert_eq!(cases[0].title(), "TC001 - Valid Login");
            assert_eq!(cases[7].username, " Admin ");
        }

        #[test]
        fn test_serialized_field_names() {
            let json = serde_json::to_value(&canonical_login_cases()[0]).unwrap();
            assert_eq!(json["testId"], "TC001");
            assert_eq!(json["testName"], "Valid Login");
            assert_eq!(json["expectedResult"], "Dashboard should be displayed");
            assert_eq!(json["shouldSucceed"], true);
        }
    }

    mod provider_tests {
        use super::*;

        #[test]
        fn test_lookup_and_partition() {
            let (provider, logger) = provider();
            let cases = provider.load_static(canonical_login_cases());

            assert_eq!(provider.find_by_id(&cases, "TC003").unwrap().password, "wrongpassword");
            assert_eq!(
                provider.find_by_name(&cases, "Both Fields Empty").unwrap().id,
                "TC006"
            );
            assert!(provider.find_by_id(&cases, "TC999").is_none());
            assert!(logger.contains(LogLevel::Warn, "TC999"));

            assert_eq!(provider.positive_cases(&cases).len(), 1);
            assert_eq!(provider.negative_cases(&cases).len(), 7);
            let empty_user = provider.filter(&cases, |c| c.username.is_empty());
            let ids: Vec<_> = empty_user.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["TC004", "TC006"]);
        }

        #[test]
        fn test_load_from_json() {
            let (provider, _) = provider();
            let mut file = NamedTempFile::new().unwrap();
            write!(
                file,
                r#"[{{"testId":"X1","testName":"Custom","username":"u","password":"p","expectedResult":"r","shouldSucceed":false}}]"#
            )
            .unwrap();
            let rows = provider.load_from_json(file.path()).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, "X1");
        }

        #[test]
        fn test_load_errors() {
            let (provider, logger) = provider();
            let err = provider
                .load_from_json(Path::new("/no/such/rows.json"))
                .unwrap_err();
            assert!(matches!(err, ProbeError::DataLoad { .. }));

            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{{\"not\": \"an array\"}}").unwrap();
            let err = provider.load_from_json(file.path()).unwrap_err();
            assert!(matches!(err, ProbeError::DataLoad { .. }));
            assert_eq!(logger.entries_at(LogLevel::Error).len(), 2);
        }

        #[test]
        fn test_duplicate_ids_rejected() {
            let (provider, _) = provider();
            let mut cases = canonical_login_cases();
            cases.push(cases[1].clone());
            assert_eq!(duplicate_ids(&cases), vec!["TC002".to_string()]);
            assert!(matches!(
                provider.validate_unique_ids(&cases),
                Err(ProbeError::Config { .. })
            ));
        }
    }
}
