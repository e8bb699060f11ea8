//! End-to-end scenario runs against the simulated login application.

#![allow(clippy::unwrap_used)]

use authprobe::mock::{LoginAppConfig, MockDriver, MockSessionFactory};
use authprobe::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Env {
    config: Arc<HarnessConfig>,
    logger: Arc<Logger>,
    capturer: Arc<ScreenshotCapturer>,
    tmp: TempDir,
}

fn env() -> Env {
    let tmp = TempDir::new().unwrap();
    let mut config = HarnessConfig::default();
    config.logs_dir = tmp.path().join("logs");
    config.screenshots_dir = tmp.path().join("screenshots");
    config.report_paths.report_dir = tmp.path().join("test-results");
    let logger = Arc::new(Logger::new(
        LoggerConfig::default()
            .with_level(LogLevel::Debug)
            .with_logs_dir(&config.logs_dir)
            .with_console(false),
    ));
    let capturer = Arc::new(ScreenshotCapturer::new(&config.screenshots_dir, logger.clone()));
    Env {
        config: Arc::new(config),
        logger,
        capturer,
        tmp,
    }
}

fn executor(
    env: &Env,
    sessions: Arc<MockSessionFactory>,
    options: ExecutorOptions,
) -> DataDrivenExecutor {
    let lifecycle = Arc::new(TestLifecycle::new(
        env.logger.clone(),
        env.capturer.clone(),
        &env.config,
    ));
    DataDrivenExecutor::new(sessions, lifecycle, env.config.clone(), options)
}

fn pages(env: &Env, driver: Arc<MockDriver>) -> (LoginPage, HomePage) {
    let base = BasePage::new(
        driver,
        env.logger.clone(),
        env.capturer.clone(),
        env.config.clone(),
    );
    (LoginPage::new(base.clone()), HomePage::new(base))
}

#[tokio::test(start_paused = true)]
async fn canonical_table_matches_expectations() {
    let env = env();
    let sessions = Arc::new(MockSessionFactory::login_app(LoginAppConfig::from_harness(
        &env.config,
    )));
    let executor = executor(&env, sessions.clone(), ExecutorOptions::new());
    let provider = TestDataProvider::new(env.logger.clone());
    let cases = provider.load_static(canonical_login_cases());
    provider.validate_unique_ids(&cases).unwrap();

    let report = executor
        .run_suite("login-data-driven", &SuiteKind::Login.scenarios(&cases))
        .await;

    assert!(report.success());
    assert_eq!(report.outcomes().len(), cases.len());
    for (case, outcome) in cases.iter().zip(report.outcomes()) {
        assert_eq!(outcome.name, case.title());
        assert_eq!(outcome.status, TestStatus::Passed);
    }

    // Each row had its own session and every session was closed.
    assert_eq!(sessions.opened(), 8);
    let dashboards = sessions
        .sessions()
        .iter()
        .filter(|s| s.current_url().ends_with("/dashboard/index"))
        .count();
    assert_eq!(dashboards, 1);

    let results = env.tmp.path().join("test-results");
    let json = std::fs::read_to_string(results.join(RESULTS_FILE)).unwrap();
    let run: RunReport = serde_json::from_str(&json).unwrap();
    assert_eq!(run.stats.total, 8);
    assert!(results.join(JUNIT_FILE).exists());

    let log = std::fs::read_to_string(env.logger.file_path().unwrap()).unwrap();
    assert!(log.contains("[INFO] Success Rate: 100.00%"));
}

#[tokio::test(start_paused = true)]
async fn invalid_password_shows_banner_and_keeps_form() {
    let env = env();
    let driver = Arc::new(MockDriver::login_app(LoginAppConfig::from_harness(&env.config)));
    let (login, _) = pages(&env, driver);

    login.navigate_to_login().await.unwrap();
    login.login("Admin", "wrongpassword").await.unwrap();
    login
        .base()
        .wait_for(&login.locators().error_message, env.config.default_timeout())
        .await
        .unwrap();

    assert!(login.is_error_displayed().await);
    assert_eq!(login.get_error_message().await.as_deref(), Some("Invalid credentials"));
    assert!(login.base().is_visible(&login.locators().username_input).await);
}

#[tokio::test(start_paused = true)]
async fn empty_fields_never_reach_the_dashboard() {
    let env = env();
    for (user, pass) in [("", "admin123"), ("Admin", ""), ("", "")] {
        let driver = Arc::new(MockDriver::login_app(LoginAppConfig::from_harness(&env.config)));
        let (login, home) = pages(&env, driver.clone());
        login.navigate_to_login().await.unwrap();
        login.login(user, pass).await.unwrap();
        login
            .base()
            .wait_for(&login.locators().field_error, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(login.is_field_error_displayed().await);
        assert!(!home.is_homepage_displayed().await);
    }
}

#[tokio::test(start_paused = true)]
async fn logout_and_session_suites_pass() {
    let env = env();
    let sessions = Arc::new(MockSessionFactory::login_app(LoginAppConfig::from_harness(
        &env.config,
    )));
    let executor = executor(&env, sessions, ExecutorOptions::new().with_concurrency(2));

    let report = executor
        .run_suite("logout", &SuiteKind::All.scenarios(&[]))
        .await;

    assert!(report.success());
    let names: Vec<_> = report.outcomes().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["TC009 - Successful Logout", "TC010 - Verify Login Session"]
    );
}

#[tokio::test(start_paused = true)]
async fn broken_row_fails_alone_with_screenshot() {
    let env = env();
    let sessions = Arc::new(MockSessionFactory::new({
        let app = LoginAppConfig::default();
        move |index| {
            let driver = MockDriver::login_app(app.clone());
            if index == 1 {
                driver.fail_on("goto", "net::ERR_CONNECTION_RESET");
            }
            driver
        }
    }));
    let executor = executor(&env, sessions, ExecutorOptions::new());
    let cases: Vec<_> = canonical_login_cases().into_iter().take(3).collect();

    let report = executor
        .run_suite("login", &SuiteKind::Login.scenarios(&cases))
        .await;

    assert!(!report.success());
    let statuses: Vec<_> = report.outcomes().iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![TestStatus::Passed, TestStatus::Failed, TestStatus::Passed]
    );
    let failed = &report.outcomes()[1];
    assert!(failed.error.as_deref().unwrap().contains("ERR_CONNECTION_RESET"));
    assert_eq!(failed.artifacts.len(), 1);
    let file = failed.artifacts[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(file.starts_with("TC002_-_Invalid_Username_"), "{file}");
    assert!(env.logger.contains(LogLevel::Error, "Navigate failed"));
}
