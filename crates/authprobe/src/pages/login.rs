//! Login page

use crate::locator::Locator;
use crate::page_object::{BasePage, LocatorTable, PageObject};
use crate::result::ProbeResult;
use crate::wait::NavigationOutcome;
use async_trait::async_trait;

/// Username input
pub const USERNAME_INPUT: &str = r#"input[name="username"]"#;
/// Password input
pub const PASSWORD_INPUT: &str = r#"input[name="password"]"#;
/// Submit button
pub const LOGIN_BUTTON: &str = r#"button[type="submit"]"#;
/// Invalid-credentials banner
pub const ERROR_MESSAGE: &str = ".oxd-alert-content";
/// Form heading
pub const PAGE_HEADING: &str = "h5.oxd-text";
/// Remember-me checkbox
pub const REMEMBER_ME_CHECKBOX: &str = r#"input[name="rememberMe"]"#;
/// Per-field validation message ("Required")
pub const FIELD_ERROR: &str = ".oxd-input-field-error";

/// Forgot-password link, matched by its text
#[must_use]
pub fn forgot_password_locator() -> Locator {
    Locator::css_with_text("a", "Forgot your password?")
}

/// Locators of the login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginLocators {
    /// Username input
    pub username_input: Locator,
    /// Password input
    pub password_input: Locator,
    /// Submit button
    pub login_button: Locator,
    /// Invalid-credentials banner
    pub error_message: Locator,
    /// Form heading
    pub page_heading: Locator,
    /// Remember-me checkbox
    pub remember_me: Locator,
    /// Forgot-password link
    pub forgot_password: Locator,
    /// Field validation message
    pub field_error: Locator,
}

impl Default for LoginLocators {
    fn default() -> Self {
        Self {
            username_input: Locator::css(USERNAME_INPUT).named("username input"),
            password_input: Locator::css(PASSWORD_INPUT).named("password input"),
            login_button: Locator::css(LOGIN_BUTTON).named("login button"),
            error_message: Locator::css(ERROR_MESSAGE).named("error message"),
            page_heading: Locator::css(PAGE_HEADING).named("page heading"),
            remember_me: Locator::css(REMEMBER_ME_CHECKBOX).named("remember me"),
            forgot_password: forgot_password_locator().named("forgot password"),
            field_error: Locator::css(FIELD_ERROR).named("field error"),
        }
    }
}

impl LoginLocators {
    /// As a named table
    #[must_use]
    pub fn table(&self) -> LocatorTable {
        LocatorTable::new()
            .with("username_input", self.username_input.clone())
            .with("password_input", self.password_input.clone())
            .with("login_button", self.login_button.clone())
            .with("error_message", self.error_message.clone())
            .with("page_heading", self.page_heading.clone())
            .with("remember_me", self.remember_me.clone())
            .with("forgot_password", self.forgot_password.clone())
            .with("field_error", self.field_error.clone())
    }
}

/// The login form
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: BasePage,
    locators: LoginLocators,
}

impl LoginPage {
    /// Bind to a session
    #[must_use]
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            locators: LoginLocators::default(),
        }
    }

    /// Locators in use
    #[must_use]
    pub const fn locators(&self) -> &LoginLocators {
        &self.locators
    }

    /// Open the login page and wait for the form
    pub async fn navigate_to_login(&self) -> ProbeResult<()> {
        let logger = self.base.logger();
        logger.info("Navigating to login page");
        let login_path = self.base.config().login_path.clone();
        let result = async {
            self.base.navigate(&login_path).await?;
            self.base
                .wait_for(&self.locators.username_input, self.base.default_timeout())
                .await
        }
        .await;
        match result {
            Ok(_) => {
                logger.info("Login page loaded");
                Ok(())
            }
            Err(e) => {
                logger.error(format!("Failed to open login page: {e}"));
                Err(e)
            }
        }
    }

    /// Type the username
    pub async fn enter_username(&self, username: &str) -> ProbeResult<()> {
        self.base
            .logger()
            .info(format!("Entering username: {username}"));
        self.base.fill(&self.locators.username_input, username).await
    }

    /// Type the password
    pub async fn enter_password(&self, password: &str) -> ProbeResult<()> {
        self.base.logger().info("Entering password");
        self.base.fill(&self.locators.password_input, password).await
    }

    /// Submit the form, then give the resulting navigation a bounded chance
    /// to settle. Only the click itself can fail.
    pub async fn click_login_button(&self) -> ProbeResult<()> {
        self.base.logger().info("Clicking login button");
        let outcome: NavigationOutcome<()> = self
            .base
            .waits()
            .wait_for_navigation(
                self.base.click(&self.locators.login_button),
                self.base.config().navigation_timeout(),
            )
            .await;
        outcome.into_result()
    }

    /// Fill the non-empty credentials and submit
    pub async fn login(&self, username: &str, password: &str) -> ProbeResult<()> {
        let logger = self.base.logger();
        logger.info(format!("Attempting login with username: {username}"));
        let result = async {
            if !username.is_empty() {
                self.enter_username(username).await?;
            }
            if !password.is_empty() {
                self.enter_password(password).await?;
            }
            self.click_login_button().await
        }
        .await;
        match &result {
            Ok(()) => logger.info("Login action completed"),
            Err(e) => logger.error(format!("Login failed: {e}")),
        }
        result
    }

    /// Whether the invalid-credentials banner is visible
    pub async fn is_error_displayed(&self) -> bool {
        self.base.is_visible(&self.locators.error_message).await
    }

    /// Banner text, or `None` when no banner is shown
    pub async fn get_error_message(&self) -> Option<String> {
        if !self.is_error_displayed().await {
            return None;
        }
        match self.base.read_text(&self.locators.error_message).await {
            Ok(text) => text.map(|t| t.trim().to_string()),
            Err(_) => {
                self.base.logger().debug("No error message found");
                None
            }
        }
    }

    /// Whether a field validation message is visible
    pub async fn is_field_error_displayed(&self) -> bool {
        self.base.is_visible(&self.locators.field_error).await
    }

    /// Whether the login form is shown
    pub async fn is_login_page_displayed(&self) -> bool {
        self.base.is_visible(&self.locators.username_input).await
    }

    /// Heading text, or `None` on failure
    pub async fn get_page_heading(&self) -> Option<String> {
        self.base
            .read_text(&self.locators.page_heading)
            .await
            .ok()
            .flatten()
    }

    /// Toggle the remember-me checkbox
    pub async fn click_remember_me(&self) -> ProbeResult<()> {
        self.base.logger().info("Clicking remember me checkbox");
        self.base.click(&self.locators.remember_me).await
    }

    /// Follow the forgot-password link
    pub async fn click_forgot_password(&self) -> ProbeResult<()> {
        self.base.logger().info("Clicking forgot password link");
        self.base.click(&self.locators.forgot_password).await
    }

    /// Empty the username input
    pub async fn clear_username_field(&self) -> ProbeResult<()> {
        self.base.logger().debug("Clearing username field");
        self.base.fill(&self.locators.username_input, "").await
    }

    /// Empty the password input
    pub async fn clear_password_field(&self) -> ProbeResult<()> {
        self.base.logger().debug("Clearing password field");
        self.base.fill(&self.locators.password_input, "").await
    }
}

#[async_trait]
impl PageObject for LoginPage {
    fn page_name(&self) -> &str {
        "LoginPage"
    }

    fn url_pattern(&self) -> &str {
        &self.base.config().login_path
    }

    fn ready_locator(&self) -> &Locator {
        &self.locators.username_input
    }

    fn base(&self) -> &BasePage {
        &self.base
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::logger::{LogLevel, Logger};
    use crate::mock::{LoginAppConfig, MockDriver, RESET_PASSWORD_PATH};
    use crate::result::ProbeError;
    use crate::screenshot::ScreenshotCapturer;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        driver: Arc<MockDriver>,
        page: LoginPage,
        logger: Arc<Logger>,
        _tmp: TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let driver = Arc::new(MockDriver::login_app(LoginAppConfig::default()));
        let logger = Arc::new(Logger::in_memory(LogLevel::Debug));
        let capturer = Arc::new(ScreenshotCapturer::new(tmp.path(), logger.clone()));
        let base = BasePage::new(
            driver.clone(),
            logger.clone(),
            capturer,
            Arc::new(HarnessConfig::default()),
        );
        Fixture {
            driver,
            page: LoginPage::new(base),
            logger,
            _tmp: tmp,
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_table_has_every_locator() {
            let table = LoginLocators::default().table();
            assert_eq!(table.len(), 8);
            assert_eq!(
                table.get("forgot_password").unwrap().to_string(),
                "a:has-text(\"Forgot your password?\")"
            );
        }
    }

    mod flow_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_to_login() {
            let f = fixture();
            f.page.navigate_to_login().await.unwrap();
            assert!(f.page.is_login_page_displayed().await);
            assert!(f.page.is_current().await);
            assert!(f.page.is_loaded().await);
            assert_eq!(f.page.get_page_heading().await.as_deref(), Some("Login"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigate_failure_propagates() {
            let f = fixture();
            f.driver.fail_on("goto", "net::ERR_CONNECTION_REFUSED");
            let err = f.page.navigate_to_login().await.unwrap_err();
            assert!(matches!(err, ProbeError::Navigation { .. }));
            assert!(f.logger.contains(LogLevel::Error, "Failed to open login page"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_wrong_password_shows_banner() {
            let f = fixture();
            f.page.navigate_to_login().await.unwrap();
            f.page.login("Admin", "wrongpassword").await.unwrap();
            assert!(f.page.is_error_displayed().await);
            assert_eq!(
                f.page.get_error_message().await.as_deref(),
                Some("Invalid credentials")
            );
            assert!(f.page.is_login_page_displayed().await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_empty_fields_are_not_typed() {
            let f = fixture();
            f.page.navigate_to_login().await.unwrap();
            f.page.login("", "admin123").await.unwrap();
            assert!(!f.driver.was_called(&format!("fill:{USERNAME_INPUT}")));
            assert!(f.driver.was_called(&format!("fill:{PASSWORD_INPUT}")));
            assert!(f.page.get_error_message().await.is_none());
            assert!(f.page.is_login_page_displayed().await);
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(f.page.is_field_error_displayed().await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_login_fails_when_button_missing() {
            let f = fixture();
            f.driver.fail_on("click", "element is not attached");
            f.page.navigate_to_login().await.unwrap();
            let err = f.page.login("Admin", "admin123").await.unwrap_err();
            assert!(matches!(err, ProbeError::Driver { .. }));
            assert!(f.logger.contains(LogLevel::Error, "Login failed"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_clear_fields() {
            let f = fixture();
            f.page.navigate_to_login().await.unwrap();
            f.page.enter_username("Admin").await.unwrap();
            f.page.clear_username_field().await.unwrap();
            assert_eq!(f.driver.value_of(USERNAME_INPUT), "");
            f.page.enter_password("secret").await.unwrap();
            f.page.clear_password_field().await.unwrap();
            assert_eq!(f.driver.value_of(PASSWORD_INPUT), "");
        }

        #[tokio::test(start_paused = true)]
        async fn test_remember_me_and_forgot_password() {
            let f = fixture();
            f.page.navigate_to_login().await.unwrap();
            f.page.click_remember_me().await.unwrap();
            assert_eq!(f.driver.value_of(REMEMBER_ME_CHECKBOX), "on");

            f.page.click_forgot_password().await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(f.driver.current_url().ends_with(RESET_PASSWORD_PATH));
            assert!(!f.page.is_current().await);
        }
    }
}
