//! Home (dashboard) page

use crate::locator::Locator;
use crate::page_object::{BasePage, LocatorTable, PageObject};
use crate::result::ProbeResult;
use async_trait::async_trait;

/// Route of the dashboard shown after a successful login
pub const DASHBOARD_PATH: &str = "/web/index.php/dashboard/index";

/// Breadcrumb heading ("Dashboard")
pub const DASHBOARD_HEADING: &str = ".oxd-topbar-header-breadcrumb";
/// User dropdown trigger
pub const USER_PROFILE_MENU: &str = ".oxd-userdropdown-tab";
/// Logout entry of the user dropdown
pub const LOGOUT_BUTTON: &str = r#"a[href="/web/index.php/auth/logout"]"#;
/// Side navigation
pub const SIDEBAR_MENU: &str = ".oxd-sidebar-body";
/// Main layout container
pub const MAIN_CONTENT: &str = ".oxd-layout-context";
/// Top bar title
pub const PAGE_TITLE: &str = ".oxd-topbar-header-title h6";

/// Locators of the home page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeLocators {
    /// Breadcrumb heading
    pub dashboard_heading: Locator,
    /// User dropdown trigger
    pub user_profile_menu: Locator,
    /// Logout entry
    pub logout_button: Locator,
    /// Side navigation
    pub sidebar_menu: Locator,
    /// Main layout container
    pub main_content: Locator,
    /// Top bar title
    pub page_title: Locator,
}

impl Default for HomeLocators {
    fn default() -> Self {
        Self {
            dashboard_heading: Locator::css(DASHBOARD_HEADING).named("dashboard heading"),
            user_profile_menu: Locator::css(USER_PROFILE_MENU).named("user profile menu"),
            logout_button: Locator::css(LOGOUT_BUTTON).named("logout button"),
            sidebar_menu: Locator::css(SIDEBAR_MENU).named("sidebar menu"),
            main_content: Locator::css(MAIN_CONTENT).named("main content"),
            page_title: Locator::css(PAGE_TITLE).named("page title"),
        }
    }
}

impl HomeLocators {
    /// As a named table
    #[must_use]
    pub fn table(&self) -> LocatorTable {
        LocatorTable::new()
            .with("dashboard_heading", self.dashboard_heading.clone())
            .with("user_profile_menu", self.user_profile_menu.clone())
            .with("logout_button", self.logout_button.clone())
            .with("sidebar_menu", self.sidebar_menu.clone())
            .with("main_content", self.main_content.clone())
            .with("page_title", self.page_title.clone())
    }
}

/// The dashboard shown to an authenticated user
#[derive(Debug, Clone)]
pub struct HomePage {
    base: BasePage,
    locators: HomeLocators,
}

impl HomePage {
    /// Bind to a session
    #[must_use]
    pub fn new(base: BasePage) -> Self {
        Self {
            base,
            locators: HomeLocators::default(),
        }
    }

    /// Locators in use
    #[must_use]
    pub const fn locators(&self) -> &HomeLocators {
        &self.locators
    }

    /// Whether the main layout is visible
    pub async fn is_homepage_displayed(&self) -> bool {
        let visible = self.base.is_visible(&self.locators.main_content).await;
        self.base
            .logger()
            .info(format!("Homepage displayed: {visible}"));
        visible
    }

    /// Breadcrumb text, or `None` on failure
    pub async fn get_dashboard_heading(&self) -> Option<String> {
        match self.base.read_text(&self.locators.dashboard_heading).await {
            Ok(heading) => {
                self.base
                    .logger()
                    .info(format!("Dashboard heading: {heading:?}"));
                heading
            }
            Err(_) => None,
        }
    }

    /// Top bar title, or `None` on failure
    pub async fn get_page_title(&self) -> Option<String> {
        self.base
            .read_text(&self.locators.page_title)
            .await
            .ok()
            .flatten()
    }

    /// Open the user dropdown
    pub async fn click_user_profile(&self) -> ProbeResult<()> {
        self.base.logger().info("Clicking user profile menu");
        self.base.click(&self.locators.user_profile_menu).await
    }

    /// Whether the side navigation is visible
    pub async fn is_sidebar_visible(&self) -> bool {
        self.base.is_visible(&self.locators.sidebar_menu).await
    }

    /// Open the user menu, wait for its logout entry, click it.
    pub async fn logout(&self) -> ProbeResult<()> {
        let logger = self.base.logger();
        logger.info("Logging out");
        let result = async {
            self.click_user_profile().await?;
            self.base
                .wait_for(&self.locators.logout_button, self.base.default_timeout())
                .await?;
            self.base
                .waits()
                .wait_for_navigation(
                    self.base.click(&self.locators.logout_button),
                    self.base.config().navigation_timeout(),
                )
                .await
                .into_result()
        }
        .await;
        match &result {
            Ok(()) => logger.info("Logout completed"),
            Err(e) => logger.error(format!("Logout failed: {e}")),
        }
        result
    }
}

#[async_trait]
impl PageObject for HomePage {
    fn page_name(&self) -> &str {
        "HomePage"
    }

    fn url_pattern(&self) -> &str {
        DASHBOARD_PATH
    }

    fn ready_locator(&self) -> &Locator {
        &self.locators.main_content
    }

    fn base(&self) -> &BasePage {
        &self.base
    }
}
