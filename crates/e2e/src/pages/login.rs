use std::time::Instant;
use tracing::{info, warn};

use super::{ui, HomePage, Tab};
use crate::driver::{click_expecting_dialog, click_when_visible, fill_when_visible, Driver, WaitState, POLL_INTERVAL};
use crate::error::{E2eError, E2eResult};
use crate::session::{Cookie, Credentials};

pub const SIGN_UP_SUCCESS: &str = "Sign up successful.";
pub const USER_EXISTS: &str = "This user already exist.";

/// Sign-up and log-in modals reached from the navbar.
pub struct LoginPage<'a, D: Driver + ?Sized> {
    tab: Tab<'a, D>,
}

impl<'a, D: Driver + ?Sized> LoginPage<'a, D> {
    pub(crate) fn new(tab: Tab<'a, D>) -> Self {
        Self { tab }
    }

    /// Register `credentials`. Any dialog other than the success message
    /// (e.g. "This user already exist.") is an `Auth` error.
    pub async fn sign_up(self, credentials: &Credentials) -> E2eResult<HomePage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;

        click_when_visible(driver, &ui::nav_sign_up(), timeouts.action()).await?;
        fill_when_visible(driver, &ui::sign_up_username(), &credentials.username, timeouts.action()).await?;
        fill_when_visible(driver, &ui::sign_up_password(), &credentials.password, timeouts.action()).await?;

        let dialog =
            click_expecting_dialog(driver, &ui::sign_up_submit(), timeouts.action(), timeouts.dialog()).await?;
        if dialog.message != SIGN_UP_SUCCESS {
            warn!(user = %credentials.username, dialog = %dialog.message, "sign-up rejected");
            return Err(E2eError::Auth(dialog.message));
        }

        info!(user = %credentials.username, "signed up");
        Ok(HomePage::new(Tab::new(driver, timeouts)))
    }

    /// Log in and return the browser's cookies once the welcome label shows.
    /// A dialog instead (wrong password, unknown user) is an `Auth` error.
    pub async fn log_in(self, credentials: &Credentials) -> E2eResult<(HomePage<'a, D>, Vec<Cookie>)> {
        let Tab { driver, timeouts } = self.tab;

        click_when_visible(driver, &ui::nav_log_in(), timeouts.action()).await?;
        fill_when_visible(driver, &ui::log_in_username(), &credentials.username, timeouts.action()).await?;
        fill_when_visible(driver, &ui::log_in_password(), &credentials.password, timeouts.action()).await?;

        driver
            .wait_for(&ui::log_in_submit(), WaitState::Visible, timeouts.action())
            .await?;
        driver.expect_dialog().await?;
        driver.click(&ui::log_in_submit()).await?;

        let deadline = Instant::now() + timeouts.navigation();
        loop {
            if let Some(dialog) = driver.poll_dialog().await? {
                warn!(user = %credentials.username, dialog = %dialog.message, "log-in rejected");
                return Err(E2eError::Auth(dialog.message));
            }
            if driver.is_visible(&ui::welcome_user()).await? {
                driver.disarm_dialog().await?;
                break;
            }
            if Instant::now() >= deadline {
                driver.disarm_dialog().await?;
                return Err(E2eError::timeout("welcome label after log in", timeouts.navigation()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let cookies = driver.cookies().await?;
        info!(user = %credentials.username, "logged in");
        Ok((HomePage::new(Tab::new(driver, timeouts)), cookies))
    }

    pub async fn log_out(self) -> E2eResult<HomePage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        driver
            .wait_for(&ui::welcome_user(), WaitState::Visible, timeouts.action())
            .await?;
        click_when_visible(driver, &ui::nav_log_out(), timeouts.action()).await?;
        driver
            .wait_for(&ui::welcome_user(), WaitState::Hidden, timeouts.action())
            .await?;
        info!("logged out");
        Ok(HomePage::new(Tab::new(driver, timeouts)))
    }

    /// Navigate back after logging out; the authenticated navbar must stay hidden.
    pub async fn go_back_and_check_logged_out(self) -> E2eResult<HomePage<'a, D>> {
        let Tab { driver, timeouts } = self.tab;
        driver.go_back().await?;
        driver
            .wait_for(&ui::welcome_user(), WaitState::Hidden, timeouts.action())
            .await?;
        driver
            .wait_for(&ui::logout_link(), WaitState::Hidden, timeouts.action())
            .await?;
        Ok(HomePage::new(Tab::new(driver, timeouts)))
    }

    pub fn into_tab(self) -> Tab<'a, D> {
        self.tab
    }
}
