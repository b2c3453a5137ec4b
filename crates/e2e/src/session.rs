//! Authenticated browsing sessions
//!
//! A [`Session`] is the cookie set captured by one login. It is produced once,
//! handed read-only to every scenario that needs an authenticated storefront,
//! and injected into a fresh browsing context with [`SessionStore::restore`].

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::Driver;
use crate::error::E2eResult;
use crate::pages::{HomePage, Tab};

/// Cookie record as the browser context reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; `-1` for a session cookie.
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: session_expiry(),
            http_only: false,
            secure: false,
        }
    }
}

/// Name of the cookie carrying the storefront's auth token.
pub const AUTH_COOKIE: &str = "tokenp_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    cookies: Vec<Cookie>,
}

impl Session {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn auth_cookie(&self) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == AUTH_COOKIE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Fresh `user<hex>` / `pass<hex>` pair sharing one random suffix.
    pub fn unique() -> Self {
        let suffix = random_hex(10);
        Self {
            username: format!("user{suffix}"),
            password: format!("pass{suffix}"),
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(len);
    hex
}

/// Login, restore and logout against the storefront UI.
pub struct SessionStore;

impl SessionStore {
    /// Log in and capture the resulting cookie set.
    pub async fn login<'a, D: Driver + ?Sized>(
        tab: Tab<'a, D>,
        credentials: &Credentials,
    ) -> E2eResult<(Session, HomePage<'a, D>)> {
        let (home, cookies) = tab.open_login().log_in(credentials).await?;
        info!(user = %credentials.username, cookies = cookies.len(), "session captured");
        Ok((Session::new(cookies), home))
    }

    /// Register `credentials`, then log in with them.
    pub async fn sign_up_and_login<'a, D: Driver + ?Sized>(
        tab: Tab<'a, D>,
        credentials: &Credentials,
    ) -> E2eResult<(Session, HomePage<'a, D>)> {
        let home = tab.open_login().sign_up(credentials).await?;
        Self::login(home.into_tab(), credentials).await
    }

    /// Inject `session` and reload so the page reflects it. Empty sessions
    /// leave the context untouched.
    pub async fn restore<'a, D: Driver + ?Sized>(tab: Tab<'a, D>, session: &Session) -> E2eResult<Tab<'a, D>> {
        if session.is_empty() {
            debug!("empty session, nothing to restore");
            return Ok(tab);
        }
        let Tab { driver, timeouts } = tab;
        driver.add_cookies(session.cookies()).await?;
        driver.reload().await?;
        debug!(cookies = session.cookies().len(), "session restored");
        Ok(Tab::new(driver, timeouts))
    }

    /// Log out of the UI. The cookies in any captured [`Session`] stay usable.
    pub async fn logout<'a, D: Driver + ?Sized>(tab: Tab<'a, D>) -> E2eResult<HomePage<'a, D>> {
        tab.open_login().log_out().await
    }
}
