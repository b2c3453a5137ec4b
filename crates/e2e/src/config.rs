//! Suite configuration
//!
//! Resolved once at startup: defaults, then an optional YAML file, then the
//! environment (a `.env` file is honoured). The bearer token only ever comes
//! from `API_TOKEN`; a missing token is fatal before any scenario runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{BrowserKind, DriverConfig};

pub const API_TOKEN_VAR: &str = "API_TOKEN";
pub const UI_BASE_URL_VAR: &str = "STORECHECK_UI_BASE_URL";
pub const API_BASE_URL_VAR: &str = "STORECHECK_API_BASE_URL";

/// Bearer token for the user resource. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> E2eResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(E2eError::Config(format!("Env {API_TOKEN_VAR} is not set")));
        }
        Ok(Self(token))
    }

    /// Read the token from `API_TOKEN`.
    pub fn from_env() -> E2eResult<Self> {
        let token = std::env::var(API_TOKEN_VAR)
            .map_err(|_| E2eError::Config(format!("Env {API_TOKEN_VAR} is not set")))?;
        Self::new(token)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Bounds for every suspension point. Nothing waits longer than these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Page loads and `goto`
    pub navigation_ms: u64,

    /// Waiting for an element before clicking or filling it
    pub action_ms: u64,

    /// Auto-waiting expectations (text, counts)
    pub assertion_ms: u64,

    /// Waiting for a native dialog to appear
    pub dialog_ms: u64,

    /// Pause after removing a cart line so the total re-renders
    pub settle_ms: u64,

    /// Whole HTTP request/response exchange
    pub http_ms: u64,

    /// Upper bound for one scenario step
    pub step_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            action_ms: 5_000,
            assertion_ms: 20_000,
            dialog_ms: 5_000,
            settle_ms: 1_000,
            http_ms: 30_000,
            step_ms: 90_000,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }

    pub fn dialog(&self) -> Duration {
        Duration::from_millis(self.dialog_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn http(&self) -> Duration {
        Duration::from_millis(self.http_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Tight bounds for in-memory fakes.
    pub fn fast() -> Self {
        Self {
            navigation_ms: 500,
            action_ms: 200,
            assertion_ms: 200,
            dialog_ms: 200,
            settle_ms: 0,
            http_ms: 5_000,
            step_ms: 10_000,
        }
    }
}

/// Complete suite configuration
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Storefront origin, e.g. `https://www.demoblaze.com`
    pub ui_base_url: String,

    /// User resource base, e.g. `https://gorest.co.in/public/v2/`
    pub api_base_url: String,

    /// Bearer token for the user resource
    pub api_token: ApiToken,

    /// Browser engine driven by Playwright
    pub browser: BrowserKind,

    /// Run without a visible window
    pub headless: bool,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Scenario groups executing at once
    pub workers: usize,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,

    /// strftime pattern of the date printed on order confirmations
    pub confirmation_date_format: String,

    pub timeouts: Timeouts,
}

/// Optional YAML overlay. Every key may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub ui_base_url: Option<String>,
    pub api_base_url: Option<String>,
    pub browser: Option<BrowserKind>,
    pub headless: Option<bool>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    pub workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub confirmation_date_format: Option<String>,
    pub timeouts: Option<Timeouts>,
}

impl ConfigFile {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

pub const DEFAULT_UI_BASE_URL: &str = "https://www.demoblaze.com";
pub const DEFAULT_API_BASE_URL: &str = "https://gorest.co.in/public/v2/";
pub const DEFAULT_DATE_FORMAT: &str = "%-d/%-m/%Y";

impl SuiteConfig {
    /// Defaults around an already-known token.
    pub fn with_token(api_token: ApiToken) -> Self {
        Self {
            ui_base_url: DEFAULT_UI_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token,
            browser: BrowserKind::default(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            workers: 2,
            output_dir: PathBuf::from("test-results"),
            confirmation_date_format: DEFAULT_DATE_FORMAT.to_string(),
            timeouts: Timeouts::default(),
        }
    }

    /// Resolve from an optional YAML file and the process environment.
    pub fn load(file: Option<&Path>) -> E2eResult<Self> {
        let _ = dotenvy::dotenv();

        let api_token = ApiToken::from_env()?;
        let mut config = Self::with_token(api_token);

        if let Some(path) = file {
            config.apply_file(ConfigFile::from_file(path)?);
        }

        if let Ok(url) = std::env::var(UI_BASE_URL_VAR) {
            config.ui_base_url = url;
        }
        if let Ok(url) = std::env::var(API_BASE_URL_VAR) {
            config.api_base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.ui_base_url {
            self.ui_base_url = v;
        }
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.browser {
            self.browser = v;
        }
        if let Some(v) = file.headless {
            self.headless = v;
        }
        if let Some(v) = file.viewport_width {
            self.viewport_width = v;
        }
        if let Some(v) = file.viewport_height {
            self.viewport_height = v;
        }
        if let Some(v) = file.workers {
            self.workers = v;
        }
        if let Some(v) = file.output_dir {
            self.output_dir = v;
        }
        if let Some(v) = file.confirmation_date_format {
            self.confirmation_date_format = v;
        }
        if let Some(v) = file.timeouts {
            self.timeouts = v;
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".into()));
        }
        for (key, url) in [("ui_base_url", &self.ui_base_url), ("api_base_url", &self.api_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(E2eError::Config(format!("{key} must be an http(s) URL, got '{url}'")));
            }
        }
        Ok(())
    }

    /// Settings for one browser driver process.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            base_url: self.ui_base_url.clone(),
            browser: self.browser,
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            navigation_timeout: self.timeouts.navigation(),
            ..DriverConfig::default()
        }
    }
}
