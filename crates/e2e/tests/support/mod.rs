//! Shared fakes for the integration tests
#![allow(dead_code)]

pub mod fake_api;
pub mod fake_store;

use storecheck_e2e::config::{ApiToken, SuiteConfig, Timeouts};

/// Suite settings with tight bounds, pointed at the fakes.
pub fn fast_config(api_base_url: &str, output_dir: &std::path::Path) -> SuiteConfig {
    let mut config = SuiteConfig::with_token(ApiToken::new(fake_api::TOKEN).unwrap());
    config.api_base_url = api_base_url.to_string();
    config.ui_base_url = fake_store::ORIGIN.to_string();
    config.timeouts = Timeouts::fast();
    config.workers = 3;
    config.output_dir = output_dir.to_path_buf();
    config
}
