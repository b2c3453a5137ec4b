//! Storecheck E2E verification suite
//!
//! This crate verifies two public systems end to end:
//! - A storefront web UI, driven through Playwright over a JSON-lines bridge
//! - A user-management REST API, exercised over HTTP with bearer auth
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_api(UsersClient)          -> [ScenarioReport]    │
//! │    ├── run_storefront(driver factory) -> [ScenarioReport]   │
//! │    └── write_results(TestSuiteResult) -> test-results.json  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Orchestrator                                               │
//! │    ├── ScenarioGroup { steps: [Step], seed }                │
//! │    ├── ScenarioContext { user_id, email, session, total }   │
//! │    └── bounded workers, one resource per group              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Storefront                          │  UsersClient         │
//! │    ├── Tab -> Home -> Category       │    ├── create/read   │
//! │    │        -> Product -> Cart       │    ├── update/delete │
//! │    │        -> Checkout -> Confirm   │    └── list          │
//! │    ├── CheckoutSequencer             │  expected_violations │
//! │    └── SessionStore (cookies)        │                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver (trait)  <-  PlaywrightDriver (node bridge process) │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod sequencer;
pub mod session;
pub mod suites;
pub mod validation;

pub use api::UsersClient;
pub use config::SuiteConfig;
pub use driver::Driver;
pub use error::{E2eError, E2eResult};
pub use runner::{Filter, TestRunner, TestSuiteResult};
pub use scenario::{Orchestrator, Outcome, ScenarioGroup, ScenarioReport};
