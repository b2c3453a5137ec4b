//! Main test runner that builds the scenario groups, runs them on workers and
//! writes the results

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::api::UsersClient;
use crate::config::SuiteConfig;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::pages::Storefront;
use crate::playwright::PlaywrightDriver;
use crate::scenario::{ContextPatch, Orchestrator, Outcome, ScenarioGroup, ScenarioReport};
use crate::suites;

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioReport>,
}

impl TestSuiteResult {
    pub fn from_reports(results: Vec<ScenarioReport>, duration_ms: u64) -> Self {
        let count = |outcome| results.iter().filter(|r| r.outcome == outcome).count();
        Self {
            total: results.len(),
            passed: count(Outcome::Passed),
            failed: count(Outcome::Failed),
            skipped: count(Outcome::Skipped),
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which scenarios to run. Empty matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub tag: Option<String>,
    pub name: Option<String>,
}

impl Filter {
    pub fn matches<R>(&self, group: &ScenarioGroup<R>) -> bool {
        let tag_ok = self.tag.as_deref().map_or(true, |tag| group.has_tag(tag));
        let name_ok = self.name.as_deref().map_or(true, |name| group.name == name);
        tag_ok && name_ok
    }

    fn apply<R>(&self, groups: Vec<ScenarioGroup<R>>) -> Vec<ScenarioGroup<R>> {
        groups.into_iter().filter(|g| self.matches(g)).collect()
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: SuiteConfig,
    filter: Filter,
    orchestrator: Orchestrator,
}

impl TestRunner {
    pub fn new(config: SuiteConfig) -> Self {
        let orchestrator = Orchestrator::new(config.timeouts.step());
        Self {
            config,
            filter: Filter::default(),
            orchestrator,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run the selected user-API groups, each on its own clone of `client`.
    pub async fn run_api(&self, client: UsersClient) -> Vec<ScenarioReport> {
        let groups = self.filter.apply(suites::api_groups());
        if groups.is_empty() {
            return Vec::new();
        }
        info!("Running {} API scenario(s)...", groups.len());

        self.orchestrator
            .run_concurrently(
                groups,
                move || {
                    let client = client.clone();
                    async move { Ok::<_, E2eError>(client) }
                },
                self.config.workers,
            )
            .await
    }

    /// Run the selected storefront groups. Each group gets a fresh driver
    /// from `factory`. Session scenarios wait for the one-time login setup
    /// and are skipped when it fails.
    pub async fn run_storefront<D, F, Fut>(&self, factory: F) -> Vec<ScenarioReport>
    where
        D: Driver + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<D>> + Send + 'static,
    {
        let factory = Arc::new(factory);
        let timeouts = self.config.timeouts;
        let date_format = self.config.confirmation_date_format.clone();
        let make = move || {
            let factory = Arc::clone(&factory);
            let date_format = date_format.clone();
            async move {
                let driver = (*factory)().await?;
                Ok::<_, E2eError>(Storefront::new(driver, timeouts, date_format))
            }
        };

        let mut groups = self.filter.apply(suites::storefront_groups::<D>());
        let mut reports = Vec::new();

        let dependents = self.filter.apply(suites::session_groups::<D>(ContextPatch::none()));
        if !dependents.is_empty() {
            let setup = suites::login_setup::<D>();
            info!("Running {}...", setup.name);
            match make().await {
                Ok(mut store) => {
                    let (report, ctx) = self.orchestrator.run_group(&setup, &mut store).await;
                    match (report.passed(), ctx.session()) {
                        (true, Ok(session)) => {
                            let seed = ContextPatch::none().session(session.clone());
                            groups.extend(self.filter.apply(suites::session_groups::<D>(seed)));
                        }
                        _ => {
                            let reason = format!(
                                "{} failed: {}",
                                setup.name,
                                report.error.as_deref().unwrap_or("no session produced")
                            );
                            warn!("{}", reason);
                            reports.extend(dependents.iter().map(|g| g.skipped(&reason)));
                        }
                    }
                    reports.push(report);
                }
                Err(e) => {
                    let reason = format!("{} could not start a browser: {}", setup.name, e);
                    error!("{}", reason);
                    reports.extend(dependents.iter().map(|g| g.skipped(&reason)));
                }
            }
        }

        if !groups.is_empty() {
            info!("Running {} storefront scenario(s)...", groups.len());
            let ran = self.orchestrator.run_concurrently(groups, make, self.config.workers).await;
            reports.extend(ran);
        }
        reports
    }

    /// Run everything selected: the user API over HTTP and the storefront in
    /// Playwright browsers, side by side.
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let client = UsersClient::from_config(&self.config)?;
        let driver_config = self.config.driver_config();

        let (api, ui) = tokio::join!(
            self.run_api(client),
            self.run_storefront(move || PlaywrightDriver::launch(driver_config.clone()))
        );

        let mut results = api;
        results.extend(ui);
        let summary = TestSuiteResult::from_reports(results, start.elapsed().as_millis() as u64);

        for result in &summary.results {
            match result.outcome {
                Outcome::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                Outcome::Failed => error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                Outcome::Skipped => warn!("- {} skipped", result.name),
            }
        }
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );
        Ok(summary)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
