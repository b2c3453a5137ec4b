//! Scenario orchestration
//!
//! A [`ScenarioGroup`] is an ordered list of steps sharing one
//! [`ScenarioContext`]. Each step reads the context, returns a
//! [`ContextPatch`], and only successful patches are applied. A step whose
//! declared inputs were never produced fails with `MissingContext` instead of
//! running, and the first failure skips the rest of the group.
//!
//! Groups share nothing: each gets a fresh context and its own resource (HTTP
//! client or browser) from a factory, so independent groups run concurrently.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// A value one step produces for a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKey {
    UserId,
    Email,
    Session,
    CartTotal,
}

impl ContextKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKey::UserId => "user_id",
            ContextKey::Email => "email",
            ContextKey::Session => "session",
            ContextKey::CartTotal => "cart_total",
        }
    }
}

/// State threaded through the steps of one group.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    step: String,
    user_id: Option<u64>,
    email: Option<String>,
    session: Option<Session>,
    cart_total: Option<String>,
}

impl ScenarioContext {
    pub fn has(&self, key: ContextKey) -> bool {
        match key {
            ContextKey::UserId => self.user_id.is_some(),
            ContextKey::Email => self.email.is_some(),
            ContextKey::Session => self.session.is_some(),
            ContextKey::CartTotal => self.cart_total.is_some(),
        }
    }

    fn missing(&self, key: ContextKey) -> E2eError {
        E2eError::MissingContext {
            step: self.step.clone(),
            key: key.as_str().to_string(),
        }
    }

    /// Id of the last created user.
    pub fn user_id(&self) -> E2eResult<u64> {
        self.user_id.ok_or_else(|| self.missing(ContextKey::UserId))
    }

    pub fn email(&self) -> E2eResult<&str> {
        self.email.as_deref().ok_or_else(|| self.missing(ContextKey::Email))
    }

    pub fn session(&self) -> E2eResult<&Session> {
        self.session.as_ref().ok_or_else(|| self.missing(ContextKey::Session))
    }

    pub fn cart_total(&self) -> E2eResult<&str> {
        self.cart_total.as_deref().ok_or_else(|| self.missing(ContextKey::CartTotal))
    }

    pub fn apply(&mut self, patch: ContextPatch) {
        if let Some(id) = patch.user_id {
            self.user_id = Some(id);
        }
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(session) = patch.session {
            self.session = Some(session);
        }
        if let Some(total) = patch.cart_total {
            self.cart_total = Some(total);
        }
    }
}

/// Values a step hands to the steps after it.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    user_id: Option<u64>,
    email: Option<String>,
    session: Option<Session>,
    cart_total: Option<String>,
}

impl ContextPatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, id: u64) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn cart_total(mut self, total: impl Into<String>) -> Self {
        self.cart_total = Some(total.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.email.is_none() && self.session.is_none() && self.cart_total.is_none()
    }
}

pub type StepFuture<'a> = BoxFuture<'a, E2eResult<ContextPatch>>;

type StepFn<R> = Box<dyn for<'a> Fn(&'a mut R, &'a ScenarioContext) -> StepFuture<'a> + Send + Sync>;

/// One named action against a resource `R`.
pub struct Step<R> {
    name: String,
    requires: Vec<ContextKey>,
    run: StepFn<R>,
}

impl<R> Step<R> {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut R, &'a ScenarioContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            requires: Vec::new(),
            run: Box::new(run),
        }
    }

    /// Refuse to run unless an earlier step produced `key`.
    pub fn requires(mut self, key: ContextKey) -> Self {
        self.requires.push(key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered steps verifying one journey.
pub struct ScenarioGroup<R> {
    pub name: String,
    pub tags: Vec<String>,
    steps: Vec<Step<R>>,
    seed: ContextPatch,
}

impl<R> ScenarioGroup<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            steps: Vec::new(),
            seed: ContextPatch::none(),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn step(mut self, step: Step<R>) -> Self {
        self.steps.push(step);
        self
    }

    /// Start the context from a setup phase's output.
    pub fn seeded(mut self, patch: ContextPatch) -> Self {
        self.seed = patch;
        self
    }

    pub fn steps(&self) -> &[Step<R>] {
        &self.steps
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Report every step as skipped for `reason`.
    pub fn skipped(&self, reason: &str) -> ScenarioReport {
        ScenarioReport {
            name: self.name.clone(),
            tags: self.tags.clone(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
            steps: self
                .steps
                .iter()
                .map(|s| StepReport::skipped(&s.name, reason))
                .collect(),
            error: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepReport {
    fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
            error: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub tags: Vec<String>,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    /// The originating failure, or why the group was skipped
    pub error: Option<String>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    fn aborted(name: String, tags: Vec<String>, error: String) -> Self {
        Self {
            name,
            tags,
            outcome: Outcome::Failed,
            duration_ms: 0,
            steps: Vec::new(),
            error: Some(error),
        }
    }
}

/// Runs groups: steps in order within a group, groups side by side.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator {
    step_timeout: Duration,
}

impl Orchestrator {
    pub fn new(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }

    /// Run every step of `group` against `resource` and return the report
    /// together with the final context.
    pub async fn run_group<R>(&self, group: &ScenarioGroup<R>, resource: &mut R) -> (ScenarioReport, ScenarioContext) {
        let start = Instant::now();
        let mut ctx = ScenarioContext::default();
        ctx.apply(group.seed.clone());

        info!(scenario = %group.name, steps = group.steps.len(), "scenario started");

        let mut reports = Vec::with_capacity(group.steps.len());
        let mut failure: Option<String> = None;

        for step in &group.steps {
            if let Some(origin) = &failure {
                reports.push(StepReport::skipped(&step.name, &format!("skipped after failure: {origin}")));
                continue;
            }

            ctx.step = step.name.clone();
            let step_start = Instant::now();
            debug!(scenario = %group.name, step = %step.name, "step started");

            let result = match step.requires.iter().find(|key| !ctx.has(**key)) {
                Some(key) => Err(ctx.missing(*key)),
                None => match tokio::time::timeout(self.step_timeout, (step.run)(resource, &ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(E2eError::timeout(format!("step '{}'", step.name), self.step_timeout)),
                },
            };

            let duration_ms = step_start.elapsed().as_millis() as u64;
            match result {
                Ok(patch) => {
                    ctx.apply(patch);
                    info!(scenario = %group.name, step = %step.name, duration_ms, "step passed");
                    reports.push(StepReport {
                        name: step.name.clone(),
                        outcome: Outcome::Passed,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    error!(scenario = %group.name, step = %step.name, error = %e, "step failed");
                    failure = Some(format!("{}: {}", step.name, e));
                    reports.push(StepReport {
                        name: step.name.clone(),
                        outcome: Outcome::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let outcome = if failure.is_some() { Outcome::Failed } else { Outcome::Passed };
        info!(scenario = %group.name, ?outcome, duration_ms, "scenario finished");

        let report = ScenarioReport {
            name: group.name.clone(),
            tags: group.tags.clone(),
            outcome,
            duration_ms,
            steps: reports,
            error: failure,
        };
        (report, ctx)
    }

    /// Run `groups` on at most `workers` concurrent workers, each with a
    /// fresh resource from `factory`. Reports come back in input order.
    pub async fn run_concurrently<R, F, Fut>(
        &self,
        groups: Vec<ScenarioGroup<R>>,
        factory: F,
        workers: usize,
    ) -> Vec<ScenarioReport>
    where
        R: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<R>> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(workers.max(1)));
        let factory = Arc::new(factory);
        let mut tasks = JoinSet::new();
        let names: Vec<(String, Vec<String>)> = groups.iter().map(|g| (g.name.clone(), g.tags.clone())).collect();

        for (index, group) in groups.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let factory = Arc::clone(&factory);
            let orchestrator = *self;

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (index, ScenarioReport::aborted(group.name.clone(), group.tags.clone(), e.to_string()))
                    }
                };
                let report = match (*factory)().await {
                    Ok(mut resource) => orchestrator.run_group(&group, &mut resource).await.0,
                    Err(e) => {
                        warn!(scenario = %group.name, error = %e, "worker setup failed");
                        let mut report = group.skipped(&format!("worker setup failed: {e}"));
                        report.outcome = Outcome::Failed;
                        report
                    }
                };
                (index, report)
            });
        }

        let mut reports: Vec<Option<ScenarioReport>> = vec![None; names.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => error!(error = %e, "scenario task panicked"),
            }
        }

        reports
            .into_iter()
            .zip(names)
            .map(|(report, (name, tags))| {
                report.unwrap_or_else(|| ScenarioReport::aborted(name, tags, "scenario task did not complete".into()))
            })
            .collect()
    }
}
