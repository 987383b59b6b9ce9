//! Sequential, fail-fast pipeline execution.
//!
//! Each step starts only after the previous one has fully completed,
//! including any settle delay it applies. The first failure stops the run.

use super::definition::Pipeline;
use super::step::PipelineStep;
use crate::error::{CliError, PipelineError, ReleaseError, Result};
use crate::release::ReleaseSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};

/// Performs the work of individual steps
pub trait StepExecutor {
    /// Run one step to completion. Side effects (settle delays included)
    /// must be finished when the returned future resolves.
    fn execute(
        &self,
        step: &PipelineStep,
        spec: &mut ReleaseSpec,
    ) -> impl Future<Output = Result<StepOutcome>>;
}

/// What a completed step reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Short human-readable summary
    pub detail: Option<String>,
}

impl StepOutcome {
    /// Completed with nothing to report
    pub fn done() -> Self {
        Self::default()
    }

    /// Completed with a summary
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }
}

/// Final state of a step in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Ran and succeeded
    Success,
    /// Condition was false
    Skipped,
}

/// One entry of a run report
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Step id
    pub id: String,
    /// What happened
    pub status: StepStatus,
    /// Summary from the executor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Wall-clock time spent
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Record of a successful pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Pipeline name
    pub pipeline: String,
    /// When the first step started
    pub started_at: DateTime<Utc>,
    /// When the last step finished
    pub finished_at: DateTime<Utc>,
    /// Steps in execution order
    pub steps: Vec<StepResult>,
}

impl PipelineReport {
    /// Steps that ran
    pub fn executed(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.status == StepStatus::Success)
    }

    /// Steps whose condition was false
    pub fn skipped(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.status == StepStatus::Skipped)
    }

    /// Total run time
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// Drives a pipeline through a [`StepExecutor`]
#[derive(Debug)]
pub struct PipelineRunner<E> {
    executor: E,
    spec: ReleaseSpec,
}

impl<E: StepExecutor> PipelineRunner<E> {
    /// Runner owning the [`ReleaseSpec`] for the duration of the run
    pub fn new(spec: ReleaseSpec, executor: E) -> Self {
        Self { executor, spec }
    }

    /// The executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Give back the release context and executor
    pub fn into_parts(self) -> (ReleaseSpec, E) {
        (self.spec, self.executor)
    }

    /// Run every step in order.
    ///
    /// A pipeline that stages or commits fails before its first step when no
    /// commit message was given.
    pub async fn run(&mut self, pipeline: &Pipeline) -> Result<PipelineReport> {
        if let Some(step) = pipeline.first_step_requiring_message()
            && self.spec.commit_message().is_none()
        {
            return Err(step_failed(
                step,
                CliError::MissingArgument {
                    argument: "-m/--message".to_string(),
                }
                .into(),
            ));
        }

        log::info!("Starting '{}' ({} steps)", pipeline.name(), pipeline.len());
        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(pipeline.len());

        for step in pipeline.steps() {
            if !step.is_enabled(&self.spec) {
                log::debug!("Skipping '{}'", step.id);
                steps.push(StepResult {
                    id: step.id.clone(),
                    status: StepStatus::Skipped,
                    detail: None,
                    duration: Duration::ZERO,
                });
                continue;
            }

            log::info!("Starting '{}': {}", step.id, step.operation);
            let start = Instant::now();
            let outcome = self
                .executor
                .execute(step, &mut self.spec)
                .await
                .map_err(|e| step_failed(step, e))?;
            let duration = start.elapsed();

            match &outcome.detail {
                Some(detail) => log::info!(
                    "Finished '{}' after {} ms ({})",
                    step.id,
                    duration.as_millis(),
                    detail
                ),
                None => log::info!("Finished '{}' after {} ms", step.id, duration.as_millis()),
            }
            steps.push(StepResult {
                id: step.id.clone(),
                status: StepStatus::Success,
                detail: outcome.detail,
                duration,
            });
        }

        Ok(PipelineReport {
            pipeline: pipeline.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            steps,
        })
    }
}

fn step_failed(step: &PipelineStep, source: ReleaseError) -> ReleaseError {
    log::error!("'{}' errored: {}", step.id, source);
    PipelineError::StepFailed {
        step: step.id.clone(),
        source: Box::new(source),
    }
    .into()
}
