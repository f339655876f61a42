//! Synchronous execution adapter.
//!
//! Bridges the asynchronous job subsystem to a single blocking call with a
//! bounded wait, for request/response callers (tool-style RPC) that expect
//! an answer or a "come back later" token. The adapter creates a job, then
//! polls its status at a fixed interval against an exact deadline; on
//! timeout it surfaces the job id so the caller can reattach through the
//! async polling path. The underlying job keeps running — timeout is not
//! cancellation.

use std::cmp;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use worldforge_core::{JobId, WorldId};

use crate::service::{JobService, JobServiceError};
use crate::types::{Job, JobStatus};

/// Default bounded wait for `execute_and_wait`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Fixed polling interval. Chosen over push notification because the
/// adapter's callers are external HTTP clients with no persistent
/// connection; the latency cost buys decoupling from the execution
/// mechanism's notification model.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Adapter error.
#[derive(Debug, thiserror::Error)]
pub enum SyncExecutionError {
    #[error("world id is required")]
    MissingWorldId,

    #[error("executor is required")]
    MissingExecutor,

    /// Registry miss, caught before any job is created.
    #[error("unknown executor: {0}")]
    UnknownExecutor(String),

    /// The bounded wait elapsed. Carries the job id so the caller can
    /// switch to async polling; never conflated with a job failure.
    #[error("timed out waiting for job {job_id}")]
    Timeout { job_id: JobId },

    /// The adapter only polls ids it just created itself, so a missing job
    /// is a hard inconsistency, not a "not yet visible" case.
    #[error("job {job_id} disappeared while polling")]
    JobVanished { job_id: JobId },

    #[error(transparent)]
    Service(#[from] JobServiceError),
}

/// Terminal outcome classification of a waited-on job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// Outcome of `execute_and_wait` for a job that reached a terminal status
/// within the bounded wait.
#[derive(Debug, Clone, Serialize)]
pub struct JobExecutionResult {
    pub job_id: JobId,
    pub status: ExecutionStatus,
    /// Stored result payload (success only).
    pub result: Option<String>,
    /// Stored error payload (failure only).
    pub error_message: Option<String>,
    /// `completed_at - started_at`, present only when both are set.
    pub duration_ms: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobExecutionResult {
    /// Classify a terminal job. Panics are avoided by construction: callers
    /// only build this from jobs already observed terminal.
    fn from_terminal(job: &Job) -> Self {
        let status = match job.status {
            JobStatus::Failed => ExecutionStatus::Failure,
            _ => ExecutionStatus::Success,
        };

        Self {
            job_id: job.id,
            status,
            result: job.result.clone(),
            error_message: job.error_message.clone(),
            duration_ms: job.duration().and_then(|d| d.num_milliseconds().try_into().ok()),
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Entry point for synchronous executions over a job service.
#[derive(Clone)]
pub struct SyncExecutor {
    jobs: Arc<JobService>,
}

impl SyncExecutor {
    pub fn new(jobs: Arc<JobService>) -> Self {
        Self { jobs }
    }

    /// Start configuring one execution.
    pub fn execution(&self) -> SyncExecutionBuilder {
        SyncExecutionBuilder {
            jobs: self.jobs.clone(),
            world_id: None,
            executor: None,
            layer: None,
            title: None,
            parameters: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Builder for a [`SyncExecution`].
///
/// Required fields (`world_id`, `executor`) and the registry lookup are
/// validated at `build()`, not scattered across setters. The HTTP boundary
/// enforces its own caller-facing timeout cap; this builder accepts any
/// value.
pub struct SyncExecutionBuilder {
    jobs: Arc<JobService>,
    world_id: Option<WorldId>,
    executor: Option<String>,
    layer: Option<String>,
    title: Option<String>,
    parameters: BTreeMap<String, String>,
    timeout: Duration,
}

impl SyncExecutionBuilder {
    pub fn world_id(mut self, world_id: WorldId) -> Self {
        self.world_id = Some(world_id);
        self
    }

    pub fn executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameters<I>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.parameters.extend(parameters);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SyncExecution, SyncExecutionError> {
        let world_id = self.world_id.ok_or(SyncExecutionError::MissingWorldId)?;
        let executor = self.executor.ok_or(SyncExecutionError::MissingExecutor)?;

        // Fail fast before any job record exists.
        if !self.jobs.has_executor(&executor) {
            return Err(SyncExecutionError::UnknownExecutor(executor));
        }

        let title = self.title.unwrap_or_else(|| executor.clone());

        Ok(SyncExecution {
            jobs: self.jobs,
            world_id,
            executor,
            layer: self.layer,
            title,
            parameters: self.parameters,
            timeout: self.timeout,
        })
    }
}

/// A validated, ready-to-run execution.
pub struct SyncExecution {
    jobs: Arc<JobService>,
    world_id: WorldId,
    executor: String,
    layer: Option<String>,
    title: String,
    parameters: BTreeMap<String, String>,
    timeout: Duration,
}

impl std::fmt::Debug for SyncExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncExecution")
            .field("world_id", &self.world_id)
            .field("executor", &self.executor)
            .field("layer", &self.layer)
            .field("title", &self.title)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SyncExecution {
    /// Create the job and return immediately; the caller polls the status
    /// endpoint itself.
    pub fn execute_async(&self) -> Result<JobId, SyncExecutionError> {
        Ok(self.create()?.id)
    }

    /// Create the job, then poll until it reaches a terminal status or the
    /// configured timeout elapses.
    pub async fn execute_and_wait(&self) -> Result<JobExecutionResult, SyncExecutionError> {
        let job = self.create()?;
        let job_id = job.id;
        let deadline = tokio::time::Instant::now() + self.timeout;

        debug!(job_id = %job_id, executor = %self.executor, timeout = ?self.timeout, "waiting for job");

        loop {
            match self.jobs.get_job(job_id)? {
                None => return Err(SyncExecutionError::JobVanished { job_id }),
                Some(job) if job.status.is_terminal() => {
                    return Ok(JobExecutionResult::from_terminal(&job));
                }
                Some(_) => {}
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(SyncExecutionError::Timeout { job_id });
            }

            // Never sleep past the deadline: the final poll happens exactly
            // at it, keeping the check free of cumulative drift.
            tokio::time::sleep_until(cmp::min(now + POLL_INTERVAL, deadline)).await;
        }
    }

    fn create(&self) -> Result<Job, SyncExecutionError> {
        Ok(self.jobs.create_job(
            self.world_id,
            &self.executor,
            &self.title,
            self.layer.clone(),
            self.parameters.clone(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{
        ExecutorOutput, ExecutorRegistry, JobExecutionError, JobExecutor,
    };
    use crate::store::{InMemoryJobStore, JobStore, JobStoreError, JobStats};
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl JobExecutor for NoopExecutor {
        fn executor_name(&self) -> &str {
            "generateTerrain"
        }

        async fn execute(&self, _job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
            Ok(ExecutorOutput::new())
        }
    }

    fn test_registry() -> Arc<ExecutorRegistry> {
        Arc::new(
            ExecutorRegistry::builder()
                .register(Arc::new(NoopExecutor))
                .build()
                .unwrap(),
        )
    }

    fn test_service() -> Arc<JobService> {
        Arc::new(JobService::new(
            Arc::new(InMemoryJobStore::new()),
            test_registry(),
        ))
    }

    #[test]
    fn build_requires_world_and_executor() {
        let sync = SyncExecutor::new(test_service());

        let err = sync.execution().executor("generateTerrain").build().unwrap_err();
        assert!(matches!(err, SyncExecutionError::MissingWorldId));

        let err = sync.execution().world_id(WorldId::new()).build().unwrap_err();
        assert!(matches!(err, SyncExecutionError::MissingExecutor));
    }

    #[test]
    fn unknown_executor_fails_at_build_with_no_job() {
        let service = test_service();
        let sync = SyncExecutor::new(service.clone());

        let err = sync
            .execution()
            .world_id(WorldId::new())
            .executor("unknown-tool")
            .build()
            .unwrap_err();

        assert!(matches!(err, SyncExecutionError::UnknownExecutor(name) if name == "unknown-tool"));

        let stats = service.stats().unwrap();
        assert_eq!(
            stats.pending + stats.running + stats.completed + stats.failed,
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_success_with_stored_result_and_duration() {
        let service = test_service();
        let sync = SyncExecutor::new(service.clone());

        let execution = sync
            .execution()
            .world_id(WorldId::new())
            .executor("generateTerrain")
            .parameter("size", "128")
            .build()
            .unwrap();

        // Complete the job as soon as it shows up, like the external
        // mechanism would on its own schedule.
        let completer = {
            let service = service.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(job) = service.claim_next().unwrap() {
                        let mut data = BTreeMap::new();
                        data.insert("seed".to_string(), "1234".to_string());
                        service.complete_job(job.id, data).unwrap();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            })
        };

        let result = execution.execute_and_wait().await.unwrap();
        completer.await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);

        let stored = service.get_job(result.job_id).unwrap().unwrap();
        assert_eq!(result.result, stored.result);
        assert_eq!(
            result.duration_ms,
            stored.duration().and_then(|d| d.num_milliseconds().try_into().ok())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_surfaces_failure_with_error_message() {
        let service = test_service();
        let sync = SyncExecutor::new(service.clone());

        let execution = sync
            .execution()
            .world_id(WorldId::new())
            .executor("generateTerrain")
            .build()
            .unwrap();

        let failer = {
            let service = service.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(job) = service.claim_next().unwrap() {
                        service.fail_job(job.id, "ran out of voxels").unwrap();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            })
        };

        let result = execution.execute_and_wait().await.unwrap();
        failer.await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Failure);
        assert_eq!(result.error_message.as_deref(), Some("ran out of voxels"));
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_with_the_created_job_id() {
        let service = test_service();
        let sync = SyncExecutor::new(service.clone());

        let execution = sync
            .execution()
            .world_id(WorldId::new())
            .executor("generateTerrain")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        // Nothing ever executes the job.
        let err = execution.execute_and_wait().await.unwrap_err();

        let SyncExecutionError::Timeout { job_id } = err else {
            panic!("expected timeout, got {err:?}");
        };

        // The id belongs to the job this very call created, still pending.
        let job = service.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    /// Store whose reads never see any job: simulates the inconsistency the
    /// adapter treats as unrecoverable.
    struct VanishingStore {
        inner: InMemoryJobStore,
    }

    impl JobStore for VanishingStore {
        fn insert(&self, job: Job) -> Result<worldforge_core::JobId, JobStoreError> {
            self.inner.insert(job)
        }

        fn get(&self, _job_id: worldforge_core::JobId) -> Result<Option<Job>, JobStoreError> {
            Ok(None)
        }

        fn update(&self, job: &Job) -> Result<(), JobStoreError> {
            self.inner.update(job)
        }

        fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
            self.inner.claim_next()
        }

        fn list_by_world(
            &self,
            world_id: WorldId,
            limit: usize,
        ) -> Result<Vec<Job>, JobStoreError> {
            self.inner.list_by_world(world_id, limit)
        }

        fn stats(&self) -> Result<JobStats, JobStoreError> {
            self.inner.stats()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_job_is_a_hard_error() {
        let service = Arc::new(JobService::new(
            Arc::new(VanishingStore {
                inner: InMemoryJobStore::new(),
            }),
            test_registry(),
        ));
        let sync = SyncExecutor::new(service);

        let execution = sync
            .execution()
            .world_id(WorldId::new())
            .executor("generateTerrain")
            .build()
            .unwrap();

        let err = execution.execute_and_wait().await.unwrap_err();
        assert!(matches!(err, SyncExecutionError::JobVanished { .. }));
    }
}
