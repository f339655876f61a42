//! Job lifecycle service: creation, lookup, and state transitions.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use worldforge_core::{JobId, WorldId};

use crate::executor::ExecutorRegistry;
use crate::store::{JobStats, JobStore, JobStoreError};
use crate::types::{Job, JobStatus};

/// Observer of terminal job transitions.
///
/// Listeners are notified synchronously after the terminal state has been
/// persisted; the workflow engine registers itself here to drive completion
/// handler dispatch.
pub trait JobCompletionListener: Send + Sync {
    fn on_job_terminal(&self, job: &Job);
}

/// Job service error.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    /// The executor name is not present in the registry. Raised before any
    /// job record is persisted.
    #[error("unknown executor: {0}")]
    UnknownExecutor(String),

    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Attempted transition out of a terminal status.
    #[error("invalid transition for job {id}: {status:?} is terminal")]
    AlreadyTerminal { id: JobId, status: JobStatus },

    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),

    #[error("result serialization error: {0}")]
    Serialization(String),
}

/// Owns job persistence and the job state machine.
///
/// `create_job` and `get_job` are the submission/status boundaries consumed
/// by workflows, the synchronous adapter, and the HTTP layer. The transition
/// methods (`claim_next`, `complete_job`, `fail_job`) are the callback
/// surface for the execution mechanism.
pub struct JobService {
    store: Arc<dyn JobStore>,
    registry: Arc<ExecutorRegistry>,
    listeners: RwLock<Vec<Arc<dyn JobCompletionListener>>>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            store,
            registry,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    pub fn has_executor(&self, name: &str) -> bool {
        self.registry.has_executor(name)
    }

    /// Register a terminal-transition listener.
    pub fn add_listener(&self, listener: Arc<dyn JobCompletionListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    /// Create a job in `Pending` state and return it immediately.
    ///
    /// Validates the executor name against the registry first; on an unknown
    /// name nothing is persisted. This call never blocks on execution.
    pub fn create_job(
        &self,
        world_id: WorldId,
        executor_name: &str,
        title: &str,
        layer: Option<String>,
        parameters: BTreeMap<String, String>,
    ) -> Result<Job, JobServiceError> {
        if !self.registry.has_executor(executor_name) {
            return Err(JobServiceError::UnknownExecutor(executor_name.to_string()));
        }

        let job = Job::new(world_id, executor_name, title, layer, parameters);
        self.store.insert(job.clone())?;

        info!(
            job_id = %job.id,
            world_id = %world_id,
            executor = %executor_name,
            "job created"
        );

        Ok(job)
    }

    /// Read-only lookup; absence is a normal, expected outcome.
    pub fn get_job(&self, job_id: JobId) -> Result<Option<Job>, JobServiceError> {
        Ok(self.store.get(job_id)?)
    }

    /// List a world's jobs, oldest first.
    pub fn list_jobs(&self, world_id: WorldId, limit: usize) -> Result<Vec<Job>, JobServiceError> {
        Ok(self.store.list_by_world(world_id, limit)?)
    }

    /// Counts per status across all worlds.
    pub fn stats(&self) -> Result<JobStats, JobServiceError> {
        Ok(self.store.stats()?)
    }

    /// Claim the next pending job for execution (`Pending → Running`).
    pub fn claim_next(&self) -> Result<Option<Job>, JobServiceError> {
        let claimed = self.store.claim_next()?;
        if let Some(ref job) = claimed {
            debug!(job_id = %job.id, executor = %job.executor_name, "job claimed");
        }
        Ok(claimed)
    }

    /// Record a successful execution (`→ Completed`) and notify listeners.
    ///
    /// The result mapping is stored on the job as a JSON object string.
    /// Accepts jobs still `Pending` (an external mechanism may never report
    /// the running transition); terminal jobs are immutable.
    pub fn complete_job(
        &self,
        job_id: JobId,
        result_data: BTreeMap<String, String>,
    ) -> Result<Job, JobServiceError> {
        let result = serde_json::to_string(&result_data)
            .map_err(|e| JobServiceError::Serialization(e.to_string()))?;

        let job = self.transition(job_id, |job| job.mark_completed(result))?;
        info!(job_id = %job.id, executor = %job.executor_name, "job completed");

        self.notify_terminal(&job);
        Ok(job)
    }

    /// Record a failed execution (`→ Failed`) and notify listeners.
    pub fn fail_job(
        &self,
        job_id: JobId,
        error_message: impl Into<String>,
    ) -> Result<Job, JobServiceError> {
        let error_message = error_message.into();
        let job = self.transition(job_id, move |job| job.mark_failed(error_message))?;
        warn!(
            job_id = %job.id,
            executor = %job.executor_name,
            error = %job.error_message.as_deref().unwrap_or_default(),
            "job failed"
        );

        self.notify_terminal(&job);
        Ok(job)
    }

    fn transition(
        &self,
        job_id: JobId,
        apply: impl FnOnce(&mut Job),
    ) -> Result<Job, JobServiceError> {
        let mut job = self
            .store
            .get(job_id)?
            .ok_or(JobServiceError::NotFound(job_id))?;

        if job.status.is_terminal() {
            return Err(JobServiceError::AlreadyTerminal {
                id: job_id,
                status: job.status,
            });
        }

        apply(&mut job);
        self.store.update(&job)?;
        Ok(job)
    }

    fn notify_terminal(&self, job: &Job) {
        // Snapshot the listener list so handlers can create jobs (and hence
        // re-enter this service) without holding the lock.
        let listeners: Vec<Arc<dyn JobCompletionListener>> =
            self.listeners.read().unwrap().clone();

        for listener in listeners {
            listener.on_job_terminal(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorOutput, JobExecutionError, JobExecutor};
    use crate::store::InMemoryJobStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoopExecutor {
        name: &'static str,
    }

    #[async_trait]
    impl JobExecutor for NoopExecutor {
        fn executor_name(&self) -> &str {
            self.name
        }

        async fn execute(&self, _job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
            Ok(ExecutorOutput::new())
        }
    }

    fn test_service() -> JobService {
        let registry = ExecutorRegistry::builder()
            .register(Arc::new(NoopExecutor {
                name: "generateTerrain",
            }))
            .build()
            .unwrap();

        JobService::new(Arc::new(InMemoryJobStore::new()), Arc::new(registry))
    }

    #[test]
    fn unknown_executor_fails_before_persisting() {
        let service = test_service();
        let err = service
            .create_job(WorldId::new(), "missing", "t", None, BTreeMap::new())
            .unwrap_err();

        assert!(matches!(err, JobServiceError::UnknownExecutor(name) if name == "missing"));

        let stats = service.store.stats().unwrap();
        assert_eq!(stats.pending + stats.running + stats.completed + stats.failed, 0);
    }

    #[test]
    fn create_then_complete() {
        let service = test_service();
        let job = service
            .create_job(WorldId::new(), "generateTerrain", "t", None, BTreeMap::new())
            .unwrap();

        service.claim_next().unwrap().unwrap();

        let mut result_data = BTreeMap::new();
        result_data.insert("chunks".to_string(), "16".to_string());
        let completed = service.complete_job(job.id, result_data).unwrap();

        assert_eq!(completed.status, JobStatus::Completed);
        assert_eq!(completed.result.as_deref(), Some(r#"{"chunks":"16"}"#));
        assert!(completed.timestamps_consistent());
    }

    #[test]
    fn terminal_jobs_are_immutable() {
        let service = test_service();
        let job = service
            .create_job(WorldId::new(), "generateTerrain", "t", None, BTreeMap::new())
            .unwrap();

        service.fail_job(job.id, "boom").unwrap();

        let err = service.complete_job(job.id, BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            JobServiceError::AlreadyTerminal {
                status: JobStatus::Failed,
                ..
            }
        ));
    }

    #[test]
    fn listeners_observe_terminal_transitions() {
        struct Recorder {
            seen: Mutex<Vec<(JobId, JobStatus)>>,
        }

        impl JobCompletionListener for Recorder {
            fn on_job_terminal(&self, job: &Job) {
                self.seen.lock().unwrap().push((job.id, job.status));
            }
        }

        let service = test_service();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        service.add_listener(recorder.clone());

        let job = service
            .create_job(WorldId::new(), "generateTerrain", "t", None, BTreeMap::new())
            .unwrap();
        service.complete_job(job.id, BTreeMap::new()).unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(job.id, JobStatus::Completed)]);
    }

    mod invariants {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Claim,
            Complete,
            Fail,
        }

        fn step_strategy() -> impl Strategy<Value = Vec<Step>> {
            prop::collection::vec(
                prop_oneof![
                    Just(Step::Claim),
                    Just(Step::Complete),
                    Just(Step::Fail),
                ],
                0..6,
            )
        }

        proptest! {
            /// Timestamp/status consistency holds after any transition
            /// sequence, valid or rejected.
            #[test]
            fn timestamps_follow_status(steps in step_strategy()) {
                let service = test_service();
                let job = service
                    .create_job(WorldId::new(), "generateTerrain", "t", None, BTreeMap::new())
                    .unwrap();

                for step in steps {
                    match step {
                        Step::Claim => {
                            let _ = service.claim_next();
                        }
                        Step::Complete => {
                            let _ = service.complete_job(job.id, BTreeMap::new());
                        }
                        Step::Fail => {
                            let _ = service.fail_job(job.id, "boom");
                        }
                    }

                    let current = service.get_job(job.id).unwrap().unwrap();
                    prop_assert!(current.timestamps_consistent());
                }
            }
        }
    }
}
