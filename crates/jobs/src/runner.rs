//! In-process job runner.
//!
//! The orchestration core treats the execution mechanism as external; this
//! runner is the in-process implementation shipped so the system runs
//! end-to-end on one node. It polls the service for claimable jobs, invokes
//! the registered executor, and reports the outcome back through the
//! service's transition methods. At-most-once per job id follows from the
//! claim transition happening inside the store's write lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::service::JobService;
use crate::types::Job;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// How often to poll for claimable jobs.
    pub poll_interval: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "job-runner".to_string(),
        }
    }
}

impl JobRunnerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Handle to control a running runner.
#[derive(Debug)]
pub struct JobRunnerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl JobRunnerHandle {
    /// Request graceful shutdown and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Claim-based job runner.
pub struct JobRunner {
    service: Arc<JobService>,
    config: JobRunnerConfig,
}

impl JobRunner {
    pub fn new(service: Arc<JobService>) -> Self {
        Self::with_config(service, JobRunnerConfig::default())
    }

    pub fn with_config(service: Arc<JobService>, config: JobRunnerConfig) -> Self {
        Self { service, config }
    }

    /// Spawn the runner loop on the current tokio runtime.
    pub fn spawn(self) -> JobRunnerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(runner_loop(self.service, self.config, shutdown_rx));

        JobRunnerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

async fn runner_loop(
    service: Arc<JobService>,
    config: JobRunnerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(runner = %config.name, "job runner started");

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                drain_pending(&service, &config).await;
            }
        }
    }

    info!(runner = %config.name, "job runner stopped");
}

/// Claim and execute until nothing is pending.
async fn drain_pending(service: &Arc<JobService>, config: &JobRunnerConfig) {
    loop {
        match service.claim_next() {
            Ok(Some(job)) => execute_claimed(service, config, job).await,
            Ok(None) => break,
            Err(e) => {
                error!(runner = %config.name, error = %e, "failed to claim job");
                break;
            }
        }
    }
}

async fn execute_claimed(service: &Arc<JobService>, config: &JobRunnerConfig, job: Job) {
    let job_id = job.id;

    let Some(executor) = service.registry().get(&job.executor_name) else {
        // Registration is validated at creation; losing an executor
        // afterwards is a wiring defect, surfaced as a job failure.
        let _ = service.fail_job(job_id, "executor no longer registered");
        return;
    };

    debug!(
        runner = %config.name,
        job_id = %job_id,
        executor = %job.executor_name,
        "executing job"
    );

    let outcome = executor.execute(&job).await;

    let report = match outcome {
        Ok(output) => service.complete_job(job_id, output.into_data()),
        Err(e) => service.fail_job(job_id, e.message),
    };

    if let Err(e) = report {
        error!(
            runner = %config.name,
            job_id = %job_id,
            error = %e,
            "failed to record job outcome"
        );
    }
}
