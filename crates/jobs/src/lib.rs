//! Asynchronous job subsystem for world generation and maintenance tasks.
//!
//! ## Design
//!
//! - Jobs are world-scoped, named after the executor that must process them
//! - Executors are registered once at startup; the registry is read-only
//!   afterwards and consulted before any job record is created
//! - The job service owns persistence and the
//!   `PENDING → RUNNING → {COMPLETED | FAILED}` state machine; terminal
//!   states are immutable
//! - Execution is decoupled from submission: a claim-based runner drives
//!   executors and reports outcomes back through the service
//! - A synchronous adapter turns job creation + completion into one blocking
//!   call with a bounded wait and a timeout escape hatch
//!
//! ## Components
//!
//! - `Job`: the atomic, persisted unit of asynchronous work
//! - `JobExecutor` / `ExecutorRegistry`: the executor contract and its
//!   name-keyed lookup
//! - `JobStore`: persistence for jobs (in-memory shipped; the trait is the
//!   seam for durable backends)
//! - `JobService`: lifecycle transitions + terminal-state notification
//! - `JobRunner`: in-process execution mechanism
//! - `SyncExecutor`: the polling bridge for request/response callers

pub mod executor;
pub mod runner;
pub mod service;
pub mod store;
pub mod sync;
pub mod types;

pub use executor::{
    ExecutorOutput, ExecutorRegistry, ExecutorRegistryBuilder, ExecutorRegistryError,
    JobExecutionError, JobExecutor, PREVIOUS_JOB_RESULT,
};
pub use runner::{JobRunner, JobRunnerConfig, JobRunnerHandle};
pub use service::{JobCompletionListener, JobService, JobServiceError};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use sync::{
    ExecutionStatus, JobExecutionResult, SyncExecution, SyncExecutionBuilder, SyncExecutionError,
    SyncExecutor,
};
pub use types::{Job, JobStatus};
