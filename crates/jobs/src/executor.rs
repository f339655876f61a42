//! Executor contract and the name-keyed executor registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Job;

/// Reserved result key: the single most relevant scalar of a job's result.
///
/// Executors set it (directly or via [`ExecutorOutput::primary`]) so that a
/// downstream consumer can extract "the" output of a step without knowing
/// the full shape of the result mapping.
pub const PREVIOUS_JOB_RESULT: &str = "PREVIOUS_JOB_RESULT";

/// Error raised inside an executor. Carries a human-readable message that
/// ends up as the job's `error_message`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct JobExecutionError {
    pub message: String,
}

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result data produced by a successful execution: a flat string-to-string
/// mapping, deliberately schema-free (heterogeneous executors integrate
/// through it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOutput {
    data: BTreeMap<String, String>,
}

impl ExecutorOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output whose primary scalar is `value` (stored under
    /// [`PREVIOUS_JOB_RESULT`]).
    pub fn primary(value: impl Into<String>) -> Self {
        Self::new().with(PREVIOUS_JOB_RESULT, value)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn into_data(self) -> BTreeMap<String, String> {
        self.data
    }
}

impl From<BTreeMap<String, String>> for ExecutorOutput {
    fn from(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }
}

/// A named capability that consumes a job's parameters and produces a result
/// or a failure.
///
/// Executors can assume at-most-once dispatch per job id (the claim
/// transition happens inside the store's write lock); this core does not
/// retry failed jobs.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Stable executor name; jobs are routed by it.
    fn executor_name(&self) -> &str;

    /// Process one job.
    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError>;
}

/// Registry build error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorRegistryError {
    #[error("duplicate executor name: {0}")]
    DuplicateName(String),
}

/// Name-keyed lookup of available executors.
///
/// Populated once at system start via [`ExecutorRegistry::builder`];
/// read-only at runtime. Callers use [`ExecutorRegistry::has_executor`] to
/// fail fast before any job record is created.
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn JobExecutor>>,
}

impl ExecutorRegistry {
    pub fn builder() -> ExecutorRegistryBuilder {
        ExecutorRegistryBuilder {
            executors: Vec::new(),
        }
    }

    pub fn has_executor(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(name).cloned()
    }

    /// Registered executor names, sorted for stable presentation.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}

/// Builder for [`ExecutorRegistry`]. Duplicate names are rejected at
/// `build()`, not silently overwritten.
pub struct ExecutorRegistryBuilder {
    executors: Vec<Arc<dyn JobExecutor>>,
}

impl ExecutorRegistryBuilder {
    pub fn register(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.executors.push(executor);
        self
    }

    pub fn build(self) -> Result<ExecutorRegistry, ExecutorRegistryError> {
        let mut executors: HashMap<String, Arc<dyn JobExecutor>> = HashMap::new();
        for executor in self.executors {
            let name = executor.executor_name().to_string();
            if executors.contains_key(&name) {
                return Err(ExecutorRegistryError::DuplicateName(name));
            }
            executors.insert(name, executor);
        }
        Ok(ExecutorRegistry { executors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoExecutor {
        name: &'static str,
    }

    #[async_trait]
    impl JobExecutor for EchoExecutor {
        fn executor_name(&self) -> &str {
            self.name
        }

        async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
            Ok(ExecutorOutput::primary(job.title.clone()))
        }
    }

    #[test]
    fn registry_lookup_by_name() {
        let registry = ExecutorRegistry::builder()
            .register(Arc::new(EchoExecutor { name: "echo" }))
            .build()
            .unwrap();

        assert!(registry.has_executor("echo"));
        assert!(!registry.has_executor("missing"));
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.names(), vec!["echo".to_string()]);
    }

    #[test]
    fn duplicate_names_rejected_at_build() {
        let result = ExecutorRegistry::builder()
            .register(Arc::new(EchoExecutor { name: "echo" }))
            .register(Arc::new(EchoExecutor { name: "echo" }))
            .build();

        assert_eq!(
            result.err(),
            Some(ExecutorRegistryError::DuplicateName("echo".to_string()))
        );
    }

    #[test]
    fn primary_output_uses_reserved_key() {
        let output = ExecutorOutput::primary("model-1");
        assert_eq!(
            output.data().get(PREVIOUS_JOB_RESULT).map(String::as_str),
            Some("model-1")
        );
    }
}
