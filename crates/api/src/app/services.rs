//! Orchestration service wiring for the HTTP process.
//!
//! The executors registered here are thin stand-ins for the world-generation
//! subsystem: they honor the job contract (parameters in, result mapping or
//! failure out) without carrying the real generation logic, which lives
//! outside the orchestration core.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use worldforge_jobs::{
    ExecutorOutput, ExecutorRegistry, InMemoryJobStore, Job, JobExecutionError, JobExecutor,
    JobRunner, JobRunnerHandle, JobService, SyncExecutor,
};
use worldforge_workflow::{
    CompositeStructureWorkflow, InMemoryWorkflowStore, InMemoryWorldCatalog, WorkflowEngine,
    ASSEMBLE_COMPOSITE_STRUCTURE, CREATE_COMPOSITE_MODEL,
};

/// Everything route handlers need, plus the runner handle so the execution
/// loop lives exactly as long as the process.
pub struct AppServices {
    pub jobs: Arc<JobService>,
    pub engine: Arc<WorkflowEngine>,
    pub sync: SyncExecutor,
    pub catalog: Arc<InMemoryWorldCatalog>,
    _runner: JobRunnerHandle,
}

/// Produces a composite model and registers it in the world catalog.
struct CompositeModelGenerator {
    catalog: Arc<InMemoryWorldCatalog>,
}

#[async_trait]
impl JobExecutor for CompositeModelGenerator {
    fn executor_name(&self) -> &str {
        CREATE_COMPOSITE_MODEL
    }

    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
        let description = job
            .parameters
            .get("description")
            .ok_or_else(|| JobExecutionError::new("missing description parameter"))?;

        let model_id = job
            .parameters
            .get("modelId")
            .cloned()
            .unwrap_or_else(|| format!("model-{}", Uuid::now_v7()));

        self.catalog.add_model(job.world_id, model_id.clone());

        Ok(ExecutorOutput::primary(model_id)
            .with("description", description.clone()))
    }
}

/// Assembles a structure from a previously generated model.
struct StructureAssembler;

#[async_trait]
impl JobExecutor for StructureAssembler {
    fn executor_name(&self) -> &str {
        ASSEMBLE_COMPOSITE_STRUCTURE
    }

    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
        let model_id = job
            .parameters
            .get("modelId")
            .ok_or_else(|| JobExecutionError::new("missing modelId parameter"))?;

        Ok(ExecutorOutput::primary(format!("structure-from-{model_id}")))
    }
}

/// Long-running maintenance pass over a world (or one of its layers).
/// Duration is parameter-driven so dev environments can exercise the
/// timeout/poll paths of the tool-call boundary.
struct WorldMaintenanceExecutor;

#[async_trait]
impl JobExecutor for WorldMaintenanceExecutor {
    fn executor_name(&self) -> &str {
        "runWorldMaintenance"
    }

    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
        let duration_ms: u64 = match job.parameters.get("durationMs") {
            Some(raw) => raw
                .parse()
                .map_err(|_| JobExecutionError::new("durationMs must be an integer"))?,
            None => 0,
        };

        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        let scope = job.layer.as_deref().unwrap_or("world");
        Ok(ExecutorOutput::primary(format!("maintained-{scope}")))
    }
}

/// Wire the in-memory orchestration stack and spawn the runner.
pub fn build_services() -> AppServices {
    let catalog = Arc::new(InMemoryWorldCatalog::new());

    let registry = ExecutorRegistry::builder()
        .register(Arc::new(CompositeModelGenerator {
            catalog: catalog.clone(),
        }))
        .register(Arc::new(StructureAssembler))
        .register(Arc::new(WorldMaintenanceExecutor))
        .build()
        .expect("executor registry wiring is static");

    let jobs = Arc::new(JobService::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(registry),
    ));

    let engine = Arc::new(WorkflowEngine::new(
        jobs.clone(),
        Arc::new(InMemoryWorkflowStore::new()),
    ));
    jobs.add_listener(engine.clone());

    engine
        .register(CompositeStructureWorkflow::new(catalog.clone()))
        .expect("workflow registration is static");

    let runner = JobRunner::new(jobs.clone()).spawn();

    AppServices {
        sync: SyncExecutor::new(jobs.clone()),
        jobs,
        engine,
        catalog,
        _runner: runner,
    }
}
