//! End-to-end tests wiring registry + job service + runner + engine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use worldforge_core::{WorkflowInstanceId, WorldId};
use worldforge_jobs::{
    ExecutorOutput, ExecutorRegistry, InMemoryJobStore, Job, JobExecutionError, JobExecutor,
    JobRunner, JobRunnerConfig, JobService, SyncExecutor, SyncExecutionError,
};

use crate::catalog::InMemoryWorldCatalog;
use crate::composite::{
    CompositeModelRecord, CompositeStructureWorkflow, ASSEMBLE_COMPOSITE_STRUCTURE,
    CREATE_COMPOSITE_MODEL,
};
use crate::engine::{WorkflowEngine, WORKFLOW_COMPLETED};
use crate::store::InMemoryWorkflowStore;

/// Produces a model id derived from the requested description, so tests can
/// tell whose result ended up where.
struct ModelExecutor;

#[async_trait]
impl JobExecutor for ModelExecutor {
    fn executor_name(&self) -> &str {
        CREATE_COMPOSITE_MODEL
    }

    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
        let description = job
            .parameters
            .get("description")
            .ok_or_else(|| JobExecutionError::new("missing description"))?;
        Ok(ExecutorOutput::primary(format!("model-for-{description}")))
    }
}

struct AssembleExecutor;

#[async_trait]
impl JobExecutor for AssembleExecutor {
    fn executor_name(&self) -> &str {
        ASSEMBLE_COMPOSITE_STRUCTURE
    }

    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, JobExecutionError> {
        if !job.parameters.contains_key("modelId") {
            return Err(JobExecutionError::new("missing modelId"));
        }
        Ok(ExecutorOutput::new())
    }
}

struct Harness {
    jobs: Arc<JobService>,
    engine: Arc<WorkflowEngine>,
    catalog: Arc<InMemoryWorldCatalog>,
}

fn harness() -> Harness {
    let registry = ExecutorRegistry::builder()
        .register(Arc::new(ModelExecutor))
        .register(Arc::new(AssembleExecutor))
        .build()
        .unwrap();

    let jobs = Arc::new(JobService::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(registry),
    ));

    let engine = Arc::new(WorkflowEngine::new(
        jobs.clone(),
        Arc::new(InMemoryWorkflowStore::new()),
    ));
    jobs.add_listener(engine.clone());

    let catalog = Arc::new(InMemoryWorldCatalog::new());
    engine
        .register(CompositeStructureWorkflow::new(catalog.clone()))
        .unwrap();

    Harness {
        jobs,
        engine,
        catalog,
    }
}

fn composite_params(description: &str) -> BTreeMap<String, String> {
    let mut raw = BTreeMap::new();
    raw.insert("description".to_string(), description.to_string());
    raw
}

async fn wait_for_status(
    engine: &WorkflowEngine,
    instance_id: WorkflowInstanceId,
    expected: &str,
) {
    for _ in 0..400 {
        let instance = engine.instance(instance_id).unwrap().unwrap();
        if instance.context.status() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let instance = engine.instance(instance_id).unwrap().unwrap();
    panic!(
        "instance never reached {expected}; stuck at {}",
        instance.context.status()
    );
}

#[tokio::test]
async fn composite_workflow_runs_to_completion() {
    let h = harness();

    let instance_id = h
        .engine
        .start_workflow(
            "createCompositeStructure",
            WorldId::new(),
            composite_params("watchtower"),
        )
        .unwrap();

    let runner = JobRunner::with_config(
        h.jobs.clone(),
        JobRunnerConfig::default().with_poll_interval(Duration::from_millis(5)),
    )
    .spawn();

    wait_for_status(&h.engine, instance_id, WORKFLOW_COMPLETED).await;
    runner.shutdown().await;

    let instance = h.engine.instance(instance_id).unwrap().unwrap();
    let record: CompositeModelRecord = instance.context.find_record().unwrap().unwrap();
    assert_eq!(record.model_id, "model-for-watchtower");
}

#[tokio::test]
async fn instances_progress_independently_under_one_runner() {
    let h = harness();

    let first = h
        .engine
        .start_workflow(
            "createCompositeStructure",
            WorldId::new(),
            composite_params("keep"),
        )
        .unwrap();
    let second = h
        .engine
        .start_workflow(
            "createCompositeStructure",
            WorldId::new(),
            composite_params("bridge"),
        )
        .unwrap();

    let runner = JobRunner::with_config(
        h.jobs.clone(),
        JobRunnerConfig::default().with_poll_interval(Duration::from_millis(5)),
    )
    .spawn();

    wait_for_status(&h.engine, first, WORKFLOW_COMPLETED).await;
    wait_for_status(&h.engine, second, WORKFLOW_COMPLETED).await;
    runner.shutdown().await;

    // Each instance's journal holds the id its own step produced, even
    // though a single execution mechanism interleaved the jobs.
    let record: CompositeModelRecord = h
        .engine
        .instance(first)
        .unwrap()
        .unwrap()
        .context
        .find_record()
        .unwrap()
        .unwrap();
    assert_eq!(record.model_id, "model-for-keep");

    let record: CompositeModelRecord = h
        .engine
        .instance(second)
        .unwrap()
        .unwrap()
        .context
        .find_record()
        .unwrap()
        .unwrap();
    assert_eq!(record.model_id, "model-for-bridge");
}

#[tokio::test]
async fn rejected_trigger_is_repeatable_and_leaves_no_state() {
    let h = harness();
    h.catalog.disable_generator("composite");

    for _ in 0..2 {
        let err = h
            .engine
            .start_workflow(
                "createCompositeStructure",
                WorldId::new(),
                composite_params("watchtower"),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::WorkflowError::Validation(_)));
    }

    let stats = h.jobs.stats().unwrap();
    assert_eq!(
        stats.pending + stats.running + stats.completed + stats.failed,
        0
    );
}

#[tokio::test]
async fn sync_adapter_rejects_unknown_tool_without_creating_jobs() {
    let h = harness();
    let sync = SyncExecutor::new(h.jobs.clone());

    let err = sync
        .execution()
        .world_id(WorldId::new())
        .executor("unknown-tool")
        .build()
        .unwrap_err();

    assert!(matches!(err, SyncExecutionError::UnknownExecutor(_)));

    let stats = h.jobs.stats().unwrap();
    assert_eq!(
        stats.pending + stats.running + stats.completed + stats.failed,
        0
    );
}

#[tokio::test]
async fn sync_adapter_completes_through_the_runner() {
    let h = harness();
    let sync = SyncExecutor::new(h.jobs.clone());

    let runner = JobRunner::with_config(
        h.jobs.clone(),
        JobRunnerConfig::default().with_poll_interval(Duration::from_millis(5)),
    )
    .spawn();

    let result = sync
        .execution()
        .world_id(WorldId::new())
        .executor(CREATE_COMPOSITE_MODEL)
        .parameter("description", "gatehouse")
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
        .execute_and_wait()
        .await
        .unwrap();

    runner.shutdown().await;

    assert!(result
        .result
        .as_deref()
        .unwrap()
        .contains("model-for-gatehouse"));
}
