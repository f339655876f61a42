//! Job storage implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use worldforge_core::{JobId, WorldId};

use crate::types::{Job, JobStatus};

/// Job store abstraction.
///
/// The in-memory implementation ships with the core; durable backends plug
/// in behind this trait.
pub trait JobStore: Send + Sync {
    /// Persist a newly created job.
    fn insert(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Get a job by ID. Absence is a normal outcome, not an error.
    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Persist an updated job.
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the next pending job, transitioning it to `Running`.
    ///
    /// The transition happens inside the store's write lock, so a job id is
    /// claimed at most once. Returns `None` when nothing is pending.
    fn claim_next(&self) -> Result<Option<Job>, JobStoreError>;

    /// List jobs belonging to a world, oldest first.
    fn list_by_world(&self, world_id: WorldId, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    /// Counts per status.
    fn stats(&self) -> Result<JobStats, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Job statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// In-memory job store for dev/test and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(&job_id).cloned())
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(JobStoreError::NotFound(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();

        // FIFO by creation time (ties broken by id, which is time-ordered).
        let next = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);

        if let Some(job_id) = next {
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_running();
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    fn list_by_world(&self, world_id: WorldId, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<Job> = jobs
            .values()
            .filter(|j| j.world_id == world_id)
            .cloned()
            .collect();

        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        Ok(result)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut stats = JobStats::default();

        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_job(world_id: WorldId) -> Job {
        Job::new(
            world_id,
            "generateTerrain",
            "Generate terrain",
            None,
            BTreeMap::new(),
        )
    }

    #[test]
    fn insert_and_claim() {
        let store = InMemoryJobStore::new();
        let world = WorldId::new();

        let job_id = store.insert(test_job(world)).unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, job_id);
        assert_eq!(claimed.status, JobStatus::Running);
        assert!(claimed.started_at.is_some());

        // No more pending jobs.
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn claim_is_fifo() {
        let store = InMemoryJobStore::new();
        let world = WorldId::new();

        let first = store.insert(test_job(world)).unwrap();
        let second = store.insert(test_job(world)).unwrap();

        assert_eq!(store.claim_next().unwrap().unwrap().id, first);
        assert_eq!(store.claim_next().unwrap().unwrap().id, second);
    }

    #[test]
    fn get_unknown_id_is_absent_not_error() {
        let store = InMemoryJobStore::new();
        assert!(store.get(JobId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let store = InMemoryJobStore::new();
        let job = test_job(WorldId::new());
        store.insert(job.clone()).unwrap();

        assert!(matches!(
            store.insert(job),
            Err(JobStoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn list_scoped_to_world() {
        let store = InMemoryJobStore::new();
        let world_a = WorldId::new();
        let world_b = WorldId::new();

        store.insert(test_job(world_a)).unwrap();
        store.insert(test_job(world_a)).unwrap();
        store.insert(test_job(world_b)).unwrap();

        assert_eq!(store.list_by_world(world_a, 10).unwrap().len(), 2);
        assert_eq!(store.list_by_world(world_b, 10).unwrap().len(), 1);
        assert_eq!(store.list_by_world(world_a, 1).unwrap().len(), 1);
    }

    #[test]
    fn stats_track_statuses() {
        let store = InMemoryJobStore::new();
        let world = WorldId::new();

        for _ in 0..3 {
            store.insert(test_job(world)).unwrap();
        }
        store.claim_next().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.running, 1);
    }
}
