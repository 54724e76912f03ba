//! The job repository contract.
//!
//! The repository is the only writer of job status. The orchestrator and the
//! submission path request transitions through [`JobRepository`]; the query
//! path reads through it.

use audioforged_common::{JobId, Result};

use crate::models::JobRecord;
use crate::pool::{get_conn, DbPool};
use crate::queries::conversion_jobs;

/// Durable job-record storage keyed by job id.
///
/// Every call reports a missing record as `Error::NotFound`, distinct from
/// storage failures. Per-id transitions are atomic.
pub trait JobRepository: Send + Sync {
    /// Create a record in QUEUED.
    fn create_job(&self, id: JobId) -> Result<()>;

    /// QUEUED -> CONVERTING.
    fn mark_converting(&self, id: JobId) -> Result<()>;

    /// CONVERTING -> COMPLETED with the retrieval URL.
    fn mark_completed(&self, id: JobId, url: &str) -> Result<()>;

    /// QUEUED | CONVERTING -> FAILED.
    fn mark_failed(&self, id: JobId) -> Result<()>;

    fn get_job(&self, id: JobId) -> Result<JobRecord>;
}

/// [`JobRepository`] backed by the SQLite pool.
#[derive(Clone)]
pub struct SqliteJobRepository {
    pool: DbPool,
}

impl SqliteJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Fail records a previous process left QUEUED or CONVERTING.
    pub fn reset_orphaned_jobs(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::reset_orphaned_jobs(&conn)
    }

    /// Delete terminal records older than `days`.
    pub fn prune_terminal_jobs(&self, days: i64) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::prune_terminal_jobs(&conn, days)
    }
}

impl JobRepository for SqliteJobRepository {
    fn create_job(&self, id: JobId) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::create_job(&conn, id).map(|_| ())
    }

    fn mark_converting(&self, id: JobId) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::start_conversion(&conn, id)
    }

    fn mark_completed(&self, id: JobId, url: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::complete_conversion(&conn, id, url)
    }

    fn mark_failed(&self, id: JobId) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::fail_conversion(&conn, id)
    }

    fn get_job(&self, id: JobId) -> Result<JobRecord> {
        let conn = get_conn(&self.pool)?;
        conversion_jobs::get_job(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{init_memory_pool, init_pool};
    use audioforged_common::JobStatus;
    use std::sync::Arc;

    #[test]
    fn test_repository_lifecycle() {
        let repo = SqliteJobRepository::new(init_memory_pool().unwrap());
        let id = JobId::new();

        repo.create_job(id).unwrap();
        repo.mark_converting(id).unwrap();
        repo.mark_completed(id, "http://localhost/bucket/id").unwrap();

        let job = repo.get_job(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.url(), Some("http://localhost/bucket/id"));
    }

    #[test]
    fn test_repository_as_trait_object() {
        let repo: Arc<dyn JobRepository> =
            Arc::new(SqliteJobRepository::new(init_memory_pool().unwrap()));
        let id = JobId::new();

        repo.create_job(id).unwrap();
        repo.mark_failed(id).unwrap();
        assert_eq!(repo.get_job(id).unwrap().status, JobStatus::Failed);
        assert!(repo.get_job(JobId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_concurrent_writers_on_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let repo = Arc::new(SqliteJobRepository::new(
            init_pool(&path.to_string_lossy()).unwrap(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    let id = JobId::new();
                    repo.create_job(id).unwrap();
                    repo.mark_converting(id).unwrap();
                    repo.mark_completed(id, "http://x").unwrap();
                    id
                })
            })
            .collect();

        for handle in handles {
            let id = handle.join().unwrap();
            assert_eq!(repo.get_job(id).unwrap().status, JobStatus::Completed);
        }
    }

    #[test]
    fn test_reset_orphaned_jobs() {
        let repo = SqliteJobRepository::new(init_memory_pool().unwrap());
        let id = JobId::new();
        repo.create_job(id).unwrap();
        repo.mark_converting(id).unwrap();

        assert_eq!(repo.reset_orphaned_jobs().unwrap(), 1);
        assert_eq!(repo.get_job(id).unwrap().status, JobStatus::Failed);
    }
}
