//! Submission and query entry points.
//!
//! The write path validates, records and admits jobs; the read path goes
//! straight to the repository.

use std::sync::Arc;

use audioforged_common::{Error, JobId, Result};
use audioforged_db::{JobRecord, JobRepository};

use crate::conversion::{
    ConversionJob, ConversionOrchestrator, ConversionRequest, JobQueue, RawConversionRequest,
};

/// Outcome of a submission. The id is returned either way for traceability.
#[derive(Debug)]
pub enum Submission {
    Accepted { id: JobId },
    Rejected { id: JobId, error: Error },
}

impl Submission {
    pub fn id(&self) -> JobId {
        match self {
            Self::Accepted { id } | Self::Rejected { id, .. } => *id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Front door of the conversion service.
pub struct ConverterService {
    repo: Arc<dyn JobRepository>,
    orchestrator: Arc<ConversionOrchestrator>,
    queue: JobQueue,
}

impl ConverterService {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        orchestrator: Arc<ConversionOrchestrator>,
        queue: JobQueue,
    ) -> Self {
        Self {
            repo,
            orchestrator,
            queue,
        }
    }

    /// Start the worker pool.
    pub fn start(&self) {
        self.queue.start();
    }

    /// Stop the worker pool and wait for in-progress jobs.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Validate, record and admit a conversion.
    ///
    /// Validation failures create no record. If the record is created but
    /// admission fails, the record is failed straight away so no QUEUED row
    /// is left behind.
    pub fn submit(&self, raw: &RawConversionRequest) -> Submission {
        let id = JobId::new();

        let request = match ConversionRequest::validate(id, raw) {
            Ok(request) => request,
            Err(error) => {
                tracing::info!(job_id = %id, %error, "Rejected invalid conversion request");
                return Submission::Rejected { id, error };
            }
        };

        if let Err(error) = self.repo.create_job(id) {
            tracing::error!(job_id = %id, %error, "Could not record conversion job");
            return Submission::Rejected { id, error };
        }

        let job = ConversionJob::new(request, Arc::clone(&self.orchestrator));
        if let Err(error) = self.queue.enqueue(job) {
            tracing::warn!(job_id = %id, %error, "Conversion job not admitted");
            if let Err(e) = self.repo.mark_failed(id) {
                tracing::error!(job_id = %id, error = %e, "Could not fail unadmitted job");
            }
            return Submission::Rejected { id, error };
        }

        tracing::info!(
            job_id = %id,
            from = raw.source_encoding,
            to = raw.target_encoding,
            "Conversion job queued"
        );
        Submission::Accepted { id }
    }

    /// Current record for `id`.
    pub fn query(&self, id: JobId) -> Result<JobRecord> {
        self.repo.get_job(id)
    }
}
