//! Drives one admitted job from QUEUED to a terminal state.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use audioforged_av::{CommandBuilder, CommandPlan, ExecutableFactory};
use audioforged_common::{Error, JobId, JobStatus, Result};
use audioforged_db::JobRepository;
use tokio::fs::File;

use super::queue::QueuedJob;
use super::request::ConversionRequest;
use crate::storage::BlobStore;

/// Runs conversions against the repository, the process runner and the
/// blob store.
pub struct ConversionOrchestrator {
    repo: Arc<dyn JobRepository>,
    blobs: Arc<dyn BlobStore>,
    executables: Arc<dyn ExecutableFactory>,
    commands: CommandBuilder,
}

impl ConversionOrchestrator {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        blobs: Arc<dyn BlobStore>,
        executables: Arc<dyn ExecutableFactory>,
        commands: CommandBuilder,
    ) -> Self {
        Self {
            repo,
            blobs,
            executables,
            commands,
        }
    }

    /// Process one job.
    ///
    /// Returns the terminal status that was recorded. Returns an error when
    /// the job could not be driven to a consistent terminal state: the
    /// CONVERTING write failed (nothing was run), the process claimed success
    /// but left no output file, or the COMPLETED write failed after the
    /// artifact was already published.
    pub async fn run(&self, request: ConversionRequest) -> Result<JobStatus> {
        let id = request.id();

        if let Err(e) = self.repo.mark_converting(id) {
            tracing::error!(job_id = %id, error = %e, "Could not mark job converting, not running it");
            return Err(e);
        }

        let plan = self.commands.plan(
            id,
            request.source_url(),
            request.source_encoding(),
            request.target_encoding(),
        );
        tracing::info!(
            job_id = %id,
            from = %request.source_encoding(),
            to = %request.target_encoding(),
            command = %plan,
            "Starting conversion"
        );

        let mut exe = self.executables.build(&plan);
        exe.set_stderr(Stdio::inherit());

        if let Err(e) = exe.start() {
            remove_temp_file(id, &plan.output_path).await;
            return Ok(self.fail(id, &e.into()));
        }

        if let Err(e) = exe.wait().await {
            remove_temp_file(id, &plan.output_path).await;
            return Ok(self.fail(id, &e.into()));
        }
        drop(exe);

        let file = match File::open(&plan.output_path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(
                    job_id = %id,
                    path = %plan.output_path.display(),
                    error = %e,
                    "Converter exited cleanly but produced no output"
                );
                let err = Error::MissingArtifact(plan.output_path.clone());
                self.fail(id, &err);
                return Err(err);
            }
        };

        self.upload(&request, &plan, file).await;

        let url = match self.blobs.signed_url(id).await {
            Ok(url) => url,
            Err(e) => return Ok(self.fail(id, &e)),
        };

        if let Err(e) = self.repo.mark_completed(id, &url) {
            tracing::error!(
                job_id = %id,
                url = %url,
                error = %e,
                "Artifact is published but the job could not be marked completed"
            );
            return Err(e);
        }

        tracing::info!(job_id = %id, "Conversion completed");
        Ok(JobStatus::Completed)
    }

    /// Upload the artifact, then delete the temp file whatever happened.
    async fn upload(&self, request: &ConversionRequest, plan: &CommandPlan, file: File) {
        let id = request.id();
        let content_type = request.target_encoding().content_type();

        match self.blobs.upload(id, content_type, file).await {
            Ok(()) => tracing::debug!(job_id = %id, "Artifact uploaded"),
            Err(e) => tracing::warn!(job_id = %id, error = %e, "Artifact upload failed"),
        }

        remove_temp_file(id, &plan.output_path).await;
    }

    fn fail(&self, id: JobId, reason: &Error) -> JobStatus {
        tracing::warn!(job_id = %id, error = %reason, "Conversion failed");

        if let Err(e) = self.repo.mark_failed(id) {
            tracing::error!(job_id = %id, error = %e, "Could not mark job failed");
        }
        JobStatus::Failed
    }
}

async fn remove_temp_file(id: JobId, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(job_id = %id, path = %path.display(), error = %e, "Could not remove temp file")
        }
    }
}

/// A validated request bound to the orchestrator that will run it.
pub struct ConversionJob {
    request: ConversionRequest,
    orchestrator: Arc<ConversionOrchestrator>,
}

impl ConversionJob {
    pub fn new(request: ConversionRequest, orchestrator: Arc<ConversionOrchestrator>) -> Self {
        Self {
            request,
            orchestrator,
        }
    }
}

#[async_trait::async_trait]
impl QueuedJob for ConversionJob {
    async fn execute(self: Box<Self>) {
        let Self {
            request,
            orchestrator,
        } = *self;
        let id = request.id();
        match orchestrator.run(request).await {
            Ok(status) => tracing::debug!(job_id = %id, %status, "Job finished"),
            Err(e) => tracing::error!(job_id = %id, error = %e, "Job ended with an unrecoverable error"),
        }
    }
}
