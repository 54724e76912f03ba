//! Shared test harness for integration tests.
//!
//! Provides in-memory doubles for the repository, the process runner and
//! the blob store, plus [`TestHarness`] which wires them into a full
//! [`ConverterService`] with a temp directory for converted output.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use audioforged::config::QueueConfig;
use audioforged::conversion::{ConversionOrchestrator, JobQueue};
use audioforged::service::ConverterService;
use audioforged::storage::BlobStore;
use audioforged_av::{CommandBuilder, CommandPlan, Executable, ExecutableFactory};
use audioforged_common::{Error, JobId, JobStatus, Result, NO_RESULT_LOCATION};
use audioforged_db::{JobRecord, JobRepository};

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// [`JobRepository`] over a map, with failure switches and a gauge of how
/// many jobs were CONVERTING at once.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    converting: AtomicUsize,
    max_converting: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_mark_converting: AtomicBool,
    pub fail_mark_completed: AtomicBool,
    pub fail_mark_failed: AtomicBool,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of simultaneously CONVERTING jobs seen so far.
    pub fn max_converting(&self) -> usize {
        self.max_converting.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn count_in(&self, status: JobStatus) -> usize {
        self.jobs
            .lock()
            .values()
            .filter(|job| job.status == status)
            .count()
    }

    fn transition(&self, id: JobId, to: JobStatus, location: Option<&str>) -> Result<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("job {}", id)))?;

        if !job.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to,
            });
        }

        let from = job.status;
        job.status = to;
        job.last_updated = chrono::Utc::now();
        if let Some(location) = location {
            job.result_location = location.to_string();
        }

        if to == JobStatus::Converting {
            let now = self.converting.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_converting.fetch_max(now, Ordering::SeqCst);
        } else if from == JobStatus::Converting {
            self.converting.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl JobRepository for InMemoryJobRepository {
    fn create_job(&self, id: JobId) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::database("create failed"));
        }
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&id) {
            return Err(Error::database(format!("duplicate job {}", id)));
        }
        jobs.insert(id, JobRecord::queued(id, chrono::Utc::now()));
        Ok(())
    }

    fn mark_converting(&self, id: JobId) -> Result<()> {
        if self.fail_mark_converting.load(Ordering::SeqCst) {
            return Err(Error::database("mark converting failed"));
        }
        self.transition(id, JobStatus::Converting, None)
    }

    fn mark_completed(&self, id: JobId, url: &str) -> Result<()> {
        if self.fail_mark_completed.load(Ordering::SeqCst) {
            return Err(Error::database("mark completed failed"));
        }
        self.transition(id, JobStatus::Completed, Some(url))
    }

    fn mark_failed(&self, id: JobId) -> Result<()> {
        if self.fail_mark_failed.load(Ordering::SeqCst) {
            return Err(Error::database("mark failed failed"));
        }
        self.transition(id, JobStatus::Failed, None)
    }

    fn get_job(&self, id: JobId) -> Result<JobRecord> {
        self.jobs
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("job {}", id)))
    }
}

// ---------------------------------------------------------------------------
// Process runner
// ---------------------------------------------------------------------------

/// What every executable built by [`ScriptedExecutableFactory`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Exit cleanly after writing the output file.
    Succeed,
    /// Refuse to start.
    FailStart,
    /// Start, write a partial output file, then exit with an error.
    FailWait,
    /// Exit cleanly without writing anything.
    SucceedWithoutOutput,
}

/// [`ExecutableFactory`] whose executables never spawn a process.
pub struct ScriptedExecutableFactory {
    script: Mutex<Script>,
    duration: Mutex<Duration>,
    plans: Mutex<Vec<CommandPlan>>,
    started: Arc<AtomicUsize>,
}

impl ScriptedExecutableFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            duration: Mutex::new(Duration::ZERO),
            plans: Mutex::new(Vec::new()),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock() = script;
    }

    /// How long each simulated run takes.
    pub fn set_duration(&self, duration: Duration) {
        *self.duration.lock() = duration;
    }

    /// Number of executables successfully started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn plans(&self) -> Vec<CommandPlan> {
        self.plans.lock().clone()
    }
}

impl ExecutableFactory for ScriptedExecutableFactory {
    fn build(&self, plan: &CommandPlan) -> Box<dyn Executable> {
        self.plans.lock().push(plan.clone());
        Box::new(ScriptedExecutable {
            script: *self.script.lock(),
            duration: *self.duration.lock(),
            output: plan.output_path.clone(),
            started: Arc::clone(&self.started),
            running: false,
        })
    }
}

struct ScriptedExecutable {
    script: Script,
    duration: Duration,
    output: PathBuf,
    started: Arc<AtomicUsize>,
    running: bool,
}

#[async_trait]
impl Executable for ScriptedExecutable {
    fn set_stderr(&mut self, _sink: Stdio) {}

    fn start(&mut self) -> audioforged_av::Result<()> {
        if self.script == Script::FailStart {
            return Err(audioforged_av::Error::tool_failed("ffmpeg", "failed to spawn"));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        self.running = true;
        Ok(())
    }

    async fn wait(&mut self) -> audioforged_av::Result<()> {
        if !self.running {
            return Err(audioforged_av::Error::tool_failed("ffmpeg", "not started"));
        }
        tokio::time::sleep(self.duration).await;

        match self.script {
            Script::Succeed => {
                tokio::fs::write(&self.output, b"converted audio").await?;
                Ok(())
            }
            Script::FailWait => {
                tokio::fs::write(&self.output, b"partial").await?;
                Err(audioforged_av::Error::tool_failed(
                    "ffmpeg",
                    "exited with status 1",
                ))
            }
            Script::SucceedWithoutOutput => Ok(()),
            Script::FailStart => unreachable!("start already failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Blob store
// ---------------------------------------------------------------------------

/// A stored artifact.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// [`BlobStore`] over a map. Signed URLs look like
/// `http://localhost/<bucket>/<id>`.
pub struct InMemoryBlobStore {
    bucket: String,
    blobs: Mutex<HashMap<JobId, StoredBlob>>,
    pub fail_upload: AtomicBool,
    pub fail_sign: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            blobs: Mutex::new(HashMap::new()),
            fail_upload: AtomicBool::new(false),
            fail_sign: AtomicBool::new(false),
        }
    }

    pub fn get(&self, id: JobId) -> Option<StoredBlob> {
        self.blobs.lock().get(&id).cloned()
    }

    pub fn url_for(&self, id: JobId) -> String {
        format!("http://localhost/{}/{}", self.bucket, id)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, id: JobId, content_type: &str, mut file: File) -> Result<()> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(Error::storage("upload failed"));
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        self.blobs.lock().insert(
            id,
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn signed_url(&self, id: JobId) -> Result<String> {
        if self.fail_sign.load(Ordering::SeqCst) {
            return Err(Error::storage("signing failed"));
        }
        Ok(self.url_for(id))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A [`ConverterService`] wired to in-memory doubles.
pub struct TestHarness {
    pub repo: Arc<InMemoryJobRepository>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub executables: Arc<ScriptedExecutableFactory>,
    pub orchestrator: Arc<ConversionOrchestrator>,
    pub service: Arc<ConverterService>,
    pub tmp: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with 2 workers and room for 8 buffered jobs. Not started.
    pub fn new() -> Self {
        Self::with_queue(2, 8)
    }

    pub fn with_queue(concurrency: usize, queue_capacity: usize) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let repo = Arc::new(InMemoryJobRepository::new());
        let blobs = Arc::new(InMemoryBlobStore::new("converted"));
        let executables = Arc::new(ScriptedExecutableFactory::new(Script::Succeed));

        let orchestrator = Arc::new(ConversionOrchestrator::new(
            repo.clone(),
            blobs.clone(),
            executables.clone(),
            CommandBuilder::new("ffmpeg", tmp.path()),
        ));

        let service = Arc::new(ConverterService::new(
            repo.clone(),
            orchestrator.clone(),
            JobQueue::new(QueueConfig {
                concurrency,
                queue_capacity,
            }),
        ));

        Self {
            repo,
            blobs,
            executables,
            orchestrator,
            service,
            tmp,
        }
    }

    /// Number of files left in the temp directory.
    pub fn temp_files(&self) -> usize {
        std::fs::read_dir(self.tmp.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Create a QUEUED record directly, as the submission path would.
    pub fn seed_job(&self) -> JobId {
        let id = JobId::new();
        self.repo.create_job(id).expect("failed to seed job");
        id
    }

    /// Poll until `id` is terminal.
    pub async fn wait_for_terminal(&self, id: JobId) -> JobRecord {
        wait_for_terminal(self.repo.as_ref(), id).await
    }
}

/// Poll `repo` until `id` reaches a terminal status, panicking after 5s.
pub async fn wait_for_terminal(repo: &dyn JobRepository, id: JobId) -> JobRecord {
    let poll = async {
        loop {
            if let Ok(job) = repo.get_job(id) {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("job {} never reached a terminal state", id))
}

/// Poll until `check` holds, panicking after 5s.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

pub fn assert_no_result(job: &JobRecord) {
    assert_eq!(job.result_location, NO_RESULT_LOCATION);
}
