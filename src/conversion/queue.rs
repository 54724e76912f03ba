//! Bounded worker pool with pull-based dispatch.
//!
//! Every idle worker advertises a private mailbox on a shared channel. The
//! dispatcher takes one advertised mailbox, then one admitted job, and hands
//! the job to that mailbox. A job is therefore only ever pulled from the
//! admission buffer when some worker is idle, so the buffer holds exactly
//! `queue_capacity` jobs while every worker is busy.
//!
//! Which idle worker gets the next job depends on who advertised first.
//! Completion order across jobs is not defined.

use async_trait::async_trait;
use audioforged_common::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::QueueConfig;

/// Work the pool can run. Execution outcome is invisible to the pool.
#[async_trait]
pub trait QueuedJob: Send + 'static {
    async fn execute(self: Box<Self>);
}

type BoxedJob = Box<dyn QueuedJob>;
type Mailbox = mpsc::Sender<BoxedJob>;

struct RunningPool {
    jobs: mpsc::Sender<BoxedJob>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

/// Fixed-size pool of workers fed from a bounded admission buffer.
pub struct JobQueue {
    concurrency: usize,
    queue_capacity: usize,
    running: Mutex<Option<RunningPool>>,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            queue_capacity: config.queue_capacity.max(1),
            running: Mutex::new(None),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Spawn the workers and the dispatcher on the current runtime.
    ///
    /// Call once per stop. Starting a running pool is a no-op.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::warn!("Job queue already running");
            return;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel(self.queue_capacity);
        let (ready_tx, ready_rx) = mpsc::channel(self.concurrency);
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();

        for index in 0..self.concurrency {
            tasks.spawn(run_worker(index, ready_tx.clone(), cancel.clone()));
        }
        tasks.spawn(run_dispatcher(jobs_rx, ready_rx, cancel.clone()));
        tasks.close();

        tracing::info!(
            concurrency = self.concurrency,
            queue_capacity = self.queue_capacity,
            "Job queue started"
        );

        *running = Some(RunningPool {
            jobs: jobs_tx,
            cancel,
            tasks,
        });
    }

    /// Admit `job` for later execution without waiting.
    ///
    /// Fails with [`Error::QueueStopped`] when the pool is not running and
    /// [`Error::QueueFull`] when the buffer is at capacity. Success only means
    /// the job was admitted.
    pub fn enqueue<J: QueuedJob>(&self, job: J) -> Result<()> {
        let running = self.running.lock();
        let pool = running.as_ref().ok_or(Error::QueueStopped)?;

        pool.jobs.try_send(Box::new(job)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::QueueStopped,
        })
    }

    /// Signal every worker to exit after its current job.
    ///
    /// Jobs still waiting in the buffer are dropped without running.
    pub fn stop(&self) {
        if let Some(pool) = self.running.lock().take() {
            pool.cancel.cancel();
            tracing::info!("Job queue stopping");
        }
    }

    /// [`stop`](Self::stop), then wait for in-progress jobs to finish.
    pub async fn shutdown(&self) {
        let pool = self.running.lock().take();
        if let Some(pool) = pool {
            pool.cancel.cancel();
            pool.tasks.wait().await;
            tracing::info!("Job queue stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        if let Some(pool) = self.running.get_mut().take() {
            pool.cancel.cancel();
        }
    }
}

async fn run_dispatcher(
    mut jobs: mpsc::Receiver<BoxedJob>,
    mut ready: mpsc::Receiver<Mailbox>,
    cancel: CancellationToken,
) {
    loop {
        let mailbox = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            mailbox = ready.recv() => match mailbox {
                Some(mailbox) => mailbox,
                None => break,
            },
        };

        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if mailbox.send(job).await.is_err() {
            tracing::debug!("Worker went away before its job was handed over");
        }
    }

    let abandoned = jobs.len();
    if abandoned > 0 {
        tracing::info!(abandoned, "Dropping jobs that never started");
    }
}

async fn run_worker(index: usize, ready: mpsc::Sender<Mailbox>, cancel: CancellationToken) {
    let (mailbox, mut inbox) = mpsc::channel::<BoxedJob>(1);
    tracing::debug!(worker = index, "Worker started");

    loop {
        if cancel.is_cancelled() || ready.send(mailbox.clone()).await.is_err() {
            break;
        }

        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = inbox.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        job.execute().await;
    }

    tracing::debug!(worker = index, "Worker exited");
}
