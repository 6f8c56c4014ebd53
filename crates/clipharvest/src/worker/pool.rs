use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::download::{DownloadFailure, DownloadOutcome, DownloadStage, VideoDownloader};
use crate::error::{FailureKind, QueueError};
use crate::queue::JobStore;
use crate::storage::ArtifactStorage;
use crate::worker::job::{JobOutput, JobResult, QueuedJob};
use crate::worker::retry::RetryPolicy;

const ARTIFACT_EXTENSION: &str = "mp4";
const CANCELLED_MESSAGE: &str = "cancelled";

/// Everything a worker needs to run a job.
pub struct WorkerContext {
    pub store: Arc<JobStore>,
    pub downloader: Arc<dyn VideoDownloader>,
    /// When unset, downloads are kept only as metrics and metadata.
    pub storage: Option<ArtifactStorage>,
    pub retry: RetryPolicy,
}

type SharedReceiver = Arc<tokio::sync::Mutex<UnboundedReceiver<QueuedJob>>>;

/// Fixed set of Tokio tasks pulling jobs from one channel.
///
/// Finished jobs are reported on a crossbeam channel, see
/// [`WorkerPool::result_receiver`].
pub struct WorkerPool {
    job_sender: Mutex<Option<UnboundedSender<QueuedJob>>>,
    result_receiver: Receiver<JobResult>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers (at least one) on the current runtime.
    pub fn start(context: Arc<WorkerContext>, worker_count: usize) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let worker_count = worker_count.max(1);

        let (job_sender, job_receiver) = mpsc::unbounded_channel::<QueuedJob>();
        let job_receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(job_receiver));
        let (result_sender, result_receiver) = crossbeam_channel::unbounded::<JobResult>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let handle = runtime.spawn(run_worker(
                worker_id,
                Arc::clone(&job_receiver),
                result_sender.clone(),
                Arc::clone(&shutdown),
                Arc::clone(&context),
            ));
            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender: Mutex::new(Some(job_sender)),
            result_receiver,
            workers: Mutex::new(workers),
            shutdown,
        })
    }

    pub fn submit(&self, job: QueuedJob) -> Result<(), QueueError> {
        if self.is_shutdown() {
            return Err(QueueError::ChannelClosed);
        }
        lock(&self.job_sender)
            .as_ref()
            .ok_or(QueueError::ChannelClosed)?
            .send(job)
            .map_err(|_| QueueError::ChannelClosed)
    }

    /// A handle on the result channel. It disconnects once every worker has
    /// stopped.
    pub fn result_receiver(&self) -> Receiver<JobResult> {
        self.result_receiver.clone()
    }

    /// Stops accepting jobs. Workers finish their current job, then exit.
    /// Jobs still queued stay `pending`.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::SeqCst);
        lock(&self.job_sender).take();
    }

    pub async fn wait(&self) {
        let workers = std::mem::take(&mut *lock(&self.workers));
        for (i, worker) in workers.into_iter().enumerate() {
            match worker.await {
                Ok(()) => debug!("Worker {} finished", i),
                Err(e) => error!("Worker {} panicked: {}", i, e),
            }
        }
        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            warn!("Worker pool lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

async fn run_worker(
    worker_id: usize,
    job_receiver: SharedReceiver,
    result_sender: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
    context: Arc<WorkerContext>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = { job_receiver.lock().await.recv().await };
        let Some(job) = next else {
            break;
        };
        if shutdown.load(Ordering::SeqCst) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        let span = tracing::info_span!("job", id = %job.id, worker = worker_id);
        let Some(result) = process_job(&context, job).instrument(span).await else {
            continue;
        };
        if result_sender.send(result).is_err() {
            error!("Worker {} lost its result channel", worker_id);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Claims a pending job and runs it to a terminal outcome, retrying transient
/// failures. Returns `None` when the job was already claimed or removed.
async fn process_job(context: &WorkerContext, job: QueuedJob) -> Option<JobResult> {
    if !context.store.try_start(&job.id) {
        debug!("Skipping job {}: no longer pending", job.id);
        return None;
    }

    let mut attempts = 0;
    loop {
        if context.store.is_cancel_requested(&job.id) {
            info!("Job {} cancelled after {} attempts", job.id, attempts);
            return Some(JobResult::failure(
                job.id,
                attempts,
                FailureKind::Cancelled,
                CANCELLED_MESSAGE.to_string(),
            ));
        }

        attempts += 1;
        context.store.record_attempt(&job.id, attempts);

        match context.downloader.download(&job.source_url).await {
            Ok(outcome) => {
                let stored = store_artifact(context, &job, outcome).await;
                return Some(match stored {
                    Ok(output) => JobResult::success(job.id, attempts, output),
                    Err(failure) => {
                        JobResult::failure(job.id, attempts, failure.kind, failure.to_string())
                    }
                });
            }
            Err(failure) if context.retry.should_retry(failure.kind, attempts) => {
                let delay = context.retry.delay_for(attempts);
                warn!(
                    "Job {} attempt {} failed: {}; retrying in {:?}",
                    job.id, attempts, failure, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(failure) => {
                return Some(JobResult::failure(
                    job.id,
                    attempts,
                    failure.kind,
                    failure.to_string(),
                ));
            }
        }
    }
}

async fn store_artifact(
    context: &WorkerContext,
    job: &QueuedJob,
    outcome: DownloadOutcome,
) -> Result<JobOutput, DownloadFailure> {
    let DownloadOutcome {
        video_data,
        metrics,
        metadata,
    } = outcome;

    let artifact_path = match &context.storage {
        Some(storage) => {
            let storage = storage.clone();
            let directory = job.platform.as_str();
            let filename = job.id.clone();
            let path = tokio::task::spawn_blocking(move || {
                storage.store(&video_data, directory, &filename, ARTIFACT_EXTENSION)
            })
            .await
            .map_err(|e| storage_failure(e.to_string()))?
            .map_err(|e| storage_failure(e.to_string()))?;
            Some(path.to_string_lossy().into_owned())
        }
        None => None,
    };

    Ok(JobOutput {
        artifact_path,
        metrics,
        metadata,
    })
}

fn storage_failure(message: String) -> DownloadFailure {
    DownloadFailure::new(DownloadStage::StoreArtifact, FailureKind::Storage, message)
}
