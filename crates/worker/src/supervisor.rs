//! Worker Supervisor.
//!
//! [`Supervisor::run`] subscribes to the dispatch topic and feeds a bounded
//! hand-off queue drained by `pool_size` worker tasks. While every worker is
//! busy and the queue is full, intake stops pulling from the bus, so at most
//! `pool_size` jobs are in flight and at most `queue_depth` wait in process.
//!
//! [`Supervisor::process`] drives one delivery through the stage machine and
//! is usable on its own.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cipherq_core::job::ValidatedJob;
use cipherq_core::naming;
use cipherq_core::result::ResultMessage;
use cipherq_core::transform::TransformArgs;
use cipherq_core::validation::Validator;
use cipherq_events::{BusError, CompletionPublisher, MessageBus};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::dedup::DedupGuard;
use crate::error::JobError;
use crate::iv::IvResolver;
use crate::stage::{JobOutcome, JobReport, JobStage, StageTrail};
use crate::store::ArtifactStore;
use crate::transform::Transform;
use crate::workspace::Workspace;

/// Consumes Job Messages and runs them on a bounded worker pool.
///
/// Cheap to clone; clones share the pool state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    dispatch_topic: String,
    pool_size: usize,
    queue_depth: usize,
    artifact_dir: PathBuf,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn ArtifactStore>,
    transform: Arc<dyn Transform>,
    publisher: CompletionPublisher,
    iv: IvResolver,
    dedup: DedupGuard,
    in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when a job ends, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Supervisor {
    pub fn new(
        config: &WorkerConfig,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn ArtifactStore>,
        transform: Arc<dyn Transform>,
    ) -> Self {
        let publisher = CompletionPublisher::new(bus.clone(), config.result_topic.clone());
        Self {
            inner: Arc::new(Inner {
                dispatch_topic: config.dispatch_topic.clone(),
                pool_size: config.pool_size.max(1),
                queue_depth: config.queue_depth.max(1),
                artifact_dir: config.artifact_dir.clone(),
                bus,
                iv: IvResolver::new(store.clone()),
                store,
                transform,
                publisher,
                dedup: DedupGuard::new(config.dedup_ttl, config.dedup_capacity),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Jobs currently between validation and their terminal stage.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Run until `cancel` fires or the dispatch topic closes.
    ///
    /// On return every worker has finished its current job and the
    /// hand-off queue is drained.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BusError> {
        let inner = &self.inner;
        let mut subscription = inner.bus.subscribe(&inner.dispatch_topic).await?;

        let (tx, rx) = mpsc::channel::<String>(inner.queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker in 0..inner.pool_size {
            let supervisor = self.clone();
            let rx = rx.clone();
            workers.spawn(async move { supervisor.worker_loop(worker, rx).await });
        }

        tracing::info!(
            topic = %inner.dispatch_topic,
            pool_size = inner.pool_size,
            queue_depth = inner.queue_depth,
            "Supervisor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Supervisor shutting down");
                    break;
                }
                delivery = subscription.recv() => {
                    let Some(payload) = delivery else {
                        tracing::info!("Dispatch topic closed, supervisor stopping");
                        break;
                    };
                    // Waits here while the pool and the queue are full.
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::warn!("Shutdown while waiting for a pool slot, delivery dropped");
                            break;
                        }
                        sent = tx.send(payload) => {
                            if sent.is_err() {
                                tracing::error!("Worker pool is gone, supervisor stopping");
                                break;
                            }
                        }
                    }
                }
            }
        }

        drop(tx);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        tracing::info!("Supervisor stopped");
        Ok(())
    }

    async fn worker_loop(&self, worker: usize, rx: Arc<Mutex<mpsc::Receiver<String>>>) {
        loop {
            let next = rx.lock().await.recv().await;
            let Some(payload) = next else {
                break;
            };
            let report = self.process(&payload).await;
            tracing::debug!(
                worker,
                job_id = ?report.job_id,
                stage = %report.trail.current(),
                "Delivery processed",
            );
        }
    }

    /// Drive one delivery to a terminal stage.
    ///
    /// Validation failures and duplicates publish nothing. Every other job
    /// publishes exactly one Result Message, after its artifact upload when
    /// it succeeds.
    pub async fn process(&self, payload: &str) -> JobReport {
        let inner = &self.inner;
        let mut trail = StageTrail::new();
        trail.advance(JobStage::Validating);

        let job = match Validator::check(payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "Job rejected");
                trail.advance(JobStage::Failed);
                return JobReport {
                    job_id: None,
                    trail,
                    outcome: JobOutcome::Rejected(e),
                };
            }
        };

        if !inner.dedup.try_claim(&job.job_id) {
            tracing::warn!(job_id = %job.job_id, "Duplicate delivery dropped");
            return JobReport {
                job_id: Some(job.job_id),
                trail,
                outcome: JobOutcome::Duplicate,
            };
        }

        let span = tracing::info_span!("job", job_id = %job.job_id);
        let outcome = async {
            let _in_flight = InFlight::enter(&inner.in_flight);
            tracing::info!(
                operation = %job.operation,
                mode = %job.mode,
                file_name = %job.file_name,
                "Job accepted",
            );

            match self.execute(&job, &mut trail).await {
                Ok(()) => {
                    trail.advance(JobStage::Completed);
                    let result = ResultMessage::success(&job);
                    inner.publisher.publish(&result).await;
                    tracing::info!("Job completed");
                    JobOutcome::Completed(result)
                }
                Err(error) => {
                    let stage = trail.current();
                    trail.advance(JobStage::Failed);
                    let result = ResultMessage::failure(&job, error.detail());
                    tracing::error!(%stage, error = %error, "Job failed");
                    inner.publisher.publish(&result).await;
                    JobOutcome::Failed { result, error }
                }
            }
        }
        .instrument(span)
        .await;

        inner.dedup.finish(&job.job_id);
        JobReport {
            job_id: Some(job.job_id),
            trail,
            outcome,
        }
    }

    async fn execute(&self, job: &ValidatedJob, trail: &mut StageTrail) -> Result<(), JobError> {
        let inner = &self.inner;

        trail.advance(JobStage::Resolving);
        let iv = inner.iv.resolve(job).await;

        trail.advance(JobStage::Fetching);
        let workspace = Workspace::create(&inner.artifact_dir, &job.job_id)
            .await
            .map_err(JobError::Workspace)?;
        let result = self.execute_in(&workspace, job, iv, trail).await;
        workspace.remove().await;
        result
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        job: &ValidatedJob,
        iv: String,
        trail: &mut StageTrail,
    ) -> Result<(), JobError> {
        let inner = &self.inner;

        let data = inner
            .store
            .fetch(&job.job_id, &job.source_url)
            .await
            .map_err(JobError::Fetch)?;
        tokio::fs::write(workspace.path().join(&job.file_name), &data)
            .await
            .map_err(JobError::Workspace)?;

        trail.advance(JobStage::Transforming);
        let args = TransformArgs {
            file: job.file_name.clone(),
            operation: job.operation.as_str().to_string(),
            mode: job.mode.as_arg().to_string(),
            key: job.key.clone(),
            iv,
            keylen: job.key_length.bits(),
        };
        inner
            .transform
            .run(&job.job_id, workspace.path(), args)
            .await?
            .into_result()?;

        trail.advance(JobStage::Uploading);
        let output_name = naming::processed_file_name(&job.file_name, job.operation);
        inner
            .store
            .publish(&job.job_id, &workspace.path().join(&output_name), &output_name)
            .await
            .map_err(JobError::Upload)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
