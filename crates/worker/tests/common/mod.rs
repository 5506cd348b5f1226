#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cipherq_core::naming;
use cipherq_core::result::ResultMessage;
use cipherq_core::topics::RESULT_TOPIC;
use cipherq_core::transform::{ProcessError, TransformArgs, TransformOutcome};
use cipherq_core::Operation;
use cipherq_events::{LocalBus, MessageBus};
use cipherq_relay::{StoreUpdateError, TransferError};
use cipherq_worker::{ArtifactStore, ProcessTransform, Supervisor, Transform, WorkerConfig};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub type EventLog = Arc<Mutex<Vec<String>>>;

// ---------------------------------------------------------------------------
// Fake record store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Upload {
    pub job_id: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// In-memory record store. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeStore {
    pub log: EventLog,
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub iv_updates: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub fn with_file(url: &str, data: &[u8]) -> Self {
        let store = Self::default();
        store
            .files
            .lock()
            .unwrap()
            .insert(url.to_string(), data.to_vec());
        store
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn iv_updates(&self) -> Vec<(String, String)> {
        self.iv_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn fetch(&self, job_id: &str, url: &str) -> Result<Vec<u8>, TransferError> {
        self.log.lock().unwrap().push(format!("fetch:{job_id}"));
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransferError::HttpStatus {
                status: 404,
                body: "not found".into(),
            })
    }

    async fn publish(
        &self,
        job_id: &str,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransferError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(_) => return Err(TransferError::MissingArtifact(path.to_path_buf())),
        };
        self.log.lock().unwrap().push(format!("upload:{job_id}"));
        self.uploads.lock().unwrap().push(Upload {
            job_id: job_id.to_string(),
            file_name: file_name.to_string(),
            data,
        });
        Ok(())
    }

    async fn update_iv(&self, job_id: &str, iv: &str) -> Result<(), StoreUpdateError> {
        self.log.lock().unwrap().push(format!("iv:{job_id}"));
        self.iv_updates
            .lock()
            .unwrap()
            .push((job_id.to_string(), iv.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// A `ProcessTransform` running `body` through `sh`.
///
/// In the script `$2` is the input file name and `$@` the full flag list.
pub fn script_transform(dir: &Path, body: &str, timeout: Duration) -> ProcessTransform {
    let script = dir.join("transform.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}")).unwrap();
    ProcessTransform::new(vec!["sh".into()], script, timeout)
}

/// Script that records its flags to `record` and writes the processed file.
pub fn recording_script(record: &Path) -> String {
    format!(
        "echo \"$@\" >> '{}'\n\
         case \"$4\" in\n  encrypt) cp \"$2\" \"$2.out\" ;;\n  decrypt) cp \"$2\" \"${{2%.out}}\" ;;\nesac\n",
        record.display()
    )
}

/// Wraps a transform and logs `transform:<jobId>` before each run.
pub struct LoggedTransform<T> {
    pub inner: T,
    pub log: EventLog,
}

#[async_trait]
impl<T: Transform> Transform for LoggedTransform<T> {
    async fn run(
        &self,
        job_id: &str,
        workspace: &Path,
        args: TransformArgs,
    ) -> Result<TransformOutcome, ProcessError> {
        self.log.lock().unwrap().push(format!("transform:{job_id}"));
        self.inner.run(job_id, workspace, args).await
    }
}

/// In-process transform that tracks how many runs overlap.
#[derive(Default)]
pub struct CountingTransform {
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub runs: AtomicUsize,
    pub delay: Duration,
}

impl CountingTransform {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transform for CountingTransform {
    async fn run(
        &self,
        _job_id: &str,
        workspace: &Path,
        args: TransformArgs,
    ) -> Result<TransformOutcome, ProcessError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let operation = Operation::parse(&args.operation).unwrap_or(Operation::Encrypt);
        let output = workspace.join(naming::processed_file_name(&args.file, operation));
        let input = std::fs::read(workspace.join(&args.file))?;
        std::fs::write(output, input)?;

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(TransformOutcome {
            exit_code: 0,
            duration_ms: self.delay.as_millis() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub bus: Arc<LocalBus>,
    pub store: Arc<FakeStore>,
    pub supervisor: Supervisor,
    pub results: mpsc::UnboundedReceiver<ResultMessage>,
    pub artifacts: TempDir,
}

impl Harness {
    pub async fn new(store: FakeStore, transform: Arc<dyn Transform>) -> Self {
        Self::with_pool(store, transform, 4, 4).await
    }

    pub async fn with_pool(
        store: FakeStore,
        transform: Arc<dyn Transform>,
        pool_size: usize,
        queue_depth: usize,
    ) -> Self {
        let artifacts = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            artifact_dir: artifacts.path().to_path_buf(),
            pool_size,
            queue_depth,
            ..Default::default()
        };
        let bus = Arc::new(LocalBus::default());
        let store = Arc::new(store);
        let supervisor = Supervisor::new(&config, bus.clone(), store.clone(), transform);
        let results = collect_results(&bus, store.log.clone()).await;

        Self {
            bus,
            store,
            supervisor,
            results,
            artifacts,
        }
    }

    pub fn artifact_root(&self) -> PathBuf {
        self.artifacts.path().to_path_buf()
    }

    /// Next Result Message, failing the test after five seconds.
    pub async fn next_result(&mut self) -> ResultMessage {
        tokio::time::timeout(Duration::from_secs(5), self.results.recv())
            .await
            .expect("timed out waiting for a result")
            .expect("result channel closed")
    }

    /// Assert no Result Message arrives within a short window.
    pub async fn assert_no_result(&mut self) {
        let waited = tokio::time::timeout(Duration::from_millis(200), self.results.recv()).await;
        assert!(waited.is_err(), "unexpected result: {waited:?}");
    }
}

/// Subscribe to the result topic and forward decoded results, logging each
/// one as `result:<jobId>`.
pub async fn collect_results(
    bus: &LocalBus,
    log: EventLog,
) -> mpsc::UnboundedReceiver<ResultMessage> {
    let mut sub = bus.subscribe(RESULT_TOPIC).await.unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(payload) = sub.recv().await {
            let result = ResultMessage::from_payload(&payload).unwrap();
            log.lock().unwrap().push(format!("result:{}", result.job_id));
            if tx.send(result).is_err() {
                break;
            }
        }
    });
    rx
}

/// A valid Job Message payload.
pub fn job_payload(id: &str, file: &str, mode: &str, operation: &str, iv: &str) -> String {
    serde_json::json!({
        "jobId": id,
        "sourceUrl": format!("http://files/{file}"),
        "fileName": file,
        "keyLengthBits": 128,
        "key": "0123456789abcdef",
        "mode": mode,
        "operation": operation,
        "iv": iv,
    })
    .to_string()
}
