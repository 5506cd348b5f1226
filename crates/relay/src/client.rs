//! HTTP client for the record store.
//!
//! The store exposes:
//!
//! | Method  | Path                     | Body                               |
//! |---------|--------------------------|------------------------------------|
//! | `GET`   | job `sourceUrl`          | (none) -> raw file bytes           |
//! | `POST`  | `/uploadProcessedFile`   | multipart: `id` text, `file` part  |
//! | `PATCH` | `/updateIv/{jobId}`      | JSON `{"requestIv": "<hex>"}`      |
//!
//! Paths are relative to the configured base URL.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;

use crate::error::{StoreUpdateError, TransferError};
use crate::retry::RetryPolicy;

/// Longest error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// Client for one record store instance.
#[derive(Debug, Clone)]
pub struct RecordStoreClient {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl RecordStoreClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, TransferError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| TransferError::InvalidUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(TransferError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url: parsed,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Download the file at `url`. Any non-2xx response is a failure.
    pub async fn fetch(&self, url: &str, job_id: &str) -> Result<Vec<u8>, TransferError> {
        let client = &self.client;
        let bytes = self
            .retrying("fetch", job_id, move || async move {
                let response = client.get(url).send().await?;
                if !response.status().is_success() {
                    let (status, body) = error_body(response).await;
                    return Err(TransferError::HttpStatus { status, body });
                }
                Ok(response.bytes().await?.to_vec())
            })
            .await?;

        tracing::info!(job_id, url, bytes = bytes.len(), "Fetched source file");
        Ok(bytes)
    }

    /// Upload the artifact at `path` for `job_id` under `file_name`.
    ///
    /// A missing artifact fails immediately without contacting the store.
    pub async fn publish(
        &self,
        job_id: &str,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransferError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::MissingArtifact(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = data.len();

        let url = self.endpoint(&["uploadProcessedFile"]);
        let client = &self.client;
        let (url, data) = (&url, &data);
        self.retrying("publish", job_id, move || async move {
            let file = reqwest::multipart::Part::bytes(data.clone())
                .file_name(file_name.to_string())
                .mime_str("application/octet-stream")?;
            let form = reqwest::multipart::Form::new()
                .text("id", job_id.to_string())
                .part("file", file);
            let response = client.post(url.clone()).multipart(form).send().await?;
            if !response.status().is_success() {
                let (status, body) = error_body(response).await;
                return Err(TransferError::HttpStatus { status, body });
            }
            Ok(())
        })
        .await?;

        tracing::info!(job_id, file_name, bytes = size, "Published processed file");
        Ok(())
    }

    /// Record `iv` as the IV of `job_id`. Single attempt.
    pub async fn update_iv(&self, job_id: &str, iv: &str) -> Result<(), StoreUpdateError> {
        let url = self.endpoint(&["updateIv", job_id]);
        let response = self
            .client
            .patch(url)
            .json(&serde_json::json!({ "requestIv": iv }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(StoreUpdateError::HttpStatus { status, body });
        }

        tracing::info!(job_id, "Recorded generated IV");
        Ok(())
    }

    // ---- private helpers ----

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Construction rejected cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Run `attempt` until it succeeds, fails permanently or the retry
    /// budget is spent.
    async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        job_id: &str,
        mut attempt: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let mut delay = self.retry.initial_delay;
        let mut tries = 0u32;

        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => {
                    if tries > 1 {
                        tracing::info!(job_id, operation, attempt = tries, "Transfer succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && tries <= self.retry.retries => {
                    tracing::warn!(
                        job_id,
                        operation,
                        attempt = tries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transfer attempt failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.retry.next_delay(delay);
                }
                Err(e) => {
                    tracing::error!(job_id, operation, attempt = tries, error = %e, "Transfer failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Status code and (truncated) body of a failed response.
async fn error_body(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    (status, body)
}
