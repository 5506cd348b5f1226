//! The record store as seen by the Supervisor.

use std::path::Path;

use async_trait::async_trait;
use cipherq_relay::{RecordStoreClient, StoreUpdateError, TransferError};

/// Source and sink of job artifacts, plus the IV side channel.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download the source artifact of `job_id` from `url`.
    async fn fetch(&self, job_id: &str, url: &str) -> Result<Vec<u8>, TransferError>;

    /// Upload the processed artifact at `path` under `file_name`.
    async fn publish(&self, job_id: &str, path: &Path, file_name: &str)
        -> Result<(), TransferError>;

    /// Record a generated IV for `job_id`.
    async fn update_iv(&self, job_id: &str, iv: &str) -> Result<(), StoreUpdateError>;
}

#[async_trait]
impl ArtifactStore for RecordStoreClient {
    async fn fetch(&self, job_id: &str, url: &str) -> Result<Vec<u8>, TransferError> {
        RecordStoreClient::fetch(self, url, job_id).await
    }

    async fn publish(
        &self,
        job_id: &str,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TransferError> {
        RecordStoreClient::publish(self, job_id, path, file_name).await
    }

    async fn update_iv(&self, job_id: &str, iv: &str) -> Result<(), StoreUpdateError> {
        RecordStoreClient::update_iv(self, job_id, iv).await
    }
}
