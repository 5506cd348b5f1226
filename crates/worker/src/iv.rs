//! IV Resolver.

use std::sync::Arc;

use cipherq_core::iv;
use cipherq_core::job::ValidatedJob;

use crate::store::ArtifactStore;

/// Picks the IV handed to the transform, generating one when needed.
#[derive(Clone)]
pub struct IvResolver {
    store: Arc<dyn ArtifactStore>,
}

impl IvResolver {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Resolve the IV for `job`.
    ///
    /// Modes without an IV get an empty string. A supplied IV is used
    /// unchanged. Otherwise a fresh IV is generated and reported to the
    /// record store; a failed report is logged and the fresh IV is still
    /// used.
    pub async fn resolve(&self, job: &ValidatedJob) -> String {
        if !job.mode.requires_iv() {
            return String::new();
        }
        if let Some(supplied) = &job.iv {
            return supplied.clone();
        }

        let generated = iv::generate_iv();
        match self.store.update_iv(&job.job_id, &generated).await {
            Ok(()) => tracing::info!(job_id = %job.job_id, "Generated IV recorded"),
            Err(e) => tracing::warn!(
                job_id = %job.job_id,
                error = %e,
                "Failed to record generated IV, continuing",
            ),
        }
        generated
    }
}
