use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::error::IngestError;
use super::pipeline::Pipeline;
use super::pool::{ShutdownReport, WorkerPool};
use super::request::CreateRequest;

/// Acknowledgment returned to the caller.
///
/// This only certifies that the artifact was accepted for processing. The
/// blob and catalog writes happen afterwards in the background and their
/// outcome is visible through metrics, logs and `/health`, never through
/// this value. A client that needs durability must resubmit with the same
/// `id` on doubt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub id: String,
}

/// Front door of the ingestion pipeline: validates synchronously, then hands
/// the artifact to the bounded worker pool.
pub struct Coordinator {
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    id_generator: Box<dyn Fn() -> String + Send + Sync>,
}

impl Coordinator {
    pub fn new(pipeline: Pipeline, pool: WorkerPool) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            pool,
            id_generator: Box::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Replaces the UUID v4 generator, e.g. for deterministic tests.
    pub fn with_id_generator(
        mut self,
        generator: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.id_generator = Box::new(generator);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Validates `request`, assigns its id and schedules persistence. Returns
    /// without waiting for any write.
    pub async fn submit(&self, request: CreateRequest) -> Result<Accepted, IngestError> {
        let accepted_at = Instant::now();
        let artifact = request.into_artifact(|| (self.id_generator)())?;
        let id = artifact.id.clone();

        let pipeline = self.pipeline.clone();
        let submitted = self
            .pool
            .submit(id.clone(), async move {
                pipeline.run(artifact, accepted_at).await;
            })
            .await;

        if let Err(e) = submitted {
            warn!(id = %id, error = %e, "Ingestion rejected");
            return Err(e.into());
        }

        info!(id = %id, "Ingestion accepted");
        Ok(Accepted { id })
    }

    /// Stops accepting requests and drains in-flight work for up to `grace`.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.pool.shutdown(grace).await
    }
}
