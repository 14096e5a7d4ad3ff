use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::artifact::AudioArtifact;
use crate::blob::{BlobWriter, StorageError};
use crate::catalog::{CatalogError, CatalogWriter};
use crate::metrics::{Labels, MetricsEmitter};

pub const SUCCESS_TOTAL: &str = "opentts_success_total";
pub const FAILURE_TOTAL: &str = "opentts_failure_total";
pub const DURATION_MS: &str = "opentts_duration_ms";
pub const BLOB_WRITTEN: &str = "opentts_blob_written";
pub const CATALOG_WRITTEN: &str = "opentts_catalog_written";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStatus {
    Success,
    BlobFailed,
    CatalogFailed,
    BothFailed,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BlobFailed => "blob-failure",
            Self::CatalogFailed => "catalog-failure",
            Self::BothFailed => "blob-and-catalog-failure",
        }
    }
}

/// What happened to one artifact in the background. The two sink outcomes
/// are independent; neither write is skipped because the other failed.
#[derive(Debug)]
pub struct IngestionReport {
    pub id: String,
    pub blob: Result<(), StorageError>,
    pub catalog: Result<(), CatalogError>,
    pub elapsed: Duration,
}

impl IngestionReport {
    pub fn status(&self) -> IngestionStatus {
        match (self.blob.is_ok(), self.catalog.is_ok()) {
            (true, true) => IngestionStatus::Success,
            (false, true) => IngestionStatus::BlobFailed,
            (true, false) => IngestionStatus::CatalogFailed,
            (false, false) => IngestionStatus::BothFailed,
        }
    }
}

/// The background unit of work: blob write, catalog write, then metrics.
#[derive(Clone)]
pub struct Pipeline {
    blob: BlobWriter,
    catalog: CatalogWriter,
    metrics: MetricsEmitter,
    job: String,
    service: String,
}

impl Pipeline {
    pub fn new(
        blob: BlobWriter,
        catalog: CatalogWriter,
        metrics: MetricsEmitter,
        job: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            blob,
            catalog,
            metrics,
            job: job.into(),
            service: service.into(),
        }
    }

    /// Persists `artifact` to both sinks and reports the combined outcome.
    /// `accepted_at` is when the request was acknowledged, so the duration
    /// metric covers queueing as well as the writes.
    pub async fn run(&self, artifact: AudioArtifact, accepted_at: Instant) -> IngestionReport {
        let blob = self
            .blob
            .store(&artifact.id, &artifact.audio, artifact.sidecar.as_ref())
            .await;
        if let Err(e) = &blob {
            error!(id = %artifact.id, error = %e, "Blob store write failed");
        }

        let catalog = self.catalog.insert(&artifact).await;
        if let Err(e) = &catalog {
            error!(id = %artifact.id, error = %e, "Catalog write failed");
        }

        let report = IngestionReport {
            id: artifact.id,
            blob,
            catalog,
            elapsed: accepted_at.elapsed(),
        };
        self.report(&report).await;
        report
    }

    async fn report(&self, report: &IngestionReport) {
        let status = report.status();
        let labels = Labels::new()
            .with("service", self.service.as_str())
            .with("id", report.id.as_str())
            .with("status", status.as_str());

        let outcome = if status == IngestionStatus::Success {
            SUCCESS_TOTAL
        } else {
            FAILURE_TOTAL
        };
        let metrics = [
            (outcome, 1.0),
            (DURATION_MS, report.elapsed.as_millis() as f64),
            (BLOB_WRITTEN, flag(report.blob.is_ok())),
            (CATALOG_WRITTEN, flag(report.catalog.is_ok())),
        ];
        self.metrics.push(&self.job, &labels, &metrics).await;

        info!(
            id = %report.id,
            status = status.as_str(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingestion finished"
        );
    }

    /// Reports a request that failed before an artifact existed.
    pub async fn report_unexpected_failure(&self, id: Option<&str>) {
        let labels = Labels::new()
            .with("service", self.service.as_str())
            .with("id", id.unwrap_or("unknown"))
            .with("status", "request-failure");
        self.metrics
            .push(&self.job, &labels, &[(FAILURE_TOTAL, 1.0)])
            .await;
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::blob::MemoryBlobStore;
    use crate::catalog::MemoryCatalog;
    use crate::metrics::RecordingGateway;
    use crate::mock::MockBehavior;

    struct Sinks {
        blob: MemoryBlobStore,
        catalog: MemoryCatalog,
        gateway: RecordingGateway,
        pipeline: Pipeline,
    }

    fn sinks() -> Sinks {
        let blob = MemoryBlobStore::new();
        let catalog = MemoryCatalog::new();
        let gateway = RecordingGateway::new();
        let timeout = Duration::from_millis(100);
        let pipeline = Pipeline::new(
            BlobWriter::new(Arc::new(blob.clone()), "bucket", "us-east-1", timeout),
            CatalogWriter::new(Arc::new(catalog.clone()), timeout),
            MetricsEmitter::new(Arc::new(gateway.clone()), timeout),
            "opentts",
            "audiovault",
        );
        Sinks {
            blob,
            catalog,
            gateway,
            pipeline,
        }
    }

    fn artifact(id: &str) -> AudioArtifact {
        AudioArtifact {
            id: id.to_string(),
            input: "hello".to_string(),
            provider_response: None,
            voice: "v1".to_string(),
            model: "m1".to_string(),
            audio_base64: "AAAA".to_string(),
            audio: vec![0, 0, 0],
            sidecar: None,
        }
    }

    #[tokio::test]
    async fn catalog_failure_does_not_undo_blob_write() {
        let s = sinks();
        s.catalog.set_behavior(MockBehavior::FailWrites);

        let report = s.pipeline.run(artifact("c1"), Instant::now()).await;

        assert_eq!(report.status(), IngestionStatus::CatalogFailed);
        assert!(s.blob.object("bucket", "c1.wav").is_some());
        let push = &s.gateway.pushes_for("c1")[0];
        assert_eq!(push.value(FAILURE_TOTAL), Some(1.0));
        assert_eq!(push.value(BLOB_WRITTEN), Some(1.0));
        assert_eq!(push.value(CATALOG_WRITTEN), Some(0.0));
        assert!(push.has_label("status", "catalog-failure"));
    }

    #[tokio::test]
    async fn both_failures_are_reported_together() {
        let s = sinks();
        s.blob.set_behavior(MockBehavior::Unreachable);
        s.catalog.set_behavior(MockBehavior::FailWrites);

        let report = s.pipeline.run(artifact("c2"), Instant::now()).await;

        assert_eq!(report.status(), IngestionStatus::BothFailed);
        assert!(s.gateway.pushes_for("c2")[0].has_label("status", "blob-and-catalog-failure"));
    }

    #[tokio::test]
    async fn metrics_outage_does_not_change_the_outcome() {
        let s = sinks();
        s.gateway.set_behavior(MockBehavior::Unreachable);

        let report = s.pipeline.run(artifact("c3"), Instant::now()).await;

        assert_eq!(report.status(), IngestionStatus::Success);
        assert!(s.catalog.row("c3").is_some());
    }

    #[tokio::test]
    async fn unexpected_failure_uses_unknown_id() {
        let s = sinks();
        s.pipeline.report_unexpected_failure(None).await;

        let pushes = s.gateway.pushes_for("unknown");
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].value(FAILURE_TOTAL), Some(1.0));
    }
}
