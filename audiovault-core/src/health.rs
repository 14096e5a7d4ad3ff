//! Connectivity checks for the three external sinks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::catalog::Catalog;
use crate::metrics::MetricsTransport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub postgres: bool,
    pub minio: bool,
    pub pushgateway: bool,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.postgres && self.minio && self.pushgateway
    }
}

#[derive(Clone)]
pub struct HealthProber {
    catalog: Arc<dyn Catalog>,
    blob: Arc<dyn BlobStore>,
    metrics: Arc<dyn MetricsTransport>,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        blob: Arc<dyn BlobStore>,
        metrics: Arc<dyn MetricsTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            blob,
            metrics,
            timeout,
        }
    }

    /// Runs all three probes concurrently. A probe that errors or exceeds the
    /// timeout reports `false` for its own sink only. No retries.
    pub async fn probe(&self) -> HealthReport {
        let (postgres, minio, pushgateway) = tokio::join!(
            check("postgres", self.timeout, async {
                self.catalog.ping().await.map_err(anyhow::Error::from)
            }),
            check("minio", self.timeout, async {
                self.blob.list_buckets().await.map(|_| ())
            }),
            check("pushgateway", self.timeout, self.metrics.ready()),
        );

        HealthReport {
            postgres,
            minio,
            pushgateway,
        }
    }
}

async fn check(
    sink: &str,
    timeout: Duration,
    probe: impl Future<Output = anyhow::Result<()>>,
) -> bool {
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(())) => {
            info!(sink, "Connectivity check passed");
            true
        }
        Ok(Err(e)) => {
            warn!(sink, error = %e, "Connectivity check failed");
            false
        }
        Err(_) => {
            warn!(sink, ?timeout, "Connectivity check timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::catalog::MemoryCatalog;
    use crate::metrics::RecordingGateway;
    use crate::mock::MockBehavior;

    #[tokio::test]
    async fn reports_each_sink_independently() {
        let catalog = MemoryCatalog::new();
        let blob = MemoryBlobStore::with_behavior(MockBehavior::Unreachable);
        let gateway = RecordingGateway::with_behavior(MockBehavior::Hang);

        let prober = HealthProber::new(
            Arc::new(catalog),
            Arc::new(blob),
            Arc::new(gateway),
            Duration::from_millis(50),
        );

        let report = prober.probe().await;
        assert_eq!(
            report,
            HealthReport {
                postgres: true,
                minio: false,
                pushgateway: false,
            }
        );
        assert!(!report.all_healthy());
    }
}
