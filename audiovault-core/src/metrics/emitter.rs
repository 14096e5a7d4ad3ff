use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{render_payload, Labels, MetricsTransport, TransportError};

/// Best-effort metrics push. Nothing here can fail the ingestion that is
/// being reported on.
#[derive(Clone)]
pub struct MetricsEmitter {
    transport: Arc<dyn MetricsTransport>,
    timeout: Duration,
}

impl MetricsEmitter {
    pub fn new(transport: Arc<dyn MetricsTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Pushes `metrics` for `job`. Failures are logged and swallowed.
    pub async fn push(&self, job: &str, labels: &Labels, metrics: &[(&str, f64)]) {
        match self.try_push(job, labels, metrics).await {
            Ok(()) => debug!(job, id = labels.get("id").unwrap_or(""), "Metrics pushed"),
            Err(e) => warn!(
                job,
                id = labels.get("id").unwrap_or(""),
                error = %e,
                "Failed to push metrics"
            ),
        }
    }

    pub async fn try_push(
        &self,
        job: &str,
        labels: &Labels,
        metrics: &[(&str, f64)],
    ) -> Result<(), TransportError> {
        let payload = render_payload(labels, metrics);
        tokio::time::timeout(self.timeout, self.transport.send(job, payload))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(TransportError::Failed)
    }
}
