pub mod emitter;
pub mod pushgateway;
pub mod recording;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use emitter::MetricsEmitter;
pub use pushgateway::PushGateway;
pub use recording::RecordingGateway;

/// Delivery of rendered metric payloads to a gateway.
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    /// Sends one text payload for `job`.
    async fn send(&self, job: &str, payload: String) -> Result<()>;

    /// Readiness check used by the health prober.
    async fn ready(&self) -> Result<()>;
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("metrics gateway call failed: {0}")]
    Failed(anyhow::Error),

    #[error("metrics gateway did not answer within {0:?}")]
    Timeout(Duration),
}

/// Ordered label set. Order is preserved in the rendered output so the same
/// labels always produce the same line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `key="value",key2="value2"`
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Renders one `name{labels} value` line per metric, newline terminated.
pub fn render_payload(labels: &Labels, metrics: &[(&str, f64)]) -> String {
    let label_string = labels.render();
    let mut payload = String::new();
    for (name, value) in metrics {
        payload.push_str(&format!("{name}{{{label_string}}} {value}\n"));
    }
    payload
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
