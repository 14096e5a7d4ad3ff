use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::MetricsTransport;
use crate::mock::{MockBehavior, SharedBehavior};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPush {
    pub job: String,
    pub payload: String,
}

impl RecordedPush {
    /// Looks up the value of `metric` in this payload, ignoring labels.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.payload.lines().find_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let name = series.split('{').next()?;
            (name == metric).then(|| value.parse().ok()).flatten()
        })
    }

    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.payload.contains(&format!("{key}=\"{value}\""))
    }
}

/// Metrics transport that keeps every push in memory.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    pushes: Arc<Mutex<Vec<RecordedPush>>>,
    behavior: SharedBehavior,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior: SharedBehavior::new(behavior),
            ..Self::default()
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.behavior.set(behavior);
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.pushes.lock().unwrap().clone()
    }

    /// Pushes whose labels carry `id="{id}"`.
    pub fn pushes_for(&self, id: &str) -> Vec<RecordedPush> {
        self.pushes()
            .into_iter()
            .filter(|p| p.has_label("id", id))
            .collect()
    }
}

#[async_trait]
impl MetricsTransport for RecordingGateway {
    async fn send(&self, job: &str, payload: String) -> Result<()> {
        self.behavior.write_gate(job).await?;
        self.pushes.lock().unwrap().push(RecordedPush {
            job: job.to_string(),
            payload,
        });
        Ok(())
    }

    async fn ready(&self) -> Result<()> {
        self.behavior.probe_gate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_finds_metric_by_name() {
        let push = RecordedPush {
            job: "opentts".to_string(),
            payload: "a_total{id=\"1\"} 1\nb_ms{id=\"1\"} 42\n".to_string(),
        };
        assert_eq!(push.value("a_total"), Some(1.0));
        assert_eq!(push.value("b_ms"), Some(42.0));
        assert_eq!(push.value("c"), None);
        assert!(push.has_label("id", "1"));
    }
}
