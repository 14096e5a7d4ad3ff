//! Fault injection shared by the in-memory sinks.

use std::sync::{Arc, Mutex};

/// How an in-memory sink should respond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// Every call succeeds
    #[default]
    Healthy,
    /// Writes fail, connectivity checks still pass
    FailWrites,
    /// Only writes whose key ends with the given suffix fail (e.g. ".json")
    FailKeysEndingWith(String),
    /// Every call fails, including connectivity checks
    Unreachable,
    /// Every call blocks forever; used to exercise timeouts
    Hang,
}

/// Clones share the same behavior, so a test can flip it after the sink has
/// been handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SharedBehavior(Arc<Mutex<MockBehavior>>);

impl SharedBehavior {
    pub fn new(behavior: MockBehavior) -> Self {
        Self(Arc::new(Mutex::new(behavior)))
    }

    pub fn set(&self, behavior: MockBehavior) {
        *self.0.lock().unwrap() = behavior;
    }

    pub fn get(&self) -> MockBehavior {
        self.0.lock().unwrap().clone()
    }

    /// Decides whether a write to `key` should fail. Parks forever on `Hang`.
    pub async fn write_gate(&self, key: &str) -> anyhow::Result<()> {
        match self.get() {
            MockBehavior::Healthy => Ok(()),
            MockBehavior::FailWrites | MockBehavior::Unreachable => {
                anyhow::bail!("injected write failure for {key}")
            }
            MockBehavior::FailKeysEndingWith(suffix) if key.ends_with(&suffix) => {
                anyhow::bail!("injected write failure for {key}")
            }
            MockBehavior::FailKeysEndingWith(_) => Ok(()),
            MockBehavior::Hang => std::future::pending().await,
        }
    }

    /// Decides whether a read-only or connectivity call should fail.
    pub async fn probe_gate(&self) -> anyhow::Result<()> {
        match self.get() {
            MockBehavior::Unreachable => anyhow::bail!("injected connectivity failure"),
            MockBehavior::Hang => std::future::pending().await,
            _ => Ok(()),
        }
    }
}
