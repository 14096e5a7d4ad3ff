//! Bounded execution of background ingestion tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

use super::error::PoolError;

/// Caps the number of ingestion tasks running at once.
///
/// A submission waits up to `queue_timeout` for a free slot and is then
/// rejected with `PoolError::Saturated`; a zero timeout rejects immediately.
/// Tasks are counted per artifact id so anything still running when shutdown
/// gives up can be reported for reconciliation. A resubmitted id that is
/// still running is counted twice.
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
    closing: AtomicBool,
    in_flight: InFlight,
}

type InFlight = Arc<Mutex<HashMap<String, usize>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Ids still running when the grace period ran out, sorted and
    /// deduplicated.
    pub abandoned: Vec<String>,
}

impl WorkerPool {
    pub fn new(capacity: usize, queue_timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
            closing: AtomicBool::new(false),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of running tasks, counting repeated ids separately.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Schedules `task` once a slot is free. Returns as soon as the task has
    /// been spawned; it never waits for the task itself.
    pub async fn submit<F>(&self, id: String, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closing.load(Ordering::SeqCst) {
            return Err(PoolError::ShuttingDown);
        }

        let permit = self.acquire().await?;

        // Shutdown may have started while this submission was queued.
        if self.closing.load(Ordering::SeqCst) {
            return Err(PoolError::ShuttingDown);
        }

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .and_modify(|count| *count += 1)
            .or_insert(1);
        let guard = InFlightGuard {
            id,
            in_flight: self.in_flight.clone(),
            _permit: permit,
        };

        tokio::spawn(async move {
            task.await;
            drop(guard);
        });
        Ok(())
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, PoolError> {
        let saturated = PoolError::Saturated {
            capacity: self.capacity,
        };

        if self.queue_timeout.is_zero() {
            return self.slots.clone().try_acquire_owned().map_err(|e| match e {
                tokio::sync::TryAcquireError::Closed => PoolError::ShuttingDown,
                tokio::sync::TryAcquireError::NoPermits => saturated,
            });
        }

        match tokio::time::timeout(self.queue_timeout, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(PoolError::ShuttingDown),
            Err(_elapsed) => Err(saturated),
        }
    }

    /// Stops accepting work and waits up to `grace` for running tasks.
    /// Tasks still running afterwards are left to die with the runtime; their
    /// ids are logged and returned.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.closing.store(true, Ordering::SeqCst);
        info!(in_flight = self.in_flight(), ?grace, "Draining ingestion tasks");

        let all_slots = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        let drained = tokio::time::timeout(grace, self.slots.acquire_many(all_slots)).await;
        self.slots.close();

        match drained {
            Ok(_) => {
                info!("All ingestion tasks finished");
                ShutdownReport::default()
            }
            Err(_) => {
                let mut abandoned: Vec<String> = self
                    .in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .keys()
                    .cloned()
                    .collect();
                abandoned.sort();
                for id in &abandoned {
                    warn!(id = %id, "Abandoning in-flight ingestion at shutdown");
                }
                ShutdownReport { abandoned }
            }
        }
    }
}

/// Releases the task's slot and id however the task ends, panics included.
struct InFlightGuard {
    id: String,
    in_flight: InFlight,
    _permit: OwnedSemaphorePermit,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = in_flight.get_mut(&self.id) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn rejects_when_full_and_queue_timeout_is_zero() {
        let pool = WorkerPool::new(1, Duration::ZERO);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        pool.submit("a".to_string(), async move {
            let _ = release_rx.await;
        })
        .await
        .unwrap();

        let err = pool.submit("b".to_string(), async {}).await.unwrap_err();
        assert_eq!(err, PoolError::Saturated { capacity: 1 });

        release_tx.send(()).unwrap();
        assert!(pool.shutdown(Duration::from_secs(1)).await.abandoned.is_empty());
    }

    #[tokio::test]
    async fn queued_submission_runs_once_a_slot_frees() {
        let pool = WorkerPool::new(1, Duration::from_secs(1));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        pool.submit("a".to_string(), async move {
            let _ = release_rx.await;
        })
        .await
        .unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = release_tx.send(());
        });

        pool.submit("b".to_string(), async move {
            let _ = done_tx.send(());
        })
        .await
        .unwrap();

        done_rx.await.unwrap();
    }

    #[tokio::test]
    async fn queue_timeout_rejects_with_saturated() {
        let pool = WorkerPool::new(1, Duration::from_millis(20));
        pool.submit("a".to_string(), std::future::pending())
            .await
            .unwrap();

        let err = pool.submit("b".to_string(), async {}).await.unwrap_err();
        assert_eq!(err, PoolError::Saturated { capacity: 1 });
    }

    #[tokio::test]
    async fn shutdown_reports_abandoned_ids_and_refuses_new_work() {
        let pool = WorkerPool::new(4, Duration::ZERO);
        pool.submit("stuck-2".to_string(), std::future::pending())
            .await
            .unwrap();
        pool.submit("stuck-1".to_string(), std::future::pending())
            .await
            .unwrap();
        pool.submit("quick".to_string(), async {}).await.unwrap();

        let report = pool.shutdown(Duration::from_millis(50)).await;
        assert_eq!(report.abandoned, vec!["stuck-1", "stuck-2"]);

        let err = pool.submit("late".to_string(), async {}).await.unwrap_err();
        assert_eq!(err, PoolError::ShuttingDown);
    }

    #[tokio::test]
    async fn slot_is_released_when_a_task_panics() {
        let pool = WorkerPool::new(1, Duration::from_secs(1));
        pool.submit("boom".to_string(), async { panic!("task failed") })
            .await
            .unwrap();

        let (done_tx, done_rx) = oneshot::channel::<()>();
        pool.submit("next".to_string(), async move {
            let _ = done_tx.send(());
        })
        .await
        .unwrap();
        done_rx.await.unwrap();
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn resubmitted_id_stays_tracked_until_its_last_task_ends() {
        let pool = WorkerPool::new(4, Duration::ZERO);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        pool.submit("dup".to_string(), async move {
            let _ = release_rx.await;
            let _ = done_tx.send(());
        })
        .await
        .unwrap();
        pool.submit("dup".to_string(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(pool.in_flight(), 2);

        release_tx.send(()).unwrap();
        done_rx.await.unwrap();
        // The finished task's guard is dropped in the same poll that sent `done`.
        tokio::task::yield_now().await;
        assert_eq!(pool.in_flight(), 1);

        let report = pool.shutdown(Duration::from_millis(50)).await;
        assert_eq!(report.abandoned, vec!["dup"]);
    }
}
