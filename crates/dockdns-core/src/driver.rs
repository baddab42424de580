//! Reconciliation driver.
//!
//! The manager has no background tasks of its own; this loop drives it.
//! Every tick of the reconcile interval — and every debounced lifecycle
//! event — triggers a full pass: list workloads, extract the desired
//! state, sync it, refresh the gauges. Terminal events (die, destroy,
//! remove) additionally purge the departed workload's records before the
//! pass runs.
//!
//! Errors inside a pass are logged and the loop keeps running; the next
//! pass retries naturally.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::labels;
use crate::manager::Manager;
use crate::record::Workload;
use crate::watcher::{Event, is_terminal_action};

/// Boundary to the runtime's workload listing.
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    /// List all workloads currently known to the runtime, running or not.
    async fn workloads(&self) -> Result<Vec<Workload>>;
}

#[async_trait]
impl<T: WorkloadSource + ?Sized> WorkloadSource for Arc<T> {
    async fn workloads(&self) -> Result<Vec<Workload>> {
        (**self).workloads().await
    }
}

/// Periodic + event-driven reconciliation loop.
pub struct Driver<W> {
    manager: Arc<Manager>,
    workloads: W,
    label_prefix: String,
    reconcile_interval: Duration,
}

impl<W: WorkloadSource> Driver<W> {
    /// Create a driver.
    pub fn new(
        manager: Arc<Manager>,
        workloads: W,
        label_prefix: impl Into<String>,
        reconcile_interval: Duration,
    ) -> Self {
        Self {
            manager,
            workloads,
            label_prefix: labels::normalize_prefix(&label_prefix.into()),
            reconcile_interval,
        }
    }

    /// Run the loop until the event channel closes and the shutdown
    /// signal fires.
    pub async fn run(&self, events: mpsc::Receiver<Event>) -> Result<()> {
        self.run_with_shutdown(events, None).await
    }

    /// Run with an optional programmatic shutdown signal.
    ///
    /// Tests use the oneshot to stop the loop deterministically; the
    /// daemon passes the signal future it builds from SIGTERM/SIGINT.
    pub async fn run_with_shutdown(
        &self,
        mut events: mpsc::Receiver<Event>,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut events_open = true;

        // A missing shutdown signal never resolves.
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.reconcile_interval.as_secs(),
            "reconciliation driver started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reconcile_once().await;
                }
                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            debug!("event channel closed, continuing timer-only");
                            events_open = false;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, driver stopping");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_event(&self, event: Event) {
        debug!(id = %event.id, action = %event.action, "lifecycle event");

        if is_terminal_action(&event.action)
            && let Err(err) = self.manager.delete_records_for_source(&event.id).await
        {
            error!(source = %event.id, error = %err, "cleanup after terminal event failed");
        }

        self.reconcile_once().await;
    }

    /// One full reconcile pass. Failures are logged, never fatal.
    pub async fn reconcile_once(&self) {
        let workloads = match self.workloads.workloads().await {
            Ok(workloads) => workloads,
            Err(err) => {
                error!(error = %err, "workload listing failed, skipping pass");
                return;
            }
        };

        let intents = labels::compute_desired_state(&workloads, &self.label_prefix);
        debug!(
            workloads = workloads.len(),
            intents = intents.len(),
            "reconcile pass"
        );

        if let Err(err) = self.manager.sync(intents).await {
            error!(error = %err, "sync pass completed with failures");
        }

        self.manager.update_metrics().await;
    }
}
