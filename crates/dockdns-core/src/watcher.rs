//! Workload lifecycle watcher with debounce.
//!
//! The watcher multiplexes an event stream and an error stream from an
//! [`EventSource`] into one outgoing channel, suppressing bursts: an
//! event is dropped when another event with the same (kind, id) key was
//! accepted less than the debounce interval earlier.
//!
//! One dispatch loop runs per watcher session. The loop ends when the
//! source closes either stream, when the source reports an error, or when
//! the consumer drops the outgoing receiver.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::error::Error;

/// Debounce bookkeeping is swept once the key map outgrows this many
/// entries, evicting keys whose last event is older than the window.
const DEBOUNCE_SWEEP_THRESHOLD: usize = 1024;

/// Capacity of the outgoing event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Kind of workload a lifecycle event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A standalone container
    Container,
    /// A swarm service
    Service,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Container => f.write_str("container"),
            EventKind::Service => f.write_str("service"),
        }
    }
}

/// A workload lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Workload id the event refers to
    pub id: String,
    /// Workload name, when the runtime reports one
    pub name: String,
    /// What kind of workload this is
    pub kind: EventKind,
    /// Lifecycle action (create, start, stop, die, destroy, remove, update)
    pub action: String,
    /// Extra runtime-specific attributes
    pub attributes: HashMap<String, String>,
    /// When the runtime observed the event
    pub time: DateTime<Utc>,
}

/// Lifecycle actions that terminate a workload and should trigger
/// record cleanup for its source id.
pub fn is_terminal_action(action: &str) -> bool {
    matches!(action, "die" | "destroy" | "remove")
}

/// Subscription filters handed to the event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilters {
    /// Workload kinds to subscribe to
    pub kinds: Vec<EventKind>,
    /// Lifecycle actions to subscribe to
    pub actions: Vec<String>,
}

/// Watcher tuning knobs
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Also subscribe to swarm service events
    pub include_swarm: bool,
    /// Suppress same-key events arriving within this interval.
    /// Zero disables debouncing.
    pub debounce: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            include_swarm: false,
            debounce: Duration::from_secs(2),
        }
    }
}

/// Boundary to the runtime's event feed.
///
/// Implementations return two streams: lifecycle events and feed errors.
/// Both must be cancellation-safe; dropping them ends the subscription.
pub trait EventSource: Send + Sync {
    /// Open a subscription matching the given filters.
    fn events(
        &self,
        filters: EventFilters,
    ) -> (
        Pin<Box<dyn Stream<Item = Event> + Send + 'static>>,
        Pin<Box<dyn Stream<Item = Error> + Send + 'static>>,
    );
}

/// Debouncing dispatch loop over an [`EventSource`].
pub struct Watcher<S> {
    source: S,
    opts: WatcherOptions,
    now: fn() -> DateTime<Utc>,
    last_event: HashMap<(EventKind, String), DateTime<Utc>>,
}

impl<S: EventSource + 'static> Watcher<S> {
    /// Create a watcher over an event source.
    pub fn new(source: S, opts: WatcherOptions) -> Self {
        Self {
            source,
            opts,
            now: Utc::now,
            last_event: HashMap::new(),
        }
    }

    /// Replace the clock used for sweep decisions.
    #[cfg(test)]
    pub(crate) fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Start the dispatch loop on a background task.
    ///
    /// Returns the debounced event channel and the error channel. The
    /// loop runs until the source ends or the event receiver is dropped.
    pub fn run(self) -> (mpsc::Receiver<Event>, mpsc::Receiver<Error>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.dispatch(event_tx, err_tx).await;
        });

        (event_rx, err_rx)
    }

    async fn dispatch(mut self, event_tx: mpsc::Sender<Event>, err_tx: mpsc::Sender<Error>) {
        let filters = build_event_filters(&self.opts);
        let (mut events, mut errors) = self.source.events(filters);

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        debug!("event stream closed, watcher session ending");
                        return;
                    };

                    if !self.should_emit(&event) {
                        trace!(id = %event.id, action = %event.action, "event debounced");
                        continue;
                    }

                    if event_tx.send(event).await.is_err() {
                        // Consumer is gone.
                        return;
                    }
                }
                err = errors.next() => {
                    if let Some(err) = err {
                        let _ = err_tx.send(err).await;
                    }
                    debug!("error stream signaled, watcher session ending");
                    return;
                }
            }
        }
    }

    /// Debounce decision: accept unless an event with the same
    /// (kind, id) key was accepted within the debounce window.
    fn should_emit(&mut self, event: &Event) -> bool {
        if self.opts.debounce.is_zero() {
            return true;
        }
        if event.id.is_empty() {
            return true;
        }

        let key = (event.kind, event.id.clone());
        let when = event.time;
        let window = chrono::Duration::from_std(self.opts.debounce)
            .unwrap_or_else(|_| chrono::Duration::seconds(2));

        if let Some(last) = self.last_event.get(&key)
            && when.signed_duration_since(*last) < window
        {
            return false;
        }

        if self.last_event.len() >= DEBOUNCE_SWEEP_THRESHOLD {
            let horizon = (self.now)() - window;
            self.last_event.retain(|_, seen| *seen > horizon);
        }

        self.last_event.insert(key, when);
        true
    }
}

/// Build the subscription filters for the configured options.
pub fn build_event_filters(opts: &WatcherOptions) -> EventFilters {
    let mut kinds = vec![EventKind::Container];
    if opts.include_swarm {
        kinds.push(EventKind::Service);
    }

    EventFilters {
        kinds,
        actions: ["create", "start", "stop", "die", "destroy", "remove", "update"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}
