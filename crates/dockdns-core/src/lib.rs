// # dockdns-core
//
// Core library for label-driven DNS reconciliation of container
// workloads.
//
// ## Architecture Overview
//
// - **labels**: pure extraction of per-workload sync intents from labels
// - **Manager**: the reconciliation core — owns the record inventory,
//   resolves zone authority, invokes provider adapters
// - **ZoneAdapter**: capability contract (append/set/delete) each
//   provider implements
// - **Watcher**: debounced workload lifecycle event dispatch
// - **Driver**: the periodic + event-driven loop tying it all together
//
// ## Design Principles
//
// 1. Providers are injected explicitly; there is no global registry
// 2. The inventory records applied intent, not provider ground truth
// 3. No in-process retries: the periodic pass is the retry
// 4. Batch operations are best-effort and report failures jointly

pub mod config;
pub mod driver;
pub mod error;
pub mod labels;
pub mod manager;
pub mod metrics;
pub mod provider;
pub mod record;
pub mod watcher;
pub mod zone;

// Re-export core types for convenience
pub use config::{Config, ProviderConfig};
pub use driver::{Driver, WorkloadSource};
pub use error::{Error, Result};
pub use labels::{DEFAULT_LABEL_PREFIX, compute_desired_state};
pub use manager::Manager;
pub use provider::{Provider, ZoneAdapter};
pub use record::{
    AppliedRecord, DEFAULT_TTL_SECS, RecordState, RecordType, SyncIntent, TrackedRecord, Workload,
    ZoneRecord,
};
pub use watcher::{Event, EventFilters, EventKind, EventSource, Watcher, WatcherOptions};
