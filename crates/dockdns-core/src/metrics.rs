//! Metrics instrumentation.
//!
//! All metrics are prefixed with `dockdns.` and emitted through the
//! `metrics` facade; the embedding process decides on an exporter.

use metrics::{counter, gauge};
use std::collections::HashMap;

use crate::record::{RecordState, TrackedRecord};

/// Record a successful record creation for a provider.
pub fn record_created(provider: &str) {
    counter!("dockdns.records.created.count", "provider" => provider.to_string()).increment(1);
}

/// Record a successful record deletion for a provider.
pub fn record_deleted(provider: &str) {
    counter!("dockdns.records.deleted.count", "provider" => provider.to_string()).increment(1);
}

/// Record a failed adapter operation.
pub fn record_error(provider: &str, operation: &str) {
    counter!(
        "dockdns.records.errors.count",
        "provider" => provider.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Recompute the tracked-records gauge from a full inventory snapshot.
///
/// Providers with no records are zero-filled so a drained provider does
/// not keep reporting its last non-zero value.
pub fn observe_inventory(records: &[TrackedRecord], provider_names: &[&str]) {
    let mut counts: HashMap<(&str, RecordState), usize> = HashMap::new();
    for record in records {
        *counts
            .entry((record.provider_name.as_str(), record.state))
            .or_default() += 1;
    }

    const STATES: [RecordState; 3] = [
        RecordState::Pending,
        RecordState::Present,
        RecordState::Error,
    ];

    for provider in provider_names {
        for state in STATES {
            let count = counts.get(&(*provider, state)).copied().unwrap_or(0);
            gauge!(
                "dockdns.records.tracked.count",
                "provider" => provider.to_string(),
                "state" => state.as_str()
            )
            .set(count as f64);
        }
    }
}
