//! Reconciliation manager.
//!
//! The manager owns the authoritative in-memory record inventory and
//! turns sync intents into provider adapter calls:
//!
//! ```text
//! events ──▶ debounce ──▶ driver ──▶ compute_desired_state
//!                                          │
//!                                          ▼
//!                                   Manager::sync
//!                                          │
//!                          resolve zone, build record
//!                                          │
//!                                          ▼
//!                                  ZoneAdapter call
//!                                          │
//!                            inventory update (present/error)
//! ```
//!
//! ## Locking
//!
//! One reader/writer lock guards the inventory. Snapshots take the shared
//! lock; every mutating operation holds the exclusive lock for the full
//! duration of its outbound adapter call, so adapter calls are serialized
//! globally — including across independent providers. Per-provider or
//! per-key sharding is the documented future path if contention is ever
//! measured. The provider map itself is built once at construction and
//! never changes, so it lives outside the lock.
//!
//! ## Failure policy
//!
//! Batch operations are best-effort: every entry is attempted, individual
//! failures are collected, and the batch returns them jointly. Failed
//! creates stay in the inventory in the error state with the attempted
//! value, so the next reconcile pass retries them naturally — the engine
//! itself never retries or backs off.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::provider::Provider;
use crate::record::{
    DEFAULT_TTL_SECS, RecordState, SyncIntent, TrackedRecord, ZoneRecord, record_key,
};
use crate::zone;

/// Reconciliation manager: provider map plus tracked-record inventory.
pub struct Manager {
    providers: HashMap<String, Provider>,
    records: RwLock<HashMap<String, TrackedRecord>>,
}

impl Manager {
    /// Create a manager over an explicit set of providers.
    ///
    /// Later entries with a duplicate name replace earlier ones;
    /// configuration validation rejects duplicates before they get here.
    pub fn new(providers: Vec<Provider>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        Self {
            providers,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Names of all configured providers.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Apply a batch of sync intents.
    ///
    /// Intents are deduplicated by (hostname, provider) key, keeping the
    /// intent with the latest `requested_at`; identical timestamps are
    /// broken deterministically in favor of the lexicographically greater
    /// `source_id`. Every surviving intent is attempted; failures are
    /// collected and returned jointly after the batch completes.
    pub async fn sync(&self, intents: Vec<SyncIntent>) -> Result<()> {
        let desired = dedup_intents(intents);

        let mut guard = self.records.write().await;
        let mut errors = Vec::new();

        for (key, intent) in desired {
            if let Err(err) = self.apply_locked(&mut guard, intent).await {
                warn!(%key, error = %err, "sync: create/update failed");
                errors.push(err);
            }
        }

        Error::from_batch(errors)
    }

    /// Create or update a single record from an intent.
    pub async fn create_record(&self, intent: SyncIntent) -> Result<()> {
        let mut guard = self.records.write().await;
        self.apply_locked(&mut guard, intent).await
    }

    /// Create-or-update under the exclusive lock.
    async fn apply_locked(
        &self,
        records: &mut HashMap<String, TrackedRecord>,
        intent: SyncIntent,
    ) -> Result<()> {
        let hostname = intent.hostname.trim().to_lowercase();
        let provider = self
            .providers
            .get(&intent.provider_name)
            .ok_or_else(|| Error::provider_not_found(&intent.provider_name))?;

        if !zone::hostname_authorized(&hostname, provider.zone_filters()) {
            return Err(Error::zone_unauthorized(&hostname, provider.name()));
        }

        let zone = zone::resolve_zone(&hostname, provider.zone_filters())
            .ok_or_else(|| Error::ZoneUndetermined(hostname.clone()))?;

        let ttl = intent.ttl.unwrap_or(DEFAULT_TTL_SECS);

        // CNAME/alias targets are not supported on this path.
        let ip: std::net::IpAddr = intent
            .target
            .parse()
            .map_err(|_| Error::InvalidTarget(intent.target.clone()))?;

        let record = ZoneRecord::Address {
            name: zone::relative_name(&hostname, &zone),
            ip,
            ttl: Some(ttl),
        };

        let key = record_key(&hostname, provider.name());
        let applied = provider
            .adapter()
            .append_records(&zone, vec![record])
            .await;

        match applied {
            Err(err) => {
                // Keep the attempted value so the failure is visible and
                // the next pass retries it.
                records.insert(
                    key,
                    tracked_from_intent(&intent, &hostname, ttl, RecordState::Error, None),
                );
                metrics::record_error(provider.name(), "append");
                Err(Error::adapter(provider.name(), "append", err))
            }
            Ok(applied) => {
                let provider_id = applied.first().and_then(|a| a.provider_id.clone());
                debug!(
                    hostname = %hostname,
                    provider = provider.name(),
                    record_type = %intent.record_type,
                    "record applied"
                );
                records.insert(
                    key,
                    tracked_from_intent(&intent, &hostname, ttl, RecordState::Present, provider_id),
                );
                metrics::record_created(provider.name());
                Ok(())
            }
        }
    }

    /// Delete the tracked record for a (hostname, provider) key.
    ///
    /// A key with no tracked record is a successful no-op. The inventory
    /// entry is removed only after the adapter's delete call succeeds.
    pub async fn delete_record(
        &self,
        hostname: &str,
        provider_name: &str,
        source_id: &str,
    ) -> Result<()> {
        let hostname = hostname.trim().to_lowercase();
        let key = record_key(&hostname, provider_name);

        let mut guard = self.records.write().await;
        if !guard.contains_key(&key) {
            return Ok(());
        }
        self.delete_locked(&mut guard, &key, source_id).await
    }

    /// Delete under the exclusive lock. The caller has checked presence.
    async fn delete_locked(
        &self,
        records: &mut HashMap<String, TrackedRecord>,
        key: &str,
        source_id: &str,
    ) -> Result<()> {
        let record = match records.get(key) {
            Some(record) => record.clone(),
            None => return Ok(()),
        };

        if record.source_id != source_id {
            return Err(Error::OwnershipMismatch {
                key: key.to_string(),
                source_id: source_id.to_string(),
            });
        }

        let provider = self
            .providers
            .get(&record.provider_name)
            .ok_or_else(|| Error::provider_not_found(&record.provider_name))?;

        let zone = zone::resolve_zone(&record.hostname, provider.zone_filters())
            .ok_or_else(|| Error::ZoneUndetermined(record.hostname.clone()))?;

        let ip: std::net::IpAddr = record
            .value
            .parse()
            .map_err(|_| Error::InvalidTarget(record.value.clone()))?;

        let zone_record = ZoneRecord::Address {
            name: zone::relative_name(&record.hostname, &zone),
            ip,
            ttl: None,
        };

        provider
            .adapter()
            .delete_records(&zone, vec![zone_record])
            .await
            .map_err(|err| {
                metrics::record_error(provider.name(), "delete");
                Error::adapter(provider.name(), "delete", err)
            })?;

        records.remove(key);
        metrics::record_deleted(provider.name());
        info!(hostname = %record.hostname, provider = %record.provider_name, "record deleted");
        Ok(())
    }

    /// Delete every tracked record owned by a workload.
    ///
    /// Best-effort: deletion continues past individual failures and all
    /// accumulated errors are reported jointly.
    pub async fn delete_records_for_source(&self, source_id: &str) -> Result<()> {
        let mut guard = self.records.write().await;

        let owned: Vec<String> = guard
            .iter()
            .filter(|(_, record)| record.source_id == source_id)
            .map(|(key, _)| key.clone())
            .collect();

        let mut errors = Vec::new();
        for key in owned {
            if let Err(err) = self.delete_locked(&mut guard, &key, source_id).await {
                warn!(%key, error = %err, "bulk delete: record failed");
                errors.push(err);
            }
        }

        Error::from_batch(errors)
    }

    /// Point-in-time snapshot of the inventory.
    ///
    /// Returned records are value copies; mutating them has no effect on
    /// the inventory.
    pub async fn records(&self) -> Vec<TrackedRecord> {
        let guard = self.records.read().await;
        guard.values().cloned().collect()
    }

    /// Recompute the tracked-records gauge from a full snapshot.
    pub async fn update_metrics(&self) {
        let snapshot = self.records().await;
        let provider_names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        metrics::observe_inventory(&snapshot, &provider_names);
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Deduplicate intents by inventory key, keeping the most recent.
fn dedup_intents(intents: Vec<SyncIntent>) -> HashMap<String, SyncIntent> {
    let mut desired: HashMap<String, SyncIntent> = HashMap::new();

    for intent in intents {
        let key = record_key(
            intent.hostname.trim().to_lowercase().as_str(),
            &intent.provider_name,
        );
        let replace = match desired.get(&key) {
            Some(existing) => wins_over(&intent, existing),
            None => true,
        };
        if replace {
            desired.insert(key, intent);
        }
    }

    desired
}

/// Recency ordering for duplicate intents: later `requested_at` wins,
/// identical timestamps fall back to the greater `source_id`.
fn wins_over(candidate: &SyncIntent, incumbent: &SyncIntent) -> bool {
    match candidate.requested_at.cmp(&incumbent.requested_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.source_id > incumbent.source_id,
    }
}

fn tracked_from_intent(
    intent: &SyncIntent,
    hostname: &str,
    ttl: u32,
    state: RecordState,
    provider_id: Option<String>,
) -> TrackedRecord {
    TrackedRecord {
        id: provider_id,
        hostname: hostname.to_string(),
        record_type: intent.record_type,
        value: intent.target.clone(),
        ttl,
        proxied: intent.proxied.unwrap_or(false),
        provider_name: intent.provider_name.clone(),
        last_sync_at: Utc::now(),
        state,
        source_id: intent.source_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;
    use chrono::TimeZone;

    fn intent(target: &str, requested_at: i64, source_id: &str) -> SyncIntent {
        SyncIntent {
            hostname: "app.example.com".into(),
            provider_name: "cf".into(),
            record_type: RecordType::A,
            target: target.into(),
            source_id: source_id.into(),
            requested_at: Utc.timestamp_opt(requested_at, 0).unwrap(),
            ttl: None,
            proxied: None,
        }
    }

    #[test]
    fn dedup_keeps_latest_requested_at() {
        let survivors = dedup_intents(vec![
            intent("10.0.0.1", 100, "c1"),
            intent("10.0.0.2", 200, "c1"),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors["app.example.com:cf"].target, "10.0.0.2");
    }

    #[test]
    fn dedup_tie_break_is_deterministic() {
        // Same timestamp: greater source id wins, regardless of order.
        let forward = dedup_intents(vec![
            intent("10.0.0.1", 100, "aaa"),
            intent("10.0.0.2", 100, "bbb"),
        ]);
        let reverse = dedup_intents(vec![
            intent("10.0.0.2", 100, "bbb"),
            intent("10.0.0.1", 100, "aaa"),
        ]);
        assert_eq!(forward["app.example.com:cf"].source_id, "bbb");
        assert_eq!(reverse["app.example.com:cf"].source_id, "bbb");
    }

    #[test]
    fn dedup_keys_include_provider() {
        let mut other = intent("10.0.0.3", 100, "c1");
        other.provider_name = "route53".into();

        let survivors = dedup_intents(vec![intent("10.0.0.1", 100, "c1"), other]);
        assert_eq!(survivors.len(), 2);
    }
}
