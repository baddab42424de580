//! Test doubles and common utilities for the contract tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use dockdns_core::error::Result;
use dockdns_core::provider::{Provider, ZoneAdapter};
use dockdns_core::record::{AppliedRecord, RecordType, SyncIntent, Workload, ZoneRecord};
use dockdns_core::driver::WorkloadSource;

/// A zone adapter that records every call and can be switched into a
/// failing mode per capability.
#[derive(Default)]
pub struct MockZoneAdapter {
    append_calls: AtomicUsize,
    set_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_append: AtomicBool,
    fail_delete: AtomicBool,
    /// Vendor id returned with every applied record, when set
    assigned_id: Mutex<Option<String>>,
    /// (zone, record names) per append call
    appended: Mutex<Vec<(String, Vec<String>)>>,
    /// (zone, record names) per delete call
    deleted: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockZoneAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_assigned_id(id: &str) -> Arc<Self> {
        let adapter = Self::default();
        *adapter.assigned_id.lock().unwrap() = Some(id.to_string());
        Arc::new(adapter)
    }

    pub fn fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn appended(&self) -> Vec<(String, Vec<String>)> {
        self.appended.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(String, Vec<String>)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZoneAdapter for MockZoneAdapter {
    async fn append_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_append.load(Ordering::SeqCst) {
            anyhow::bail!("injected append failure");
        }

        self.appended.lock().unwrap().push((
            zone.to_string(),
            records.iter().map(|r| r.name().to_string()).collect(),
        ));

        let assigned = self.assigned_id.lock().unwrap().clone();
        Ok(records
            .into_iter()
            .map(|record| match &assigned {
                Some(id) => AppliedRecord::with_id(record, id.clone()),
                None => AppliedRecord::new(record),
            })
            .collect())
    }

    async fn set_records(
        &self,
        _zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        Ok(records.into_iter().map(AppliedRecord::new).collect())
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            anyhow::bail!("injected delete failure");
        }

        self.deleted.lock().unwrap().push((
            zone.to_string(),
            records.iter().map(|r| r.name().to_string()).collect(),
        ));

        Ok(records.into_iter().map(AppliedRecord::new).collect())
    }
}

/// Build a provider named `name` over the given adapter and filters.
pub fn provider(name: &str, filters: &[&str], adapter: Arc<MockZoneAdapter>) -> Provider {
    Provider::new(
        name,
        "mock",
        filters.iter().map(|s| s.to_string()).collect(),
        adapter,
    )
}

/// Build a sync intent with explicit timing and ownership.
pub fn intent(hostname: &str, provider: &str, target: &str, source_id: &str) -> SyncIntent {
    intent_at(hostname, provider, target, source_id, 1_000)
}

pub fn intent_at(
    hostname: &str,
    provider: &str,
    target: &str,
    source_id: &str,
    requested_secs: i64,
) -> SyncIntent {
    let record_type = if target.contains(':') {
        RecordType::Aaaa
    } else {
        RecordType::A
    };

    SyncIntent {
        hostname: hostname.to_string(),
        provider_name: provider.to_string(),
        record_type,
        target: target.to_string(),
        source_id: source_id.to_string(),
        requested_at: Utc.timestamp_opt(requested_secs, 0).unwrap(),
        ttl: None,
        proxied: None,
    }
}

/// A workload source serving a fixed list, with a call counter.
#[derive(Default)]
pub struct FixedWorkloadSource {
    workloads: Mutex<Vec<Workload>>,
    list_calls: AtomicUsize,
}

impl FixedWorkloadSource {
    pub fn new(workloads: Vec<Workload>) -> Arc<Self> {
        Arc::new(Self {
            workloads: Mutex::new(workloads),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_workloads(&self, workloads: Vec<Workload>) {
        *self.workloads.lock().unwrap() = workloads;
    }
}

#[async_trait]
impl WorkloadSource for FixedWorkloadSource {
    async fn workloads(&self) -> Result<Vec<Workload>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.workloads.lock().unwrap().clone())
    }
}

/// A labeled running workload with one IPv4 address.
pub fn labeled_workload(id: &str, hostname: &str, provider: &str, ip: &str) -> Workload {
    Workload {
        id: id.to_string(),
        name: format!("{id}-name"),
        running: true,
        labels: [
            ("caddy_dns.hostname".to_string(), hostname.to_string()),
            ("caddy_dns.provider".to_string(), provider.to_string()),
        ]
        .into_iter()
        .collect(),
        ipv4: vec![ip.parse().unwrap()],
        ipv6: Vec::new(),
    }
}
