//! Record and workload types shared across the engine.
//!
//! The inventory key is `hostname:provider`, so at most one
//! [`TrackedRecord`] exists per hostname per provider. The inventory is a
//! write-side cache of intent: it reflects what this process last asked a
//! provider to do, and is never reconciled against the provider's actual
//! stored state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Default TTL applied when an intent carries none, in seconds
pub const DEFAULT_TTL_SECS: u32 = 300;

/// A running deployable unit (container or swarm service) with the
/// metadata needed to decide whether DNS sync is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// Runtime-assigned identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Whether the workload is currently running
    #[serde(default)]
    pub running: bool,
    /// Label map attached to the workload
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// IPv4 addresses, in runtime order
    #[serde(default)]
    pub ipv4: Vec<Ipv4Addr>,
    /// IPv6 addresses, in runtime order
    #[serde(default)]
    pub ipv6: Vec<Ipv6Addr>,
}

/// DNS record type managed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Record type matching an IP address family
    pub fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applied-state of a tracked record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Not yet attempted
    Pending,
    /// Last adapter call for this key succeeded
    Present,
    /// Last adapter call for this key failed; value is the attempted one
    Error,
}

impl RecordState {
    /// Label value used on the tracked-records gauge
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Present => "present",
            RecordState::Error => "error",
        }
    }
}

/// A computed request describing the desired DNS record for one workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncIntent {
    /// Fully qualified hostname to publish
    pub hostname: String,
    /// Name of the provider that should own the record
    pub provider_name: String,
    /// Record type derived from the target address family
    pub record_type: RecordType,
    /// Record target (an IP literal)
    pub target: String,
    /// Id of the workload this intent was extracted from
    pub source_id: String,
    /// When the intent was extracted
    pub requested_at: DateTime<Utc>,
    /// Optional TTL override from labels, in seconds
    pub ttl: Option<u32>,
    /// Optional proxied flag from labels
    pub proxied: Option<bool>,
}

/// The engine's belief about one applied record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    /// Provider-assigned record id, when the adapter reported one
    pub id: Option<String>,
    /// Fully qualified hostname
    pub hostname: String,
    /// Record type
    pub record_type: RecordType,
    /// Record value (IP literal) last sent to the provider
    pub value: String,
    /// TTL in seconds
    pub ttl: u32,
    /// Whether the record was requested proxied
    pub proxied: bool,
    /// Owning provider name
    pub provider_name: String,
    /// Timestamp of the last adapter attempt for this key
    pub last_sync_at: DateTime<Utc>,
    /// Applied-state after the last attempt
    pub state: RecordState,
    /// Id of the workload that owns this record
    pub source_id: String,
}

/// Compound inventory key for a (hostname, provider) pair
pub fn record_key(hostname: &str, provider: &str) -> String {
    format!("{hostname}:{provider}")
}

/// A DNS record as exchanged with provider adapters.
///
/// Closed variant set with a common name/value/ttl header. `name` is
/// relative to the zone the adapter call targets; `ttl` is in seconds,
/// `None` meaning "let the adapter or provider choose".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneRecord {
    /// Address record (A or AAAA, by address family)
    Address {
        /// Zone-relative name
        name: String,
        /// Address the name resolves to
        ip: IpAddr,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Alias (CNAME) record
    Alias {
        /// Zone-relative name
        name: String,
        /// Canonical target name
        target: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Text record
    Txt {
        /// Zone-relative name
        name: String,
        /// Text payload
        text: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Mail-exchange record
    Mx {
        /// Zone-relative name
        name: String,
        /// Exchange preference (lower wins)
        preference: u16,
        /// Mail exchange host
        exchange: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Nameserver record
    Ns {
        /// Zone-relative name
        name: String,
        /// Delegated nameserver host
        host: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Service locator record
    Srv {
        /// Zone-relative name
        name: String,
        /// Target selection priority (lower wins)
        priority: u16,
        /// Relative weight among same-priority targets
        weight: u16,
        /// Service port
        port: u16,
        /// Service target host
        target: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
    /// Certification-authority-authorization record
    Caa {
        /// Zone-relative name
        name: String,
        /// CAA flags octet
        flags: u8,
        /// Property tag (issue, issuewild, iodef)
        tag: String,
        /// Property value
        value: String,
        /// TTL in seconds
        ttl: Option<u32>,
    },
}

impl ZoneRecord {
    /// Zone-relative name of the record
    pub fn name(&self) -> &str {
        match self {
            ZoneRecord::Address { name, .. }
            | ZoneRecord::Alias { name, .. }
            | ZoneRecord::Txt { name, .. }
            | ZoneRecord::Mx { name, .. }
            | ZoneRecord::Ns { name, .. }
            | ZoneRecord::Srv { name, .. }
            | ZoneRecord::Caa { name, .. } => name,
        }
    }

    /// TTL in seconds, when set
    pub fn ttl(&self) -> Option<u32> {
        match self {
            ZoneRecord::Address { ttl, .. }
            | ZoneRecord::Alias { ttl, .. }
            | ZoneRecord::Txt { ttl, .. }
            | ZoneRecord::Mx { ttl, .. }
            | ZoneRecord::Ns { ttl, .. }
            | ZoneRecord::Srv { ttl, .. }
            | ZoneRecord::Caa { ttl, .. } => *ttl,
        }
    }

    /// Wire type tag of the record
    pub fn kind(&self) -> &'static str {
        match self {
            ZoneRecord::Address { ip: IpAddr::V4(_), .. } => "A",
            ZoneRecord::Address { ip: IpAddr::V6(_), .. } => "AAAA",
            ZoneRecord::Alias { .. } => "CNAME",
            ZoneRecord::Txt { .. } => "TXT",
            ZoneRecord::Mx { .. } => "MX",
            ZoneRecord::Ns { .. } => "NS",
            ZoneRecord::Srv { .. } => "SRV",
            ZoneRecord::Caa { .. } => "CAA",
        }
    }

    /// Record value rendered in zone-file form
    pub fn value(&self) -> String {
        match self {
            ZoneRecord::Address { ip, .. } => ip.to_string(),
            ZoneRecord::Alias { target, .. } => target.clone(),
            ZoneRecord::Txt { text, .. } => text.clone(),
            ZoneRecord::Mx {
                preference,
                exchange,
                ..
            } => format!("{preference} {exchange}"),
            ZoneRecord::Ns { host, .. } => host.clone(),
            ZoneRecord::Srv {
                priority,
                weight,
                port,
                target,
                ..
            } => format!("{priority} {weight} {port} {target}"),
            ZoneRecord::Caa {
                flags, tag, value, ..
            } => format!("{flags} {tag} {value:?}"),
        }
    }

    /// Set the TTL on any variant
    pub fn set_ttl(&mut self, seconds: u32) {
        match self {
            ZoneRecord::Address { ttl, .. }
            | ZoneRecord::Alias { ttl, .. }
            | ZoneRecord::Txt { ttl, .. }
            | ZoneRecord::Mx { ttl, .. }
            | ZoneRecord::Ns { ttl, .. }
            | ZoneRecord::Srv { ttl, .. }
            | ZoneRecord::Caa { ttl, .. } => *ttl = Some(seconds),
        }
    }
}

/// A record as acknowledged by a provider adapter.
///
/// `provider_id` is the adapter's chance to report the vendor-assigned
/// record id; adapters that cannot cheaply obtain one leave it `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRecord {
    /// The record as the adapter applied it (possibly enriched)
    pub record: ZoneRecord,
    /// Vendor-assigned record id, when known
    pub provider_id: Option<String>,
}

impl AppliedRecord {
    /// Wrap a record with no vendor id
    pub fn new(record: ZoneRecord) -> Self {
        Self {
            record,
            provider_id: None,
        }
    }

    /// Attach a vendor id
    pub fn with_id(record: ZoneRecord, id: impl Into<String>) -> Self {
        Self {
            record,
            provider_id: Some(id.into()),
        }
    }
}
