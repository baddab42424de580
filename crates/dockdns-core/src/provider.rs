//! Provider adapter boundary.
//!
//! Each DNS provider is described by a [`Provider`] (stable name, type
//! tag, ordered zone filters) and exposes exactly one capability surface,
//! [`ZoneAdapter`]: append, set, and delete records within a zone. The
//! manager never calls an adapter for a hostname outside the provider's
//! filters.
//!
//! ## Adapter rules
//!
//! Adapters are thin translations to a vendor API:
//!
//! - one vendor call per capability invocation; errors are returned, not
//!   retried (the periodic reconcile pass is the retry)
//! - no background tasks, no caching of engine state
//! - cancellation comes from the caller: dropping the future or wrapping
//!   it in a timeout must abort the vendor call
//!
//! Adapters may enrich records before delegating (for example, filling a
//! configured default TTL when a record carries none — never overriding
//! an explicit one).

use async_trait::async_trait;
use std::sync::Arc;

use crate::record::{AppliedRecord, ZoneRecord};

/// Capability contract implemented by every provider adapter.
///
/// All methods take the owning zone and a batch of zone-relative records,
/// and return the records the vendor acknowledged. Implementations must
/// be thread-safe; the engine serializes calls per inventory lock, but
/// health probes may invoke adapters concurrently.
#[async_trait]
pub trait ZoneAdapter: Send + Sync {
    /// Append records to the zone.
    ///
    /// Returned [`AppliedRecord`]s may carry the vendor-assigned record
    /// id; adapters that cannot cheaply obtain one leave it unset, which
    /// is not an error.
    async fn append_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>>;

    /// Create or overwrite records in the zone.
    async fn set_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>>;

    /// Delete records from the zone. Deleting a record that does not
    /// exist is not an error.
    async fn delete_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>>;
}

/// A configured DNS provider: identity plus capability.
#[derive(Clone)]
pub struct Provider {
    name: String,
    kind: String,
    zone_filters: Vec<String>,
    adapter: Arc<dyn ZoneAdapter>,
}

impl Provider {
    /// Create a provider descriptor.
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        zone_filters: Vec<String>,
        adapter: Arc<dyn ZoneAdapter>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            zone_filters,
            adapter,
        }
    }

    /// Unique provider name (configuration-assigned)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider type tag (e.g. "cloudflare")
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Ordered zone filters this provider is authorized for
    pub fn zone_filters(&self) -> &[String] {
        &self.zone_filters
    }

    /// The provider's capability surface
    pub fn adapter(&self) -> &Arc<dyn ZoneAdapter> {
        &self.adapter
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("zone_filters", &self.zone_filters)
            .finish_non_exhaustive()
    }
}
