// # Cloudflare DNS Adapter
//
// Implements the dockdns `ZoneAdapter` capability over the Cloudflare
// API v4.
//
// - One HTTP call per record per capability invocation; errors propagate
//   to the reconciliation engine (which retries on its next pass)
// - Records are enriched before delegation: the configured default TTL
//   is filled in only when a record carries none, and the configured
//   proxied flag applies to address records
// - NO retry, backoff, or caching here — owned by the engine
//
// ## Security
//
// - The API token NEVER appears in logs or Debug output
// - Construction fails fast on a missing token
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use dockdns_core::config::ProviderConfig;
use dockdns_core::provider::{Provider, ZoneAdapter};
use dockdns_core::record::{AppliedRecord, ZoneRecord};
use dockdns_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a [`Provider`] from a validated configuration entry.
///
/// Requires `token`; `ttl` and `proxied` become the adapter's enrichment
/// defaults.
pub fn provider_from_config(cfg: &ProviderConfig) -> Result<Provider> {
    let token = cfg
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            Error::config(format!(
                "cloudflare provider {:?} requires an API token",
                cfg.name
            ))
        })?;

    let adapter = CloudflareAdapter::new(token, cfg.ttl, cfg.proxied)?;

    Ok(Provider::new(
        cfg.name.clone(),
        "cloudflare",
        cfg.zone_filters.clone(),
        Arc::new(adapter),
    ))
}

/// Cloudflare adapter: thin translation from the capability contract to
/// API v4 calls.
pub struct CloudflareAdapter {
    /// ⚠️ NEVER log this value
    api_token: String,
    client: reqwest::Client,
    default_ttl: Option<u32>,
    proxied: Option<bool>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareAdapter")
            .field("api_token", &"<REDACTED>")
            .field("default_ttl", &self.default_ttl)
            .field("proxied", &self.proxied)
            .finish_non_exhaustive()
    }
}

impl CloudflareAdapter {
    /// Create an adapter with enrichment defaults.
    pub fn new(
        api_token: impl Into<String>,
        default_ttl: Option<u32>,
        proxied: Option<bool>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            client,
            default_ttl,
            proxied,
        })
    }

    /// Fill the configured default TTL into a record that carries none.
    /// An explicit TTL is never overridden.
    fn apply_defaults(&self, mut record: ZoneRecord) -> ZoneRecord {
        let default_ttl = match self.default_ttl {
            Some(ttl) => ttl,
            None => return record,
        };

        match &mut record {
            ZoneRecord::Address { ttl, .. }
            | ZoneRecord::Alias { ttl, .. }
            | ZoneRecord::Txt { ttl, .. }
            | ZoneRecord::Mx { ttl, .. }
            | ZoneRecord::Ns { ttl, .. }
            | ZoneRecord::Srv { ttl, .. }
            | ZoneRecord::Caa { ttl, .. } => {
                if ttl.is_none() {
                    *ttl = Some(default_ttl);
                }
            }
        }

        record
    }

    /// Build the JSON payload for a record within a zone.
    fn record_payload(&self, zone: &str, record: &ZoneRecord) -> Value {
        let mut payload = json!({
            "type": record.kind(),
            "name": fqdn(record.name(), zone),
        });

        if let Some(ttl) = record.ttl() {
            payload["ttl"] = json!(ttl);
        }

        match record {
            ZoneRecord::Address { ip, .. } => {
                payload["content"] = json!(ip.to_string());
                if let Some(proxied) = self.proxied {
                    payload["proxied"] = json!(proxied);
                }
            }
            ZoneRecord::Alias { target, .. } => {
                payload["content"] = json!(target);
            }
            ZoneRecord::Txt { text, .. } => {
                payload["content"] = json!(text);
            }
            ZoneRecord::Mx {
                preference,
                exchange,
                ..
            } => {
                payload["content"] = json!(exchange);
                payload["priority"] = json!(preference);
            }
            ZoneRecord::Ns { host, .. } => {
                payload["content"] = json!(host);
            }
            ZoneRecord::Srv {
                priority,
                weight,
                port,
                target,
                ..
            } => {
                payload["data"] = json!({
                    "priority": priority,
                    "weight": weight,
                    "port": port,
                    "target": target,
                });
            }
            ZoneRecord::Caa {
                flags, tag, value, ..
            } => {
                payload["data"] = json!({
                    "flags": flags,
                    "tag": tag,
                    "value": value,
                });
            }
        }

        payload
    }

    /// Look up the zone id for a zone name.
    async fn zone_id(&self, zone: &str) -> anyhow::Result<String> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones?name={zone}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("zone lookup request failed")?;

        let body = check_status(response, &format!("zone lookup for {zone:?}")).await?;
        let id = body["result"]
            .as_array()
            .and_then(|zones| zones.first())
            .and_then(|z| z["id"].as_str())
            .with_context(|| format!("zone {zone:?} not found"))?;

        Ok(id.to_string())
    }

    /// Look up an existing record id by fully qualified name and type.
    async fn record_id(
        &self,
        zone_id: &str,
        name: &str,
        kind: &str,
    ) -> anyhow::Result<Option<String>> {
        let url = format!(
            "{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records?name={name}&type={kind}"
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("record lookup request failed")?;

        let body = check_status(response, &format!("record lookup for {name:?}")).await?;
        Ok(body["result"]
            .as_array()
            .and_then(|records| records.first())
            .and_then(|r| r["id"].as_str())
            .map(|id| id.to_string()))
    }

    /// POST a new record, returning the vendor-assigned id.
    async fn create(&self, zone_id: &str, payload: &Value) -> anyhow::Result<Option<String>> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await
            .context("record create request failed")?;

        let body = check_status(response, "record create").await?;
        Ok(body["result"]["id"].as_str().map(|id| id.to_string()))
    }

    /// PUT over an existing record.
    async fn update(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &Value,
    ) -> anyhow::Result<()> {
        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records/{record_id}");
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await
            .context("record update request failed")?;

        check_status(response, "record update").await?;
        Ok(())
    }
}

#[async_trait]
impl ZoneAdapter for CloudflareAdapter {
    async fn append_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let mut applied = Vec::with_capacity(records.len());

        for record in records {
            let record = self.apply_defaults(record);
            let payload = self.record_payload(zone, &record);
            debug!(zone, name = record.name(), kind = record.kind(), "append record");

            let id = self.create(&zone_id, &payload).await?;
            applied.push(match id {
                Some(id) => AppliedRecord::with_id(record, id),
                None => AppliedRecord::new(record),
            });
        }

        Ok(applied)
    }

    async fn set_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let mut applied = Vec::with_capacity(records.len());

        for record in records {
            let record = self.apply_defaults(record);
            let payload = self.record_payload(zone, &record);
            let name = fqdn(record.name(), zone);

            match self.record_id(&zone_id, &name, record.kind()).await? {
                Some(record_id) => {
                    debug!(zone, name = record.name(), "set record (update)");
                    self.update(&zone_id, &record_id, &payload).await?;
                    applied.push(AppliedRecord::with_id(record, record_id));
                }
                None => {
                    debug!(zone, name = record.name(), "set record (create)");
                    let id = self.create(&zone_id, &payload).await?;
                    applied.push(match id {
                        Some(id) => AppliedRecord::with_id(record, id),
                        None => AppliedRecord::new(record),
                    });
                }
            }
        }

        Ok(applied)
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: Vec<ZoneRecord>,
    ) -> anyhow::Result<Vec<AppliedRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let mut applied = Vec::with_capacity(records.len());

        for record in records {
            let name = fqdn(record.name(), zone);
            let Some(record_id) = self.record_id(&zone_id, &name, record.kind()).await? else {
                // Already gone; deletion is idempotent.
                debug!(zone, name = record.name(), "record absent, skipping delete");
                continue;
            };

            let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records/{record_id}");
            let response = self
                .client
                .delete(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .context("record delete request failed")?;

            check_status(response, "record delete").await?;
            applied.push(AppliedRecord::with_id(record, record_id));
        }

        Ok(applied)
    }
}

/// Expand a zone-relative name to its fully qualified form.
fn fqdn(name: &str, zone: &str) -> String {
    if name.is_empty() || name == "@" || name == zone {
        zone.to_string()
    } else {
        format!("{name}.{zone}")
    }
}

/// Map non-success responses to errors with status-specific messages.
async fn check_status(response: reqwest::Response, operation: &str) -> anyhow::Result<Value> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .with_context(|| format!("{operation}: failed to parse response"));
    }

    let detail = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => bail!(
            "{operation}: authentication failed (status {status}); check the API token and its permissions"
        ),
        404 => bail!("{operation}: not found (status {status})"),
        429 => bail!("{operation}: rate limited (status {status})"),
        500..=599 => bail!("{operation}: server error (status {status}): {detail}"),
        _ => bail!("{operation}: request failed (status {status}): {detail}"),
    }
}
