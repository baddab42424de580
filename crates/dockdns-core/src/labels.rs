//! Desired-state extraction from workload labels.
//!
//! Each running workload may request DNS sync through labels under a
//! configurable prefix (default `caddy_dns`):
//!
//! - `{prefix}.hostname` — hostname to publish; when blank, the first
//!   site address of an unprefixed `caddy` label is used instead
//! - `{prefix}.provider` — required provider name
//! - `{prefix}.enable` — opt-out only: skip when equal to "false"
//! - `{prefix}.ttl` / `{prefix}.proxied` — optional overrides; values
//!   that fail to parse are silently dropped

use chrono::Utc;
use std::net::IpAddr;
use tracing::debug;

use crate::record::{RecordType, SyncIntent, Workload};

/// Label prefix used when none is configured
pub const DEFAULT_LABEL_PREFIX: &str = "caddy_dns";

/// Compute the desired sync intents for a set of workloads.
///
/// Pure mapping: zero or one intent per workload, in input order.
/// Workloads that are stopped, unlabeled, disabled, or addressless are
/// skipped. IPv4 is preferred over IPv6; only the first address of the
/// preferred family is used.
pub fn compute_desired_state(workloads: &[Workload], label_prefix: &str) -> Vec<SyncIntent> {
    let prefix = normalize_prefix(label_prefix);
    let mut intents = Vec::new();

    for workload in workloads {
        if !workload.running {
            continue;
        }

        let hostname = match desired_hostname(workload, &prefix) {
            Some(hostname) => hostname,
            None => continue,
        };

        let provider_name = match workload.labels.get(&format!("{prefix}.provider")) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => continue,
        };

        if let Some(value) = workload.labels.get(&format!("{prefix}.enable"))
            && value.trim().eq_ignore_ascii_case("false")
        {
            debug!(workload = %workload.name, "sync disabled by label, skipping");
            continue;
        }

        let (target, record_type) = match preferred_target(workload) {
            Some(pair) => pair,
            None => {
                debug!(workload = %workload.name, "no addresses, skipping");
                continue;
            }
        };

        let ttl = workload
            .labels
            .get(&format!("{prefix}.ttl"))
            .and_then(|value| value.trim().parse::<u32>().ok());

        let proxied = workload
            .labels
            .get(&format!("{prefix}.proxied"))
            .and_then(|value| parse_flag(value));

        intents.push(SyncIntent {
            hostname,
            provider_name,
            record_type,
            target: target.to_string(),
            source_id: workload.id.clone(),
            requested_at: Utc::now(),
            ttl,
            proxied,
        });
    }

    intents
}

/// Normalize a label prefix: trim whitespace and one trailing dot.
pub fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().trim_end_matches('.').to_string()
}

fn desired_hostname(workload: &Workload, prefix: &str) -> Option<String> {
    let explicit = workload
        .labels
        .get(&format!("{prefix}.hostname"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let hostname = explicit.or_else(|| {
        workload
            .labels
            .get("caddy")
            .and_then(|value| infer_hostname_from_caddy(value))
    })?;

    (!hostname.is_empty()).then_some(hostname)
}

/// Infer a hostname from a `caddy` reverse-proxy site label: the first
/// comma- or whitespace-separated token, with any `http://`/`https://`
/// scheme stripped.
pub fn infer_hostname_from_caddy(value: &str) -> Option<String> {
    let first = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .find(|token| !token.is_empty())?;

    let host = first
        .strip_prefix("https://")
        .or_else(|| first.strip_prefix("http://"))
        .unwrap_or(first);

    (!host.is_empty()).then(|| host.to_string())
}

/// Parse a relaxed boolean flag. Unrecognized values yield `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn preferred_target(workload: &Workload) -> Option<(IpAddr, RecordType)> {
    if let Some(ip) = workload.ipv4.first() {
        return Some((IpAddr::V4(*ip), RecordType::A));
    }
    if let Some(ip) = workload.ipv6.first() {
        return Some((IpAddr::V6(*ip), RecordType::Aaaa));
    }
    None
}
