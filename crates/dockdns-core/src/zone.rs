//! Zone-authority matching.
//!
//! A provider is only ever called for hostnames inside its configured
//! zone filters. A filter matches a hostname when they are equal or the
//! hostname ends with `"." + filter`; among all matches the longest
//! filter is the owning zone, and equal-length ties go to the first
//! configured filter.

/// Check whether a hostname matches any of the provider's zone filters.
pub fn hostname_authorized(hostname: &str, zone_filters: &[String]) -> bool {
    let hostname = normalize(hostname);
    if hostname.is_empty() {
        return false;
    }

    zone_filters.iter().any(|filter| {
        let filter = normalize(filter);
        !filter.is_empty() && matches(&hostname, &filter)
    })
}

/// Resolve the owning zone for a hostname: the longest matching filter.
pub fn resolve_zone(hostname: &str, zone_filters: &[String]) -> Option<String> {
    let hostname = normalize(hostname);

    let mut longest: Option<String> = None;
    for filter in zone_filters {
        let filter = normalize(filter);
        if filter.is_empty() || !matches(&hostname, &filter) {
            continue;
        }
        // Strictly-greater keeps the first configured filter on ties.
        if longest.as_ref().is_none_or(|best| filter.len() > best.len()) {
            longest = Some(filter);
        }
    }

    longest
}

/// Strip the zone suffix from a hostname, yielding the zone-relative
/// record name. A hostname equal to the zone is returned unchanged.
pub fn relative_name(hostname: &str, zone: &str) -> String {
    let hostname = normalize(hostname);
    let suffix = format!(".{}", normalize(zone));
    hostname
        .strip_suffix(&suffix)
        .unwrap_or(&hostname)
        .to_string()
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn matches(hostname: &str, filter: &str) -> bool {
    hostname == filter || hostname.ends_with(&format!(".{filter}"))
}
