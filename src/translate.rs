//! Conversion between DSM records and external-dns endpoints.

use tracing::debug;

use crate::{
    dns::{is_supported_record_type, Endpoint},
    filter::ZoneFilter,
    synology::RemoteRecord,
};

/// TTL written when external-dns leaves the endpoint's TTL unset.
pub const DEFAULT_TTL: u32 = 3000;

/// Read direction: one remote record becomes one single-target endpoint.
///
/// Returns `None` for record types external-dns does not manage and for names
/// outside the filter.
pub fn to_endpoint(remote: &RemoteRecord, filter: &ZoneFilter) -> Option<Endpoint> {
    let name = remote.record.strip_suffix('.').unwrap_or(&remote.record);

    if !is_supported_record_type(&remote.record_type) || !filter.matches(name) {
        debug!(
            record = %remote.record,
            record_type = %remote.record_type,
            value = %remote.value,
            "skipping Synology DNS record"
        );
        return None;
    }

    debug!(
        record = %remote.record,
        record_type = %remote.record_type,
        value = %remote.value,
        "converting Synology DNS record to endpoint"
    );
    Some(
        Endpoint::new(name, remote.record_type.clone(), vec![remote.value.clone()])
            .with_ttl(remote.ttl.trim().parse().unwrap_or(0)),
    )
}

/// Write direction: build the DSM record for one target of an endpoint.
///
/// The owning zone is the last entry of `zones` that `name` ends with; it is
/// left empty when nothing matches.
pub fn to_remote_record(
    record_type: &str,
    name: &str,
    target: &str,
    ttl: u32,
    zones: &[String],
) -> RemoteRecord {
    let ttl = if ttl == 0 { DEFAULT_TTL } else { ttl };
    let zone = resolve_zone(name, zones).unwrap_or_default().to_string();

    RemoteRecord {
        record: format!("{name}."),
        record_type: record_type.to_string(),
        value: target.to_string(),
        ttl: ttl.to_string(),
        zone_name: zone.clone(),
        domain_name: zone,
    }
}

/// Last-match-wins: `["a.example.com", "example.com"]` puts
/// `host.a.example.com` in `example.com`.
pub fn resolve_zone<'a>(name: &str, zones: &'a [String]) -> Option<&'a str> {
    zones
        .iter()
        .filter(|zone| name.ends_with(zone.as_str()))
        .last()
        .map(String::as_str)
}
