use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// external-dns webhook contract types
// ─────────────────────────────────────────────────────────────────────────────

/// Record types external-dns knows how to plan for. Anything else read from
/// the appliance is left alone.
pub const SUPPORTED_RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "SRV", "TXT", "NS"];

pub fn is_supported_record_type(record_type: &str) -> bool {
    SUPPORTED_RECORD_TYPES.contains(&record_type)
}

/// A provider-specific property attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecific {
    pub name: String,
    pub value: String,
}

/// One DNS endpoint as external-dns understands it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    pub record_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: Vec<String>,
    /// Seconds; 0 means "not set, use the provider default".
    #[serde(default, rename = "recordTTL")]
    pub record_ttl: u32,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecific>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,
}

impl Endpoint {
    pub fn new(dns_name: impl Into<String>, record_type: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            dns_name: dns_name.into(),
            record_type: record_type.into(),
            targets,
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.record_ttl = ttl;
        self
    }
}

/// The payload sent by external-dns to POST /records.
///
/// `update_old[i]` and `update_new[i]` describe the same record before and
/// after the change.
///
/// external-dns marshals this with Go field names; camelCase is accepted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Changes {
    #[serde(default, alias = "create", deserialize_with = "null_as_default")]
    pub create: Vec<Endpoint>,
    #[serde(default, alias = "updateOld", deserialize_with = "null_as_default")]
    pub update_old: Vec<Endpoint>,
    #[serde(default, alias = "updateNew", deserialize_with = "null_as_default")]
    pub update_new: Vec<Endpoint>,
    #[serde(default, alias = "delete", deserialize_with = "null_as_default")]
    pub delete: Vec<Endpoint>,
}

/// Go marshals nil slices and maps as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Domain-filter response for GET /
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}
