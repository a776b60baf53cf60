use async_trait::async_trait;
use reqwest::Client;
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::{config::Config, error::ClientError};

const AUTH_API: &str = "SYNO.API.Auth";
const ZONE_API: &str = "SYNO.DNSServer.Zone";
const RECORD_API: &str = "SYNO.DNSServer.Zone.Record";

/// Zone type whose records we manage.
pub const MASTER_SCOPE: &str = "master";

// ─────────────────────────────────────────────────────────────────────────────
// DSM DNS Server API shapes (partial – only what we need)
// ─────────────────────────────────────────────────────────────────────────────

/// One record as the DNS Server package models it: a single value per record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Owner name in absolute form, e.g. `host.example.com.`
    #[serde(rename = "rr_owner")]
    pub record: String,
    #[serde(rename = "rr_type")]
    pub record_type: String,
    #[serde(rename = "rr_info")]
    pub value: String,
    #[serde(rename = "rr_ttl", default, deserialize_with = "string_or_number")]
    pub ttl: String,
    /// Owning zone; required on writes, may be missing on reads.
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub domain_name: String,
}

impl RemoteRecord {
    /// Tab-separated line DSM uses to identify a record on delete.
    pub fn full_record(&self) -> String {
        format!("{}\t{}\t{}\t{}", self.record, self.ttl, self.record_type, self.value)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Session {
    sid: String,
}

#[derive(Debug, Default, Deserialize)]
struct ZoneList {
    #[serde(default)]
    items: Vec<ZoneStub>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZoneStub {
    zone_name: String,
    #[serde(default)]
    domain_name: String,
    #[serde(default)]
    zone_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecordList {
    #[serde(default)]
    items: Vec<RemoteRecord>,
}

#[derive(Serialize)]
struct DeleteItem<'a> {
    #[serde(flatten)]
    record: &'a RemoteRecord,
    full_record: String,
}

/// DSM is inconsistent about quoting TTLs.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("unexpected TTL value {other}"))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote record operations
// ─────────────────────────────────────────────────────────────────────────────

/// The appliance operations the provider relies on. How a delete matches
/// (by value or by name and type) is up to the implementation.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// All records in zones of type `scope`, restricted to `zones` unless it
    /// is empty.
    async fn list(&self, zones: &[String], scope: &str) -> Result<Vec<RemoteRecord>, ClientError>;

    async fn create(&self, record: &RemoteRecord) -> Result<(), ClientError>;

    async fn delete(&self, record: &RemoteRecord) -> Result<(), ClientError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// A logged-in DSM session. The session id is obtained once and reused; an
/// expired session shows up as an API error on the next call.
#[derive(Clone)]
pub struct SynologyClient {
    http: Client,
    base: String,
    sid: String,
}

impl std::fmt::Debug for SynologyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynologyClient").field("base", &self.base).finish_non_exhaustive()
    }
}

impl SynologyClient {
    /// Build the HTTP client from `cfg` and log in.
    pub async fn connect(cfg: &Config) -> Result<Self, ClientError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(cfg.synology_insecure_skip_verify)
            .build()?;
        Self::login(http, &cfg.dsm_base_url(), &cfg.synology_username, &cfg.synology_password).await
    }

    /// Log in against `base` (the `/webapi` URL) and keep the session id.
    pub async fn login(http: Client, base: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let base = base.trim_end_matches('/').to_string();
        let url = format!("{base}/auth.cgi");
        let params = [
            ("api", AUTH_API),
            ("version", "3"),
            ("method", "login"),
            ("account", username),
            ("passwd", password),
            ("session", "DNSServer"),
            ("format", "sid"),
        ];

        let envelope: Envelope<Session> = http
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let login_failed = |reason: String| ClientError::Login {
            user: username.to_string(),
            reason,
        };
        if !envelope.success {
            let code = envelope.error.map(|e| e.code).unwrap_or_default();
            return Err(login_failed(format!("error code {code}")));
        }
        let sid = envelope
            .data
            .map(|s| s.sid)
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| login_failed("no session id in response".into()))?;

        info!("Logged in to Synology DSM at {base} as {username}");
        Ok(Self { http, base, sid })
    }

    async fn call<T>(
        &self,
        api: &'static str,
        method: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Default,
    {
        let url = format!("{}/entry.cgi", self.base);
        let envelope: Envelope<T> = self
            .http
            .get(&url)
            .query(&[("api", api), ("version", "1"), ("method", method), ("_sid", self.sid.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.success {
            let code = envelope.error.map(|e| e.code).ok_or_else(|| ClientError::UnexpectedResponse {
                api,
                reason: "success=false without an error code".into(),
            })?;
            return Err(ClientError::Api { api, method, code });
        }
        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl RecordClient for SynologyClient {
    async fn list(&self, zones: &[String], scope: &str) -> Result<Vec<RemoteRecord>, ClientError> {
        let listed: ZoneList = self.call(ZONE_API, "list", &[]).await?;

        let mut records = Vec::new();
        for zone in listed.items.into_iter().filter(|z| {
            z.zone_type == scope
                && (zones.is_empty() || zones.contains(&z.zone_name) || zones.contains(&z.domain_name))
        }) {
            let domain = if zone.domain_name.is_empty() { &zone.zone_name } else { &zone.domain_name };
            let page: RecordList = self
                .call(
                    RECORD_API,
                    "list",
                    &[("zone_name", zone.zone_name.as_str()), ("domain_name", domain.as_str())],
                )
                .await?;
            debug!("zone {} → {} record(s)", zone.zone_name, page.items.len());
            records.extend(page.items);
        }
        Ok(records)
    }

    async fn create(&self, record: &RemoteRecord) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .call(
                RECORD_API,
                "create",
                &[
                    ("zone_name", record.zone_name.as_str()),
                    ("domain_name", record.domain_name.as_str()),
                    ("rr_owner", record.record.as_str()),
                    ("rr_type", record.record_type.as_str()),
                    ("rr_ttl", record.ttl.as_str()),
                    ("rr_info", record.value.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, record: &RemoteRecord) -> Result<(), ClientError> {
        let items = serde_json::to_string(&[DeleteItem {
            record,
            full_record: record.full_record(),
        }])
        .map_err(|e| ClientError::UnexpectedResponse {
            api: RECORD_API,
            reason: format!("encoding delete request: {e}"),
        })?;
        let _: serde_json::Value = self.call(RECORD_API, "delete", &[("items", items.as_str())]).await?;
        Ok(())
    }
}
