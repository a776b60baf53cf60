use std::time::Duration;

use serde::Deserialize;

/// Provider configuration: where the DSM lives and which zones we own.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Hostname or IP of the Synology DSM
    pub synology_hostname: String,

    /// DSM web API port, 5001 for HTTPS by default
    #[serde(default = "default_synology_port")]
    pub synology_port: u16,

    pub synology_username: String,

    pub synology_password: String,

    /// Talk HTTPS to the DSM
    #[serde(default = "default_true")]
    pub synology_https: bool,

    /// Accept the self-signed certificate most DSMs ship with
    #[serde(default)]
    pub synology_insecure_skip_verify: bool,

    /// Log what would be written instead of writing it
    #[serde(default)]
    pub dry_run: bool,

    /// Comma-separated list of zones to manage; empty = manage all
    pub domain_list: String,
}

impl Config {
    /// Parse from environment variables (SYNOLOGY_HOSTNAME, DOMAIN_LIST, …)
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::from_env::<Config>()?)
    }

    /// Return the domain list as a Vec<String>, empty if unconfigured.
    pub fn domain_filter_list(&self) -> Vec<String> {
        self.domain_list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Base URL of the DSM web API, e.g. https://nas.lan:5001/webapi
    pub fn dsm_base_url(&self) -> String {
        let scheme = if self.synology_https { "https" } else { "http" };
        format!("{scheme}://{}:{}/webapi", self.synology_hostname, self.synology_port)
    }
}

/// Listener settings, named after the external-dns webhook conventions.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_webhook_host")]
    pub webhook_host: String,

    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,

    #[serde(default = "default_health_host")]
    pub health_host: String,

    #[serde(default = "default_health_port")]
    pub health_port: u16,

    /// Seconds allowed to read a request
    #[serde(default = "default_timeout")]
    pub read_timeout: u64,

    /// Seconds allowed to produce a response; also the deadline handed to
    /// the provider for each operation
    #[serde(default = "default_timeout")]
    pub write_timeout: u64,
}

impl ServerOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::from_env::<ServerOptions>()?)
    }

    pub fn webhook_address(&self) -> String {
        format!("{}:{}", self.webhook_host, self.webhook_port)
    }

    pub fn health_address(&self) -> String {
        format!("{}:{}", self.health_host, self.health_port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }
}

fn default_synology_port() -> u16    { 5001 }
fn default_true()          -> bool   { true }
fn default_webhook_host()  -> String { "localhost".into() }
fn default_webhook_port()  -> u16    { 8888 }
fn default_health_host()   -> String { "0.0.0.0".into() }
fn default_health_port()   -> u16    { 8080 }
fn default_timeout()       -> u64    { 60 }
