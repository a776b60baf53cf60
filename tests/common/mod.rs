//! Shared test infrastructure: an in-memory stand-in for the DSM.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use synology_webhook::{
    error::ClientError,
    filter::ZoneFilter,
    synology::{RecordClient, RemoteRecord},
    SynologyProvider,
};

/// A remote call as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { zones: Vec<String>, scope: String },
    Create(RemoteRecord),
    Delete(RemoteRecord),
}

/// Records every call; fails the ones it is told to fail.
#[derive(Clone, Default)]
pub struct FakeClient {
    pub records: Arc<Mutex<Vec<RemoteRecord>>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_list: bool,
    /// Creates whose value is listed here are refused.
    pub fail_create: Vec<String>,
    /// Deletes whose value is listed here are refused.
    pub fail_delete: Vec<String>,
    /// Sent `true` on the first delete, to simulate a caller going away.
    pub trip_on_delete: Option<Arc<watch::Sender<bool>>>,
}

impl FakeClient {
    pub fn with_records(records: Vec<RemoteRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List { .. }))
            .collect()
    }

    fn refused(method: &'static str) -> ClientError {
        ClientError::Api {
            api: "SYNO.DNSServer.Zone.Record",
            method,
            code: 10003,
        }
    }
}

#[async_trait]
impl RecordClient for FakeClient {
    async fn list(&self, zones: &[String], scope: &str) -> Result<Vec<RemoteRecord>, ClientError> {
        self.calls.lock().unwrap().push(Call::List {
            zones: zones.to_vec(),
            scope: scope.to_string(),
        });
        if self.fail_list {
            return Err(ClientError::Api {
                api: "SYNO.DNSServer.Zone",
                method: "list",
                code: 119,
            });
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create(&self, record: &RemoteRecord) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::Create(record.clone()));
        if self.fail_create.contains(&record.value) {
            return Err(Self::refused("create"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn delete(&self, record: &RemoteRecord) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::Delete(record.clone()));
        if let Some(trip) = &self.trip_on_delete {
            let _ = trip.send(true);
        }
        if self.fail_delete.contains(&record.value) {
            return Err(Self::refused("delete"));
        }
        self.records
            .lock()
            .unwrap()
            .retain(|r| !(r.record == record.record && r.record_type == record.record_type && r.value == record.value));
        Ok(())
    }
}

pub fn remote(record: &str, record_type: &str, value: &str) -> RemoteRecord {
    RemoteRecord {
        record: record.to_string(),
        record_type: record_type.to_string(),
        value: value.to_string(),
        ttl: "3000".to_string(),
        ..Default::default()
    }
}

pub fn provider(client: FakeClient, suffixes: &[&str], dry_run: bool) -> SynologyProvider<FakeClient> {
    SynologyProvider::new(client, ZoneFilter::new(suffixes.iter().copied(), |_| {}), dry_run)
}
