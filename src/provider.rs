use std::{fmt, time::Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    dns::{Changes, DomainFilter, Endpoint},
    error::{ProviderError, Result},
    filter::ZoneFilter,
    synology::{RecordClient, RemoteRecord, MASTER_SCOPE},
    translate,
};

// ─────────────────────────────────────────────────────────────────────────────
// Provider capability
// ─────────────────────────────────────────────────────────────────────────────

/// What external-dns can ask of a provider, independent of the transport
/// that carries the request.
#[async_trait]
pub trait Provider: Send + Sync {
    fn domain_filter(&self) -> DomainFilter;

    async fn records(&self, cancel: &Cancel) -> Result<Vec<Endpoint>>;

    async fn apply_changes(&self, cancel: &Cancel, changes: Changes) -> Result<()>;

    async fn adjust_endpoints(&self, cancel: &Cancel, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>>;
}

/// Cancellation handle passed into every operation: a shutdown signal and/or
/// a deadline. Checked between remote calls, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancel {
    /// Never cancels.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cancels once `true` is sent on the channel.
    pub fn on_shutdown(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown: Some(shutdown), deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ProviderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-operation results
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The appliance accepted the write.
    Applied,
    /// Dry-run: logged, not sent.
    DryRun,
    /// Not sent: the name is outside the filter or has no owning zone.
    Rejected(String),
    /// Sent and refused, or the transport failed.
    Failed(String),
}

impl Status {
    /// Whether the record can be treated as written.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Applied | Status::DryRun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub action: Action,
    pub record: RemoteRecord,
    pub status: Status,
}

/// Outcome of every remote write issued for one batch, in issue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_ok())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_ok()).count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synology provider
// ─────────────────────────────────────────────────────────────────────────────

/// Reconciles external-dns endpoints against the DSM record set.
///
/// Holds no state between calls beyond its configuration; the appliance is
/// the only record of what exists.
pub struct SynologyProvider<C> {
    client: C,
    filter: ZoneFilter,
    dry_run: bool,
}

impl<C: RecordClient> SynologyProvider<C> {
    pub fn new(client: C, filter: ZoneFilter, dry_run: bool) -> Self {
        if dry_run {
            info!("Dry run enabled: record changes will be logged, not applied");
        }
        Self { client, filter, dry_run }
    }

    pub fn zone_filter(&self) -> &ZoneFilter {
        &self.filter
    }

    /// Apply `changes` and return the outcome of each remote write.
    ///
    /// Every delete (from `delete`, then `update_old`) is issued before any
    /// create (from `create`, then `update_new`). A failed write is logged
    /// and the batch carries on.
    pub async fn apply_changes_report(&self, cancel: &Cancel, changes: &Changes) -> Result<ApplyReport> {
        if changes.update_old.len() != changes.update_new.len() {
            return Err(ProviderError::UnpairedUpdate {
                old: changes.update_old.len(),
                new: changes.update_new.len(),
            });
        }

        info!(
            create = changes.create.len(),
            update = changes.update_new.len(),
            delete = changes.delete.len(),
            "Applying changes to Synology DNS records"
        );

        let mut report = ApplyReport::default();
        for ep in changes.delete.iter().chain(&changes.update_old) {
            for target in &ep.targets {
                cancel.check()?;
                report.outcomes.push(self.write(Action::Delete, ep, target).await);
            }
        }
        for ep in changes.create.iter().chain(&changes.update_new) {
            for target in &ep.targets {
                cancel.check()?;
                report.outcomes.push(self.write(Action::Create, ep, target).await);
            }
        }

        let failed = report.failures().count();
        if failed > 0 {
            warn!(
                succeeded = report.succeeded(),
                failed, "some Synology DNS changes were not applied"
            );
        } else {
            debug!(succeeded = report.succeeded(), "all Synology DNS changes applied");
        }
        Ok(report)
    }

    /// Rewrite every target of every endpoint (delete, then create) and keep
    /// only the targets whose create went through.
    pub async fn adjust_endpoints_report(
        &self,
        cancel: &Cancel,
        endpoints: Vec<Endpoint>,
    ) -> Result<(Vec<Endpoint>, ApplyReport)> {
        info!(endpoints = endpoints.len(), "Adjusting endpoints in Synology DNS records");

        let mut report = ApplyReport::default();
        let mut adjusted = Vec::with_capacity(endpoints.len());
        for mut ep in endpoints {
            let mut kept = Vec::with_capacity(ep.targets.len());
            for target in &ep.targets {
                cancel.check()?;
                report.outcomes.push(self.write(Action::Delete, &ep, target).await);

                cancel.check()?;
                let created = self.write(Action::Create, &ep, target).await;
                if created.status.is_ok() {
                    kept.push(target.clone());
                }
                report.outcomes.push(created);
            }
            if kept.len() != ep.targets.len() {
                debug!(
                    dns_name = %ep.dns_name,
                    before = ?ep.targets,
                    after = ?kept,
                    "dropped targets that could not be written"
                );
            }
            ep.targets = kept;
            adjusted.push(ep);
        }
        Ok((adjusted, report))
    }

    /// Issue one remote write for one target, never failing.
    async fn write(&self, action: Action, ep: &Endpoint, target: &str) -> OperationOutcome {
        let record = translate::to_remote_record(
            &ep.record_type,
            &ep.dns_name,
            target,
            ep.record_ttl,
            self.filter.suffixes(),
        );

        let status = if !self.filter.matches(&ep.dns_name) {
            Status::Rejected(format!("{} is outside the domain filter", ep.dns_name))
        } else if record.zone_name.is_empty() {
            Status::Rejected(format!("no configured zone owns {}", ep.dns_name))
        } else if self.dry_run {
            info!(
                record = %record.record,
                record_type = %record.record_type,
                value = %record.value,
                ttl = %record.ttl,
                zone = %record.zone_name,
                "dry run: would {action} record"
            );
            Status::DryRun
        } else {
            debug!(
                record = %record.record,
                record_type = %record.record_type,
                value = %record.value,
                ttl = %record.ttl,
                zone = %record.zone_name,
                "calling record {action}"
            );
            let res = match action {
                Action::Create => self.client.create(&record).await,
                Action::Delete => self.client.delete(&record).await,
            };
            match res {
                Ok(()) => Status::Applied,
                Err(e) => Status::Failed(e.to_string()),
            }
        };

        if let Status::Rejected(reason) | Status::Failed(reason) = &status {
            warn!(
                dns_name = %ep.dns_name,
                record_type = %ep.record_type,
                value = %target,
                "failed to {action} record: {reason}"
            );
        }
        OperationOutcome { action, record, status }
    }
}

#[async_trait]
impl<C: RecordClient> Provider for SynologyProvider<C> {
    fn domain_filter(&self) -> DomainFilter {
        DomainFilter {
            include: self.filter.suffixes().to_vec(),
            exclude: vec![],
        }
    }

    async fn records(&self, cancel: &Cancel) -> Result<Vec<Endpoint>> {
        info!("Listing Synology DNS records");
        cancel.check()?;

        let records = self
            .client
            .list(self.filter.suffixes(), MASTER_SCOPE)
            .await
            .map_err(|e| {
                warn!("Error listing Synology DNS records: {e}");
                ProviderError::Client(e)
            })?;

        let endpoints: Vec<Endpoint> = records
            .iter()
            .filter_map(|r| translate::to_endpoint(r, &self.filter))
            .collect();
        debug!(remote = records.len(), endpoints = endpoints.len(), "listed records");
        Ok(endpoints)
    }

    async fn apply_changes(&self, cancel: &Cancel, changes: Changes) -> Result<()> {
        self.apply_changes_report(cancel, &changes).await.map(|_| ())
    }

    async fn adjust_endpoints(&self, cancel: &Cancel, endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>> {
        self.adjust_endpoints_report(cancel, endpoints)
            .await
            .map(|(adjusted, _)| adjusted)
    }
}
