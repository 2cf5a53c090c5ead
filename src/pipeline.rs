//! Target expansion pipeline.
//!
//! Turns a batch of raw inputs into concrete targets: domains pass through,
//! wildcard domains go through subdomain discovery, addresses pass through
//! and subnets are enumerated. Per-input failures are logged and skipped;
//! only a store failure fails the batch.

use crate::config::AppSettings;
use crate::discovery::Discovery;
use crate::error::{StorageResult, TargetError, TargetResult};
use crate::storage::TargetStore;
use crate::types::{apex_domain, classify, subnet_range, TargetKind, TargetRecord, TargetType};
use std::sync::Arc;
use std::time::Duration;

/// Classifies, expands and stores batches of raw inputs.
#[derive(Clone)]
pub struct ExpansionPipeline {
    store: Arc<dyn TargetStore>,
    discovery: Arc<dyn Discovery>,
    discovery_budget: Duration,
    max_subnet_hosts: u128,
}

impl ExpansionPipeline {
    /// Create a pipeline writing to `store` and expanding wildcards with
    /// `discovery`.
    pub fn new(store: Arc<dyn TargetStore>, discovery: Arc<dyn Discovery>) -> Self {
        let defaults = AppSettings::default();
        Self {
            store,
            discovery,
            discovery_budget: defaults.discovery_budget(),
            max_subnet_hosts: defaults.max_subnet_hosts as u128,
        }
    }

    /// Build from application settings.
    pub fn from_settings(
        store: Arc<dyn TargetStore>,
        discovery: Arc<dyn Discovery>,
        settings: &AppSettings,
    ) -> Self {
        Self::new(store, discovery)
            .with_discovery_budget(settings.discovery_budget())
            .with_max_subnet_hosts(settings.max_subnet_hosts)
    }

    /// Set the time budget for each wildcard domain.
    pub fn with_discovery_budget(mut self, budget: Duration) -> Self {
        self.discovery_budget = budget;
        self
    }

    /// Set the largest subnet that will be enumerated.
    pub fn with_max_subnet_hosts(mut self, max: u64) -> Self {
        self.max_subnet_hosts = max as u128;
        self
    }

    /// Process a batch and return every target now in the store.
    ///
    /// The returned list is the store's cumulative content, not only what
    /// this batch added.
    pub async fn process(&self, batch: &[String]) -> StorageResult<Vec<TargetRecord>> {
        let emitted = self.expand_batch(batch).await;
        let stored = emitted.len();

        self.persist(emitted).await?;

        tracing::info!(submitted = batch.len(), stored, "processed target batch");
        self.store.list_all().await
    }

    /// Classify and expand a batch without storing anything.
    pub async fn expand_batch(&self, batch: &[String]) -> Vec<TargetRecord> {
        let mut emitted = Vec::new();

        for input in batch {
            match classify(input) {
                TargetKind::Domain => emitted.push(TargetRecord::domain(input.as_str())),
                TargetKind::WildcardDomain => {
                    emitted.extend(self.discover(input).await);
                }
                TargetKind::IpAddress => emitted.push(TargetRecord::ip(input.as_str())),
                TargetKind::Subnet => match self.expand_subnet(input) {
                    Ok(ips) => emitted.extend(ips.into_iter().map(TargetRecord::ip)),
                    Err(e @ TargetError::SubnetTooLarge { .. }) => {
                        tracing::error!(
                            input = %input,
                            error = %e,
                            "skipping subnet above max_subnet_hosts; raise the setting to expand it"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(input = %input, error = %e, "skipping subnet");
                    }
                },
                TargetKind::Invalid => {
                    tracing::debug!(input = %input, "ignoring unrecognised input");
                }
            }
        }

        emitted
    }

    async fn discover(&self, input: &str) -> Vec<TargetRecord> {
        let Some(apex) = apex_domain(input) else {
            return Vec::new();
        };

        match self.discovery.discover(apex, self.discovery_budget).await {
            Ok(names) => names
                .into_iter()
                .filter(|name| {
                    let keep = classify(name) == TargetKind::Domain;
                    if !keep {
                        tracing::debug!(apex, name = %name, "discarding discovered name");
                    }
                    keep
                })
                .map(TargetRecord::domain)
                .collect(),
            Err(e) => {
                tracing::warn!(input = %input, error = %e, "subdomain discovery failed");
                Vec::new()
            }
        }
    }

    fn expand_subnet(&self, cidr: &str) -> TargetResult<Vec<String>> {
        let range = subnet_range(cidr)?;
        let hosts = range.host_count().unwrap_or(u128::MAX);
        if hosts > self.max_subnet_hosts {
            return Err(TargetError::SubnetTooLarge {
                cidr: cidr.to_string(),
                hosts,
                max: self.max_subnet_hosts,
            });
        }
        Ok(range.iter().map(|ip| ip.to_string()).collect())
    }

    /// Store targets, keeping batch order across kinds.
    async fn persist(&self, targets: Vec<TargetRecord>) -> StorageResult<()> {
        let mut run: Vec<String> = Vec::new();
        let mut run_kind: Option<TargetType> = None;

        for target in targets {
            if let Some(kind) = run_kind.filter(|kind| *kind != target.kind) {
                self.store.put_all(kind, std::mem::take(&mut run)).await?;
            }
            run_kind = Some(target.kind);
            run.push(target.value);
        }

        if let Some(kind) = run_kind {
            self.store.put_all(kind, run).await?;
        }
        Ok(())
    }
}
