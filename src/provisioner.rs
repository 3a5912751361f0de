//! # Provisioner
//!
//! Brings the fixed resource topology into existence without duplicating or
//! clobbering existing resources.
//!
//! ## Run sequence
//!
//! 1. Authenticate. Failure aborts before the store or any resource is touched.
//! 2. Flag every resource `incomplete` and save the store.
//! 3. Resolve resources in order (resource group first, database after its
//!    server). Each resource is inspected and reused if present, otherwise its
//!    name is pre-validated and it is created. Missing children (containers,
//!    firewall rules) are then added. The store is saved after every resource.
//! 4. Record `PROVISIONING_COMPLETE` and check the required keys.
//!
//! A failed resource does not stop its siblings and nothing is rolled back.

use crate::config::{AdminPassword, EnvironmentConfig};
use crate::constants::MAX_NAME_ATTEMPTS;
use crate::credentials::{
    CredentialStore, ResourceStatus, LOCATION_KEY, NAME_SUFFIX_KEY, PROVISIONED_AT_KEY,
    PROVISIONING_COMPLETE_KEY, SUBSCRIPTION_ID_KEY,
};
use crate::error::{ProvisionError, ResourceCreationError};
use crate::provider::{ConnectionMaterial, ProviderError, ResourceProvider};
use crate::resource::{
    decide, derive_name, generate_suffix, ExistenceDecision, ResourceDescriptor, ResourceKind,
};
use std::fmt;
use tracing::{error, info, info_span, warn, Instrument};

#[derive(Debug, Clone)]
pub enum ResourceOutcome {
    Reused,
    Created,
    Failed(ProviderError),
    NotReached(String),
}

impl ResourceOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reused | Self::Created)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Reused => "REUSED",
            Self::Created => "CREATED",
            Self::Failed(_) => "FAILED",
            Self::NotReached(_) => "NOT REACHED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceReport {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: ResourceOutcome,
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<12} {:<21} {}", self.outcome.label(), self.kind, self.name)?;
        match &self.outcome {
            ResourceOutcome::Failed(e) => write!(f, ": {e}"),
            ResourceOutcome::NotReached(reason) => write!(f, ": {reason}"),
            ResourceOutcome::Reused | ResourceOutcome::Created => Ok(()),
        }
    }
}

/// One outcome per managed resource, plus credential keys still missing
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub resources: Vec<ResourceReport>,
    pub missing_keys: Vec<&'static str>,
}

impl ProvisionReport {
    /// Every resource reused or created and every required key present
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.resources.iter().all(|r| r.outcome.is_success()) && self.missing_keys.is_empty()
    }

    #[must_use]
    pub fn outcome(&self, kind: ResourceKind) -> Option<&ResourceOutcome> {
        self.resources
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&ResourceOutcome) -> bool) -> usize {
        self.resources.iter().filter(|r| predicate(&r.outcome)).count()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Created))
    }

    #[must_use]
    pub fn reused(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Reused))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Failed(_)))
    }

    #[must_use]
    pub fn not_reached(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::NotReached(_)))
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for resource in &self.resources {
            writeln!(f, "{resource}")?;
        }
        write!(
            f,
            "Summary: {} created, {} reused, {} failed, {} not reached",
            self.created(),
            self.reused(),
            self.failed(),
            self.not_reached()
        )?;
        if !self.missing_keys.is_empty() {
            write!(f, "\nMissing credential keys: {}", self.missing_keys.join(", "))?;
        }
        Ok(())
    }
}

/// Where names come from for this run
struct Naming {
    suffix: String,
    /// Operator pinned the suffix; collisions are not retried
    pinned: bool,
    /// Names recorded by an earlier run against the same environment
    use_stored: bool,
    /// Kinds an earlier run completed; their stored name is the resource's identity
    locked: Vec<ResourceKind>,
}

pub struct Provisioner<'a, P: ResourceProvider + ?Sized> {
    provider: &'a P,
    config: &'a EnvironmentConfig,
    suffixes: Box<dyn FnMut() -> String + Send + 'a>,
}

impl<P: ResourceProvider + ?Sized> fmt::Debug for Provisioner<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("subscription_id", &self.config.subscription_id)
            .field("resource_group", &self.config.resource_group)
            .finish_non_exhaustive()
    }
}

impl<'a, P: ResourceProvider + ?Sized> Provisioner<'a, P> {
    pub fn new(provider: &'a P, config: &'a EnvironmentConfig) -> Self {
        Self {
            provider,
            config,
            suffixes: Box::new(generate_suffix),
        }
    }

    /// Replace the random suffix generator (deterministic names in tests)
    #[must_use]
    pub fn with_suffix_generator(mut self, generator: impl FnMut() -> String + Send + 'a) -> Self {
        self.suffixes = Box::new(generator);
        self
    }

    /// Provision the topology and record the results in `store`
    ///
    /// Per-resource failures are reported, not returned.
    ///
    /// # Errors
    /// Returns an error if authentication fails (the store is left untouched)
    /// or the store cannot be saved
    pub async fn run(
        &mut self,
        store: &mut CredentialStore,
        admin_password: &AdminPassword,
    ) -> Result<ProvisionReport, ProvisionError> {
        let span = info_span!(
            "provision",
            subscription.id = %self.config.subscription_id,
            resource_group = %self.config.resource_group,
            location = %self.config.location
        );

        async move {
            self.provider
                .authenticate()
                .await
                .map_err(|e| ProvisionError::Authentication(e.to_string()))?;

            let naming = self.begin(store)?;
            let mut report = ProvisionReport::default();
            let mut sql_server_name: Option<String> = None;

            for kind in ResourceKind::ALL {
                let blocked = match kind {
                    ResourceKind::ResourceGroup => None,
                    _ if !report
                        .outcome(ResourceKind::ResourceGroup)
                        .is_some_and(ResourceOutcome::is_success) =>
                    {
                        Some("resource group is not available")
                    }
                    ResourceKind::SqlDatabase if sql_server_name.is_none() => {
                        Some("SQL server is not available")
                    }
                    _ => None,
                };

                let entry = if let Some(reason) = blocked {
                    let name = self.initial_name(kind, store, &naming);
                    warn!(resource.kind = %kind, resource.name = %name, reason, "Skipping resource");
                    store.set(kind.name_key(), &name);
                    store.retain_name_only(kind, ResourceStatus::Incomplete);
                    ResourceReport {
                        kind,
                        name,
                        outcome: ResourceOutcome::NotReached(reason.to_string()),
                    }
                } else {
                    let server = sql_server_name.clone().unwrap_or_default();
                    self.resolve(kind, &server, store, &naming, admin_password)
                        .await
                };

                if kind == ResourceKind::SqlServer && entry.outcome.is_success() {
                    sql_server_name = Some(entry.name.clone());
                }
                store.save()?;
                report.resources.push(entry);
            }

            self.finish(store, &mut report)?;
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Settle naming and flag every resource incomplete before touching anything
    fn begin(&mut self, store: &mut CredentialStore) -> Result<Naming, ProvisionError> {
        let same_environment = store
            .get(SUBSCRIPTION_ID_KEY)
            .is_none_or(|s| s == self.config.subscription_id)
            && store
                .get(ResourceKind::ResourceGroup.name_key())
                .is_none_or(|rg| rg == self.config.resource_group);
        if !same_environment {
            warn!(
                path = %store.path().display(),
                "Credential store belongs to another subscription or resource group; starting fresh"
            );
            store.clear();
        }

        let locked = ResourceKind::ALL
            .into_iter()
            .filter(|kind| same_environment && store.status(*kind) == Some(ResourceStatus::Complete))
            .collect();

        let (suffix, pinned) = match (&self.config.name_suffix, store.get(NAME_SUFFIX_KEY)) {
            (Some(pinned), _) => (pinned.clone(), true),
            (None, Some(stored)) => (stored.to_string(), false),
            (None, None) => ((self.suffixes)(), false),
        };
        info!(suffix = %suffix, pinned, "Resource name suffix");

        store.set(NAME_SUFFIX_KEY, &suffix);
        store.set(SUBSCRIPTION_ID_KEY, &self.config.subscription_id);
        store.set(LOCATION_KEY, &self.config.location);
        store.set(PROVISIONING_COMPLETE_KEY, "false");
        for kind in ResourceKind::ALL {
            store.retain_name_only(kind, ResourceStatus::Incomplete);
        }
        store.save()?;

        Ok(Naming {
            suffix,
            pinned,
            use_stored: same_environment,
            locked,
        })
    }

    fn initial_name(&self, kind: ResourceKind, store: &CredentialStore, naming: &Naming) -> String {
        let stored = naming
            .use_stored
            .then(|| store.get(kind.name_key()))
            .flatten();
        match (kind, stored) {
            // Fixed names always follow the config
            (ResourceKind::ResourceGroup | ResourceKind::SqlDatabase, _) | (_, None) => {
                derive_name(self.config, kind, &naming.suffix)
            }
            (_, Some(stored)) => stored.to_string(),
        }
    }

    /// Inspect, pre-validate, create; record the result in `store`
    async fn resolve(
        &mut self,
        kind: ResourceKind,
        sql_server: &str,
        store: &mut CredentialStore,
        naming: &Naming,
        admin_password: &AdminPassword,
    ) -> ResourceReport {
        let mut name = self.initial_name(kind, store, naming);
        // A pinned name, or the name of a resource an earlier run completed,
        // identifies a specific resource; never rename it
        let renamable =
            kind.is_globally_named() && !naming.pinned && !naming.locked.contains(&kind);

        let mut attempt = 1;
        let outcome = loop {
            let descriptor = ResourceDescriptor::new(kind, name.clone(), self.config, sql_server);
            let span = info_span!("resource", resource.kind = %kind, resource.name = %name);

            let result = self
                .resolve_once(&descriptor, admin_password)
                .instrument(span)
                .await;

            match result {
                Err(e) if e.is_name_collision() && renamable && attempt < MAX_NAME_ATTEMPTS => {
                    let next = derive_name(self.config, kind, &(self.suffixes)());
                    warn!(
                        resource.kind = %kind,
                        taken = %name,
                        next = %next,
                        attempt,
                        "Name is taken, retrying with a new suffix"
                    );
                    name = next;
                    attempt += 1;
                }
                Err(e) => break Err(e),
                Ok((outcome, material)) => break Ok((outcome, descriptor, material)),
            }
        };

        store.set(kind.name_key(), &name);
        match outcome {
            Ok((outcome, descriptor, material)) => {
                self.record(store, &descriptor, material, admin_password);
                store.set_status(kind, ResourceStatus::Complete);
                info!(resource.kind = %kind, resource.name = %name, outcome = outcome.label(), "Resource ready");
                ResourceReport {
                    kind,
                    name,
                    outcome,
                }
            }
            Err(source) => {
                store.retain_name_only(kind, ResourceStatus::Failed);
                let failure = ResourceCreationError {
                    kind,
                    name: name.clone(),
                    source,
                };
                error!(error = %failure, "Resource failed");
                ResourceReport {
                    kind,
                    name,
                    outcome: ResourceOutcome::Failed(failure.source),
                }
            }
        }
    }

    async fn resolve_once(
        &self,
        descriptor: &ResourceDescriptor,
        admin_password: &AdminPassword,
    ) -> Result<(ResourceOutcome, ConnectionMaterial), ProviderError> {
        let outcome = match decide(self.provider.inspect(descriptor).await) {
            ExistenceDecision::Reuse => {
                info!("Resource exists, reusing it unchanged");
                ResourceOutcome::Reused
            }
            ExistenceDecision::Abort(e) => return Err(e),
            ExistenceDecision::Create => {
                if descriptor.kind.is_globally_named()
                    && !self.provider.name_available(descriptor).await?
                {
                    return Err(ProviderError::NameCollision {
                        name: descriptor.name.clone(),
                        message: "name is already taken".to_string(),
                    });
                }
                info!("Creating resource");
                self.provider.create(descriptor, admin_password).await?;
                ResourceOutcome::Created
            }
        };
        self.provider.ensure_children(descriptor).await?;

        let material = self.provider.connection_material(descriptor).await?;
        Ok((outcome, material))
    }

    /// Write connection material for a resolved resource
    fn record(
        &self,
        store: &mut CredentialStore,
        descriptor: &ResourceDescriptor,
        material: ConnectionMaterial,
        admin_password: &AdminPassword,
    ) {
        match (descriptor.kind, material) {
            (ResourceKind::BlobStorageAccount, ConnectionMaterial::StorageAccount { connection_string }) => {
                store.set("STORAGE_CONNECTION_STRING", connection_string);
                store.set("STORAGE_CONTAINER_NAME", &self.config.master_data_container);
            }
            (ResourceKind::DataLakeAccount, ConnectionMaterial::StorageAccount { connection_string }) => {
                store.set("DATALAKE_CONNECTION_STRING", connection_string);
                store.set("DATALAKE_CONTAINERS", self.config.datalake_containers.join(","));
            }
            (ResourceKind::SqlServer, ConnectionMaterial::SqlServer { fqdn }) => {
                store.set("SQL_SERVER_FQDN", fqdn);
                store.set("SQL_ADMIN_USERNAME", &self.config.sql_admin_login);
                store.set("SQL_ADMIN_PASSWORD", admin_password.expose());
            }
            (kind, ConnectionMaterial::None) if kind.material_keys().is_empty() => {}
            (kind, other) => {
                warn!(resource.kind = %kind, material = ?other, "Unexpected connection material ignored");
            }
        }
    }

    fn finish(
        &self,
        store: &mut CredentialStore,
        report: &mut ProvisionReport,
    ) -> Result<(), ProvisionError> {
        let all_resolved = report.resources.iter().all(|r| r.outcome.is_success());
        if all_resolved {
            store.set(PROVISIONED_AT_KEY, chrono::Utc::now().to_rfc3339());
            store.set(PROVISIONING_COMPLETE_KEY, "true");
        }
        store.save()?;

        report.missing_keys = store.missing_required();
        if report.succeeded() {
            info!(path = %store.path().display(), "Provisioning complete");
        } else {
            warn!(
                path = %store.path().display(),
                missing = report.missing_keys.len(),
                "Provisioning incomplete; credential store is partial"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_needs_every_resource_and_key() {
        let mut report = ProvisionReport {
            resources: vec![
                ResourceReport {
                    kind: ResourceKind::ResourceGroup,
                    name: "sca-rg-dev".into(),
                    outcome: ResourceOutcome::Reused,
                },
                ResourceReport {
                    kind: ResourceKind::SqlServer,
                    name: "sca-sql-1".into(),
                    outcome: ResourceOutcome::Created,
                },
            ],
            missing_keys: Vec::new(),
        };
        assert!(report.succeeded());

        report.missing_keys.push("SQL_SERVER_FQDN");
        assert!(!report.succeeded());

        report.missing_keys.clear();
        report.resources.push(ResourceReport {
            kind: ResourceKind::SqlDatabase,
            name: "sca-dw".into(),
            outcome: ResourceOutcome::NotReached("SQL server is not available".into()),
        });
        assert!(!report.succeeded());
        assert_eq!(report.not_reached(), 1);
    }

    #[test]
    fn test_report_lines() {
        let line = ResourceReport {
            kind: ResourceKind::BlobStorageAccount,
            name: "scasa1a2b3c4d".into(),
            outcome: ResourceOutcome::Failed(ProviderError::QuotaOrRegion {
                code: "SkuNotAvailable".into(),
                message: "Standard_LRS is not available in westus2".into(),
            }),
        }
        .to_string();
        assert!(line.starts_with("FAILED"));
        assert!(line.contains("scasa1a2b3c4d"));
        assert!(line.contains("SkuNotAvailable"));
    }
}
