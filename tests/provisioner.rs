//! Provisioner workflow tests against an in-memory resource provider

mod common;

use async_trait::async_trait;
use common::{admin_password, test_config, ADMIN_PASSWORD, SUBSCRIPTION_ID};
use sca_infra::config::AdminPassword;
use sca_infra::credentials::{CredentialStore, ResourceStatus, REQUIRED_KEYS};
use sca_infra::provider::{ConnectionMaterial, ProviderError, ResourceProvider};
use sca_infra::provisioner::{ProvisionReport, Provisioner, ResourceOutcome};
use sca_infra::resource::{ResourceDescriptor, ResourceKind, ResourceState};
use sca_infra::ProvisionError;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Provider that keeps resources in memory and fails on request
#[derive(Default)]
struct FakeProvider {
    existing: Mutex<HashSet<(ResourceKind, String)>>,
    /// Names taken elsewhere in Azure
    taken: Mutex<HashSet<String>>,
    fail_create: Mutex<HashSet<ResourceKind>>,
    /// Kinds whose containers or firewall rules cannot be created
    fail_children: Mutex<HashSet<ResourceKind>>,
    /// Parents whose children are all in place
    children_ready: Mutex<HashSet<(ResourceKind, String)>>,
    reject_auth: bool,
    creates: Mutex<Vec<(ResourceKind, String)>>,
}

impl FakeProvider {
    fn failing(kind: ResourceKind) -> Self {
        let provider = Self::default();
        provider.fail_create.lock().unwrap().insert(kind);
        provider
    }

    fn heal(&self) {
        self.fail_create.lock().unwrap().clear();
        self.fail_children.lock().unwrap().clear();
    }

    fn has_children(&self, kind: ResourceKind, name: &str) -> bool {
        self.children_ready
            .lock()
            .unwrap()
            .contains(&(kind, name.to_string()))
    }

    fn creates(&self) -> Vec<(ResourceKind, String)> {
        self.creates.lock().unwrap().clone()
    }

    fn reset_creates(&self) {
        self.creates.lock().unwrap().clear();
    }
}

#[async_trait]
impl ResourceProvider for FakeProvider {
    async fn authenticate(&self) -> Result<(), ProviderError> {
        if self.reject_auth {
            return Err(ProviderError::Authentication(
                "AADSTS700016: application not found".to_string(),
            ));
        }
        Ok(())
    }

    async fn inspect(&self, resource: &ResourceDescriptor) -> ResourceState {
        let key = (resource.kind, resource.name.clone());
        if self.existing.lock().unwrap().contains(&key) {
            ResourceState::Present
        } else {
            ResourceState::Absent
        }
    }

    async fn name_available(&self, resource: &ResourceDescriptor) -> Result<bool, ProviderError> {
        Ok(!self.taken.lock().unwrap().contains(&resource.name))
    }

    async fn create(
        &self,
        resource: &ResourceDescriptor,
        admin_password: &AdminPassword,
    ) -> Result<(), ProviderError> {
        assert_eq!(admin_password.expose(), ADMIN_PASSWORD);
        self.creates
            .lock()
            .unwrap()
            .push((resource.kind, resource.name.clone()));

        if self.fail_create.lock().unwrap().contains(&resource.kind) {
            return Err(ProviderError::QuotaOrRegion {
                code: "RegionDoesNotAllowProvisioning".to_string(),
                message: "Location 'westus2' is not accepting creation of new servers".to_string(),
            });
        }
        self.existing
            .lock()
            .unwrap()
            .insert((resource.kind, resource.name.clone()));
        Ok(())
    }

    async fn ensure_children(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError> {
        assert!(
            self.existing
                .lock()
                .unwrap()
                .contains(&(resource.kind, resource.name.clone())),
            "children ensured before their parent exists"
        );
        if self.fail_children.lock().unwrap().contains(&resource.kind) {
            return Err(ProviderError::Provider {
                status: 500,
                code: "InternalServerError".to_string(),
                message: "container creation failed".to_string(),
            });
        }
        self.children_ready
            .lock()
            .unwrap()
            .insert((resource.kind, resource.name.clone()));
        Ok(())
    }

    async fn connection_material(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<ConnectionMaterial, ProviderError> {
        Ok(match resource.kind {
            ResourceKind::BlobStorageAccount | ResourceKind::DataLakeAccount => {
                ConnectionMaterial::StorageAccount {
                    connection_string: format!(
                        "DefaultEndpointsProtocol=https;AccountName={};AccountKey=a2V5PT0=;EndpointSuffix=core.windows.net",
                        resource.name
                    ),
                }
            }
            ResourceKind::SqlServer => ConnectionMaterial::SqlServer {
                fqdn: format!("{}.database.windows.net", resource.name),
            },
            _ => ConnectionMaterial::None,
        })
    }
}

/// Deterministic suffixes: s0000001, s0000002, ...
fn counting_suffixes() -> impl FnMut() -> String + Send {
    let mut next = 0;
    move || {
        next += 1;
        format!("s{next:07}")
    }
}

async fn provision(
    provider: &FakeProvider,
    config: &sca_infra::config::EnvironmentConfig,
) -> (ProvisionReport, CredentialStore) {
    let mut store = CredentialStore::load(&config.credential_store_path).unwrap();
    let report = Provisioner::new(provider, config)
        .with_suffix_generator(counting_suffixes())
        .run(&mut store, &admin_password())
        .await
        .unwrap();
    (report, store)
}

fn snapshot(store: &CredentialStore) -> BTreeMap<String, String> {
    store
        .keys()
        .filter(|key| *key != "PROVISIONED_AT")
        .map(|key| (key.to_string(), store.get(key).unwrap_or_default().to_string()))
        .collect()
}

#[tokio::test]
async fn test_fresh_environment_creates_every_resource() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::default();

    let (report, store) = provision(&provider, &config).await;

    assert!(report.succeeded(), "{report}");
    assert_eq!(report.created(), 6);
    assert!(report.missing_keys.is_empty());
    for key in REQUIRED_KEYS {
        assert!(store.get(key).is_some(), "missing {key}");
    }
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000001"));
    assert_eq!(store.get("SQL_SERVER_NAME"), Some("sca-sql-s0000001"));
    assert_eq!(store.get("SQL_SERVER_FQDN"), Some("sca-sql-s0000001.database.windows.net"));
    assert_eq!(store.get("SQL_ADMIN_PASSWORD"), Some(ADMIN_PASSWORD));
    assert_eq!(store.get("STORAGE_CONTAINER_NAME"), Some("supply-chain-master-data"));
    assert_eq!(store.get("DATALAKE_CONTAINERS"), Some("raw,processed,output"));
    assert_eq!(store.get("SUBSCRIPTION_ID"), Some(SUBSCRIPTION_ID));
    assert_eq!(store.get("PROVISIONING_COMPLETE"), Some("true"));
    assert!(store.get("PROVISIONED_AT").is_some());

    // Database is created on the server that was just created
    let creates = provider.creates();
    assert_eq!(creates[0], (ResourceKind::ResourceGroup, "sca-rg-dev".to_string()));
    assert!(creates.contains(&(ResourceKind::SqlDatabase, "sca-dw".to_string())));
}

#[tokio::test]
async fn test_second_run_reuses_everything_and_keeps_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::default();

    let (_, first_store) = provision(&provider, &config).await;
    provider.reset_creates();

    // A fresh generator would yield the same first suffix; the stored one must win
    let mut store = CredentialStore::load(&config.credential_store_path).unwrap();
    let report = Provisioner::new(&provider, &config)
        .with_suffix_generator(|| "unused00".to_string())
        .run(&mut store, &admin_password())
        .await
        .unwrap();

    assert!(report.succeeded(), "{report}");
    assert_eq!(report.reused(), 6);
    assert_eq!(report.created(), 0);
    assert!(provider.creates().is_empty());
    assert_eq!(snapshot(&store), snapshot(&first_store));

    let reloaded = CredentialStore::load(&config.credential_store_path).unwrap();
    assert_eq!(snapshot(&reloaded), snapshot(&first_store));
}

#[tokio::test]
async fn test_failed_server_blocks_only_its_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::failing(ResourceKind::SqlServer);

    let (report, store) = provision(&provider, &config).await;

    assert!(!report.succeeded());
    assert!(matches!(
        report.outcome(ResourceKind::SqlServer),
        Some(ResourceOutcome::Failed(ProviderError::QuotaOrRegion { .. }))
    ));
    assert!(matches!(
        report.outcome(ResourceKind::SqlDatabase),
        Some(ResourceOutcome::NotReached(_))
    ));
    for kind in [
        ResourceKind::ResourceGroup,
        ResourceKind::BlobStorageAccount,
        ResourceKind::DataLakeAccount,
        ResourceKind::OrchestrationService,
    ] {
        assert!(
            matches!(report.outcome(kind), Some(ResourceOutcome::Created)),
            "{kind} should be created"
        );
    }

    assert_eq!(store.status(ResourceKind::SqlServer), Some(ResourceStatus::Failed));
    assert_eq!(store.status(ResourceKind::SqlDatabase), Some(ResourceStatus::Incomplete));
    assert_eq!(store.get("SQL_SERVER_NAME"), Some("sca-sql-s0000001"));
    assert_eq!(store.get("SQL_SERVER_FQDN"), None);
    assert_eq!(store.get("SQL_ADMIN_PASSWORD"), None);
    assert_eq!(store.get("PROVISIONING_COMPLETE"), Some("false"));
    assert!(report.missing_keys.contains(&"SQL_SERVER_FQDN"));

    // Re-run after the restriction is lifted: only the gaps are filled
    provider.heal();
    provider.reset_creates();
    let (report, store) = provision(&provider, &config).await;

    assert!(report.succeeded(), "{report}");
    assert_eq!(report.created(), 2);
    assert_eq!(report.reused(), 4);
    assert_eq!(
        provider.creates(),
        vec![
            (ResourceKind::SqlServer, "sca-sql-s0000001".to_string()),
            (ResourceKind::SqlDatabase, "sca-dw".to_string()),
        ]
    );
    assert_eq!(store.get("PROVISIONING_COMPLETE"), Some("true"));
}

#[tokio::test]
async fn test_resource_group_failure_stops_everything_else() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::failing(ResourceKind::ResourceGroup);

    let (report, store) = provision(&provider, &config).await;

    assert!(!report.succeeded());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.not_reached(), 5);
    assert_eq!(provider.creates().len(), 1);
    for kind in ResourceKind::ALL {
        assert_ne!(store.status(kind), Some(ResourceStatus::Complete));
    }
}

#[tokio::test]
async fn test_authentication_failure_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider {
        reject_auth: true,
        ..FakeProvider::default()
    };

    let mut store = CredentialStore::load(&config.credential_store_path).unwrap();
    let result = Provisioner::new(&provider, &config)
        .run(&mut store, &admin_password())
        .await;

    assert!(matches!(result, Err(ProvisionError::Authentication(_))));
    assert!(store.is_empty());
    assert!(!config.credential_store_path.exists());
    assert!(provider.creates().is_empty());
}

#[tokio::test]
async fn test_taken_generated_name_is_retried_with_new_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::default();
    provider
        .taken
        .lock()
        .unwrap()
        .insert("scasas0000001".to_string());

    let (report, store) = provision(&provider, &config).await;

    assert!(report.succeeded(), "{report}");
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000002"));
    // Other resources keep the run's suffix
    assert_eq!(store.get("DATALAKE_ACCOUNT_NAME"), Some("scadls0000001"));
    assert_eq!(store.get("NAME_SUFFIX"), Some("s0000001"));
}

#[tokio::test]
async fn test_taken_pinned_name_fails_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[("NAME_SUFFIX", "a1b2c3d4")]);
    let provider = FakeProvider::default();
    provider
        .taken
        .lock()
        .unwrap()
        .insert("scasaa1b2c3d4".to_string());

    let (report, _) = provision(&provider, &config).await;

    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Failed(ProviderError::NameCollision { name, .. })) if name == "scasaa1b2c3d4"
    ));
    assert!(matches!(
        report.outcome(ResourceKind::DataLakeAccount),
        Some(ResourceOutcome::Created)
    ));
}

#[tokio::test]
async fn test_store_from_another_environment_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);

    let mut stale = CredentialStore::new(&config.credential_store_path);
    stale.set("SUBSCRIPTION_ID", "00000000-0000-0000-0000-000000000000");
    stale.set("STORAGE_ACCOUNT_NAME", "scasaoldname1");
    stale.set("NAME_SUFFIX", "oldname1");
    stale.save().unwrap();

    let provider = FakeProvider::default();
    let (report, store) = provision(&provider, &config).await;

    assert!(report.succeeded(), "{report}");
    assert_eq!(store.get("SUBSCRIPTION_ID"), Some(SUBSCRIPTION_ID));
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000001"));
}

#[tokio::test]
async fn test_reused_parent_gets_missing_children() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::default();
    provider
        .fail_children
        .lock()
        .unwrap()
        .insert(ResourceKind::BlobStorageAccount);

    // Account is created but its container is not
    let (report, store) = provision(&provider, &config).await;
    assert!(!report.succeeded());
    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Failed(ProviderError::Provider { status: 500, .. }))
    ));
    assert_eq!(store.status(ResourceKind::BlobStorageAccount), Some(ResourceStatus::Failed));
    assert_eq!(store.get("STORAGE_CONTAINER_NAME"), None);
    assert!(!provider.has_children(ResourceKind::BlobStorageAccount, "scasas0000001"));

    provider.heal();
    provider.reset_creates();
    let (report, store) = provision(&provider, &config).await;

    assert!(report.succeeded(), "{report}");
    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Reused)
    ));
    assert!(provider.creates().is_empty());
    assert!(provider.has_children(ResourceKind::BlobStorageAccount, "scasas0000001"));
    assert_eq!(store.status(ResourceKind::BlobStorageAccount), Some(ResourceStatus::Complete));
    assert_eq!(store.get("STORAGE_CONTAINER_NAME"), Some("supply-chain-master-data"));
}

#[tokio::test]
async fn test_unreached_generated_name_is_retried_once_taken() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::failing(ResourceKind::ResourceGroup);

    let (report, store) = provision(&provider, &config).await;
    assert_eq!(report.not_reached(), 5);
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000001"));

    // Someone else claims the name before the next run
    provider
        .taken
        .lock()
        .unwrap()
        .insert("scasas0000001".to_string());
    provider.heal();

    let (report, store) = provision(&provider, &config).await;
    assert!(report.succeeded(), "{report}");
    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Created)
    ));
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000002"));

    // The created account is now the identity and is reused as is
    let (report, store) = provision(&provider, &config).await;
    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Reused)
    ));
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000002"));
}

#[tokio::test]
async fn test_completed_name_is_never_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &[]);
    let provider = FakeProvider::default();
    let (report, _) = provision(&provider, &config).await;
    assert!(report.succeeded(), "{report}");

    // Deleted out of band and the name claimed elsewhere
    provider
        .existing
        .lock()
        .unwrap()
        .remove(&(ResourceKind::BlobStorageAccount, "scasas0000001".to_string()));
    provider
        .taken
        .lock()
        .unwrap()
        .insert("scasas0000001".to_string());

    let (report, store) = provision(&provider, &config).await;
    assert!(matches!(
        report.outcome(ResourceKind::BlobStorageAccount),
        Some(ResourceOutcome::Failed(ProviderError::NameCollision { name, .. })) if name == "scasas0000001"
    ));
    assert_eq!(store.get("STORAGE_ACCOUNT_NAME"), Some("scasas0000001"));
}
