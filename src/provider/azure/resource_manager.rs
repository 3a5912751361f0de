//! # Azure Resource Manager Provider
//!
//! [`ResourceProvider`] implementation over the ARM REST API.
//!
//! Every request path comes from `sca_paths::PathBuilder`, so the API
//! version for each namespace is defined in exactly one place.

use super::auth::{AccessTokenSource, CredentialTokenSource};
use super::client::ArmClient;
use super::requests::{
    BlobContainerProperties, BlobContainerRequest, DataFactoryRequest, FirewallRuleProperties,
    FirewallRuleRequest, Identity, NameAvailabilityRequest, ResourceGroupRequest, Sku,
    SqlDatabaseRequest, SqlServerProperties, SqlServerRequest, StorageAccountProperties,
    StorageAccountRequest,
};
use super::responses::{NameAvailability, ResourceEnvelope, StorageAccountKeys};
use crate::config::{AdminPassword, EnvironmentConfig};
use crate::provider::{ConnectionMaterial, ProviderError, ResourceProvider};
use crate::resource::{DesiredConfig, ResourceDescriptor, ResourceKind, ResourceState};
use async_trait::async_trait;
use sca_paths::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const SQL_DNS_SUFFIX: &str = "database.windows.net";

pub struct AzureResourceManager {
    client: ArmClient,
    subscription_id: String,
    resource_group: String,
}

impl std::fmt::Debug for AzureResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureResourceManager")
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .finish_non_exhaustive()
    }
}

impl AzureResourceManager {
    pub fn new(
        client: ArmClient,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }

    /// Provider for the configured subscription, endpoint and auth method
    ///
    /// # Errors
    /// Returns an error if the credential or HTTP client cannot be created
    pub fn from_config(config: &EnvironmentConfig) -> Result<Self, ProviderError> {
        let tokens: Arc<dyn AccessTokenSource> =
            Arc::new(CredentialTokenSource::from_method(&config.auth, &config.arm_endpoint)?);
        let client = ArmClient::new(&config.arm_endpoint, tokens)?;
        Ok(Self::new(
            client,
            &config.subscription_id,
            &config.resource_group,
        ))
    }

    fn builder(&self, operation: ArmOperation) -> PathBuilder {
        PathBuilder::new()
            .operation(operation)
            .subscription(&self.subscription_id)
            .resource_group(&self.resource_group)
    }

    fn build(builder: &PathBuilder) -> Result<String, ProviderError> {
        builder
            .build_http_path()
            .map_err(|e| ProviderError::InvalidRequest(e.to_string()))
    }

    /// GET/PUT path of the resource itself
    fn resource_path(&self, resource: &ResourceDescriptor, create: bool) -> Result<String, ProviderError> {
        let pick = |get: ArmOperation, put: ArmOperation| if create { put } else { get };
        let builder = match resource.kind {
            ResourceKind::ResourceGroup => PathBuilder::new()
                .operation(pick(
                    ArmOperation::GetResourceGroup,
                    ArmOperation::CreateResourceGroup,
                ))
                .subscription(&self.subscription_id)
                .resource_group(&resource.name),
            ResourceKind::BlobStorageAccount | ResourceKind::DataLakeAccount => self
                .builder(pick(
                    ArmOperation::GetStorageAccount,
                    ArmOperation::CreateStorageAccount,
                ))
                .name(&resource.name),
            ResourceKind::SqlServer => self
                .builder(pick(ArmOperation::GetSqlServer, ArmOperation::CreateSqlServer))
                .name(&resource.name),
            ResourceKind::SqlDatabase => self
                .builder(pick(
                    ArmOperation::GetSqlDatabase,
                    ArmOperation::CreateSqlDatabase,
                ))
                .name(resource.parent_server().unwrap_or_default())
                .child(&resource.name),
            ResourceKind::OrchestrationService => self
                .builder(pick(
                    ArmOperation::GetDataFactory,
                    ArmOperation::CreateDataFactory,
                ))
                .name(&resource.name),
        };
        Self::build(&builder)
    }

    async fn create_storage_account(
        &self,
        resource: &ResourceDescriptor,
        location: &str,
        sku: &str,
        hierarchical_namespace: bool,
    ) -> Result<(), ProviderError> {
        let body = StorageAccountRequest {
            location,
            kind: "StorageV2",
            sku: Sku {
                name: sku,
                tier: None,
                capacity: None,
            },
            properties: StorageAccountProperties {
                supports_https_traffic_only: true,
                minimum_tls_version: "TLS1_2",
                allow_blob_public_access: false,
                is_hns_enabled: hierarchical_namespace,
            },
        };
        self.client
            .put_and_wait(&self.resource_path(resource, true)?, &body, &resource.name)
            .await
    }

    async fn create_sql_server(
        &self,
        resource: &ResourceDescriptor,
        location: &str,
        admin_login: &str,
        version: &str,
        admin_password: &AdminPassword,
    ) -> Result<(), ProviderError> {
        let body = SqlServerRequest {
            location,
            properties: SqlServerProperties {
                administrator_login: admin_login,
                administrator_login_password: admin_password.expose(),
                version,
                minimal_tls_version: "1.2",
            },
        };
        self.client
            .put_and_wait(&self.resource_path(resource, true)?, &body, &resource.name)
            .await
    }

    /// PUT a child unless a GET finds it; returns whether it was created
    async fn ensure_child<B>(
        &self,
        get: ArmOperation,
        put: ArmOperation,
        parent: &str,
        child: &str,
        body: &B,
    ) -> Result<bool, ProviderError>
    where
        B: serde::Serialize + Sync,
    {
        let path = |operation| Self::build(&self.builder(operation).name(parent).child(child));
        let existing = self
            .client
            .get::<serde_json::Value>(&path(get)?, child)
            .await?;
        if existing.is_some() {
            debug!(parent, child, "Child resource exists");
            return Ok(false);
        }
        self.client.put_and_wait(&path(put)?, body, child).await?;
        Ok(true)
    }

    async fn ensure_containers(
        &self,
        account: &str,
        containers: &[String],
    ) -> Result<(), ProviderError> {
        let body = BlobContainerRequest {
            properties: BlobContainerProperties {
                public_access: "None",
            },
        };
        for container in containers {
            let created = self
                .ensure_child(
                    ArmOperation::GetBlobContainer,
                    ArmOperation::CreateBlobContainer,
                    account,
                    container,
                    &body,
                )
                .await?;
            if created {
                info!(container = %container, "Created container");
            }
        }
        Ok(())
    }

    async fn ensure_firewall_rules(
        &self,
        server: &str,
        firewall_rules: &[crate::config::FirewallRule],
    ) -> Result<(), ProviderError> {
        for rule in firewall_rules {
            let body = FirewallRuleRequest {
                properties: FirewallRuleProperties {
                    start_ip_address: rule.start.to_string(),
                    end_ip_address: rule.end.to_string(),
                },
            };
            let created = self
                .ensure_child(
                    ArmOperation::GetFirewallRule,
                    ArmOperation::CreateFirewallRule,
                    server,
                    &rule.name,
                    &body,
                )
                .await?;
            if created {
                info!(rule = %rule.name, start = %rule.start, end = %rule.end, "Created firewall rule");
            }
        }
        Ok(())
    }

    async fn storage_connection_string(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<String, ProviderError> {
        let keys_path = Self::build(
            &self
                .builder(ArmOperation::ListStorageAccountKeys)
                .name(&resource.name),
        )?;
        let keys: StorageAccountKeys = self
            .client
            .post::<(), _>(&keys_path, None, &resource.name)
            .await?;
        let key = keys.keys.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse(format!("no access keys returned for {}", resource.name))
        })?;

        // Sovereign clouds use a different suffix; read it from the blob endpoint
        let account: Option<ResourceEnvelope> = self
            .client
            .get(&self.resource_path(resource, false)?, &resource.name)
            .await?;
        let suffix = account
            .and_then(|a| a.properties.primary_endpoints)
            .and_then(|e| e.blob)
            .and_then(|blob| endpoint_suffix(&blob))
            .unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string());

        Ok(format!(
            "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix={suffix}",
            resource.name, key.value
        ))
    }
}

/// `https://acct.blob.core.windows.net/` -> `core.windows.net`
fn endpoint_suffix(blob_endpoint: &str) -> Option<String> {
    let host = blob_endpoint
        .split("://")
        .nth(1)?
        .trim_end_matches('/')
        .split('/')
        .next()?;
    host.split_once(".blob.")
        .map(|(_, suffix)| suffix.to_string())
}

#[async_trait]
impl ResourceProvider for AzureResourceManager {
    async fn authenticate(&self) -> Result<(), ProviderError> {
        let span = info_span!("arm.authenticate", subscription.id = %self.subscription_id);
        async move {
            self.client.ensure_token().await?;
            let path = Self::build(
                &PathBuilder::new()
                    .operation(ArmOperation::GetSubscription)
                    .subscription(&self.subscription_id),
            )?;
            match self
                .client
                .get::<serde_json::Value>(&path, &self.subscription_id)
                .await
            {
                Ok(Some(_)) => {
                    info!("Authenticated against subscription");
                    Ok(())
                }
                Ok(None) => Err(ProviderError::Authentication(format!(
                    "subscription {} was not found or is not accessible",
                    self.subscription_id
                ))),
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    async fn inspect(&self, resource: &ResourceDescriptor) -> ResourceState {
        let path = match self.resource_path(resource, false) {
            Ok(path) => path,
            Err(e) => return ResourceState::Unknown(e),
        };
        match self
            .client
            .get::<serde_json::Value>(&path, &resource.name)
            .await
        {
            Ok(Some(_)) => ResourceState::Present,
            Ok(None) => ResourceState::Absent,
            Err(e) => ResourceState::Unknown(e),
        }
    }

    async fn name_available(&self, resource: &ResourceDescriptor) -> Result<bool, ProviderError> {
        let (builder, resource_type) = match resource.kind {
            ResourceKind::BlobStorageAccount | ResourceKind::DataLakeAccount => (
                self.builder(ArmOperation::CheckStorageNameAvailability),
                "Microsoft.Storage/storageAccounts",
            ),
            ResourceKind::SqlServer => (
                self.builder(ArmOperation::CheckSqlServerNameAvailability),
                "Microsoft.Sql/servers",
            ),
            ResourceKind::OrchestrationService => {
                let location = match &resource.config {
                    DesiredConfig::DataFactory { location } => location.as_str(),
                    _ => "",
                };
                (
                    self.builder(ArmOperation::CheckDataFactoryNameAvailability)
                        .location(location),
                    "Microsoft.DataFactory/factories",
                )
            }
            ResourceKind::ResourceGroup | ResourceKind::SqlDatabase => return Ok(true),
        };

        let body = NameAvailabilityRequest {
            name: &resource.name,
            resource_type,
        };
        let answer: NameAvailability = self
            .client
            .post(&Self::build(&builder)?, Some(&body), &resource.name)
            .await?;

        if !answer.name_available {
            debug!(
                resource.name = %resource.name,
                reason = answer.reason.as_deref().unwrap_or("unknown"),
                message = answer.message.as_deref().unwrap_or(""),
                "Name is not available"
            );
        }
        Ok(answer.name_available)
    }

    async fn create(
        &self,
        resource: &ResourceDescriptor,
        admin_password: &AdminPassword,
    ) -> Result<(), ProviderError> {
        let span = info_span!(
            "arm.create",
            resource.kind = %resource.kind,
            resource.name = %resource.name
        );

        async move {
            match &resource.config {
                DesiredConfig::ResourceGroup { location } => {
                    let body = ResourceGroupRequest { location };
                    self.client
                        .put_and_wait(&self.resource_path(resource, true)?, &body, &resource.name)
                        .await
                }
                DesiredConfig::StorageAccount {
                    location,
                    sku,
                    hierarchical_namespace,
                    ..
                } => {
                    self.create_storage_account(resource, location, sku, *hierarchical_namespace)
                        .await
                }
                DesiredConfig::SqlServer {
                    location,
                    admin_login,
                    version,
                    ..
                } => {
                    self.create_sql_server(resource, location, admin_login, version, admin_password)
                        .await
                }
                DesiredConfig::SqlDatabase { location, sku, .. } => {
                    let body = SqlDatabaseRequest {
                        location,
                        sku: Sku {
                            name: &sku.name,
                            tier: Some(sku.tier.as_str()),
                            capacity: Some(sku.capacity),
                        },
                    };
                    self.client
                        .put_and_wait(&self.resource_path(resource, true)?, &body, &resource.name)
                        .await
                }
                DesiredConfig::DataFactory { location } => {
                    let body = DataFactoryRequest {
                        location,
                        identity: Identity {
                            kind: "SystemAssigned",
                        },
                    };
                    self.client
                        .put_and_wait(&self.resource_path(resource, true)?, &body, &resource.name)
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn ensure_children(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError> {
        let span = info_span!(
            "arm.children",
            resource.kind = %resource.kind,
            resource.name = %resource.name
        );

        async move {
            match &resource.config {
                DesiredConfig::StorageAccount { containers, .. } => {
                    self.ensure_containers(&resource.name, containers).await
                }
                DesiredConfig::SqlServer { firewall_rules, .. } => {
                    self.ensure_firewall_rules(&resource.name, firewall_rules)
                        .await
                }
                DesiredConfig::ResourceGroup { .. }
                | DesiredConfig::SqlDatabase { .. }
                | DesiredConfig::DataFactory { .. } => Ok(()),
            }
        }
        .instrument(span)
        .await
    }

    async fn connection_material(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<ConnectionMaterial, ProviderError> {
        match resource.kind {
            ResourceKind::BlobStorageAccount | ResourceKind::DataLakeAccount => {
                Ok(ConnectionMaterial::StorageAccount {
                    connection_string: self.storage_connection_string(resource).await?,
                })
            }
            ResourceKind::SqlServer => {
                let server: Option<ResourceEnvelope> = self
                    .client
                    .get(&self.resource_path(resource, false)?, &resource.name)
                    .await?;
                let fqdn = server
                    .and_then(|s| s.properties.fully_qualified_domain_name)
                    .unwrap_or_else(|| format!("{}.{SQL_DNS_SUFFIX}", resource.name));
                Ok(ConnectionMaterial::SqlServer { fqdn })
            }
            ResourceKind::ResourceGroup
            | ResourceKind::SqlDatabase
            | ResourceKind::OrchestrationService => Ok(ConnectionMaterial::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_suffix() {
        assert_eq!(
            endpoint_suffix("https://scasa1.blob.core.windows.net/").as_deref(),
            Some("core.windows.net")
        );
        assert_eq!(
            endpoint_suffix("https://scasa1.blob.core.chinacloudapi.cn/").as_deref(),
            Some("core.chinacloudapi.cn")
        );
        assert_eq!(endpoint_suffix("not a url"), None);
    }
}
