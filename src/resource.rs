//! # Resources
//!
//! The fixed topology the provisioner manages, and the pure decision that
//! turns an existence check into reuse, create or abort.
//!
//! | Kind | Name | Desired configuration |
//! |---|---|---|
//! | `ResourceGroup` | `RESOURCE_GROUP` | location |
//! | `BlobStorageAccount` | prefix + suffix | StorageV2, SKU, HTTPS only, TLS1_2, master data container |
//! | `DataLakeAccount` | prefix + suffix | as above + hierarchical namespace, stage containers |
//! | `SqlServer` | prefix + suffix | version 12.0, admin login, firewall rules |
//! | `SqlDatabase` | `SQL_DATABASE_NAME` | SKU name/tier/capacity |
//! | `OrchestrationService` | prefix + suffix | system-assigned identity |

use crate::config::{EnvironmentConfig, FirewallRule, SqlDatabaseSku};
use crate::constants::{NAME_SUFFIX_LEN, SQL_SERVER_VERSION};
use crate::provider::ProviderError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ResourceGroup,
    BlobStorageAccount,
    DataLakeAccount,
    SqlServer,
    SqlDatabase,
    OrchestrationService,
}

impl ResourceKind {
    /// Provisioning order; parents precede children
    pub const ALL: [Self; 6] = [
        Self::ResourceGroup,
        Self::BlobStorageAccount,
        Self::DataLakeAccount,
        Self::SqlServer,
        Self::SqlDatabase,
        Self::OrchestrationService,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResourceGroup => "ResourceGroup",
            Self::BlobStorageAccount => "BlobStorageAccount",
            Self::DataLakeAccount => "DataLakeAccount",
            Self::SqlServer => "SqlServer",
            Self::SqlDatabase => "SqlDatabase",
            Self::OrchestrationService => "OrchestrationService",
        }
    }

    /// Credential store key holding the resource name
    #[must_use]
    pub fn name_key(self) -> &'static str {
        match self {
            Self::ResourceGroup => "RESOURCE_GROUP",
            Self::BlobStorageAccount => "STORAGE_ACCOUNT_NAME",
            Self::DataLakeAccount => "DATALAKE_ACCOUNT_NAME",
            Self::SqlServer => "SQL_SERVER_NAME",
            Self::SqlDatabase => "SQL_DATABASE_NAME",
            Self::OrchestrationService => "DATA_FACTORY_NAME",
        }
    }

    /// Credential store key holding `complete | failed | incomplete`
    #[must_use]
    pub fn status_key(self) -> &'static str {
        match self {
            Self::ResourceGroup => "RESOURCE_GROUP_STATUS",
            Self::BlobStorageAccount => "STORAGE_STATUS",
            Self::DataLakeAccount => "DATALAKE_STATUS",
            Self::SqlServer => "SQL_SERVER_STATUS",
            Self::SqlDatabase => "SQL_DATABASE_STATUS",
            Self::OrchestrationService => "DATA_FACTORY_STATUS",
        }
    }

    /// Connection material keys; present only while the resource is complete
    #[must_use]
    pub fn material_keys(self) -> &'static [&'static str] {
        match self {
            Self::BlobStorageAccount => &["STORAGE_CONNECTION_STRING", "STORAGE_CONTAINER_NAME"],
            Self::DataLakeAccount => &["DATALAKE_CONNECTION_STRING", "DATALAKE_CONTAINERS"],
            Self::SqlServer => &["SQL_SERVER_FQDN", "SQL_ADMIN_USERNAME", "SQL_ADMIN_PASSWORD"],
            Self::ResourceGroup | Self::SqlDatabase | Self::OrchestrationService => &[],
        }
    }

    /// Names that must be unique across all of Azure, not just the resource group
    #[must_use]
    pub fn is_globally_named(self) -> bool {
        matches!(
            self,
            Self::BlobStorageAccount
                | Self::DataLakeAccount
                | Self::SqlServer
                | Self::OrchestrationService
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired configuration, applied only when a resource is created
///
/// Containers and firewall rules are children: missing ones are added to
/// reused parents too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredConfig {
    ResourceGroup {
        location: String,
    },
    StorageAccount {
        location: String,
        sku: String,
        hierarchical_namespace: bool,
        containers: Vec<String>,
    },
    SqlServer {
        location: String,
        admin_login: String,
        version: String,
        firewall_rules: Vec<FirewallRule>,
    },
    SqlDatabase {
        location: String,
        /// Parent server name
        server: String,
        sku: SqlDatabaseSku,
    },
    DataFactory {
        location: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    pub config: DesiredConfig,
}

impl ResourceDescriptor {
    /// Describe `kind` named `name` with the configuration from `config`
    ///
    /// `sql_server` is the parent of the database and ignored for other kinds.
    #[must_use]
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        config: &EnvironmentConfig,
        sql_server: &str,
    ) -> Self {
        let location = config.location.clone();
        let desired = match kind {
            ResourceKind::ResourceGroup => DesiredConfig::ResourceGroup { location },
            ResourceKind::BlobStorageAccount => DesiredConfig::StorageAccount {
                location,
                sku: config.storage_sku.clone(),
                hierarchical_namespace: false,
                containers: vec![config.master_data_container.clone()],
            },
            ResourceKind::DataLakeAccount => DesiredConfig::StorageAccount {
                location,
                sku: config.storage_sku.clone(),
                hierarchical_namespace: true,
                containers: config.datalake_containers.clone(),
            },
            ResourceKind::SqlServer => DesiredConfig::SqlServer {
                location,
                admin_login: config.sql_admin_login.clone(),
                version: SQL_SERVER_VERSION.to_string(),
                firewall_rules: config.firewall_rules.clone(),
            },
            ResourceKind::SqlDatabase => DesiredConfig::SqlDatabase {
                location,
                server: sql_server.to_string(),
                sku: config.sql_database_sku.clone(),
            },
            ResourceKind::OrchestrationService => DesiredConfig::DataFactory { location },
        };

        Self {
            kind,
            name: name.into(),
            config: desired,
        }
    }

    /// Parent SQL server, for databases
    #[must_use]
    pub fn parent_server(&self) -> Option<&str> {
        match &self.config {
            DesiredConfig::SqlDatabase { server, .. } => Some(server),
            _ => None,
        }
    }
}

/// Name for `kind` built from the configured prefix and `suffix`
#[must_use]
pub fn derive_name(config: &EnvironmentConfig, kind: ResourceKind, suffix: &str) -> String {
    match kind {
        ResourceKind::ResourceGroup => config.resource_group.clone(),
        ResourceKind::SqlDatabase => config.sql_database_name.clone(),
        ResourceKind::BlobStorageAccount => format!("{}{suffix}", config.storage_account_prefix),
        ResourceKind::DataLakeAccount => format!("{}{suffix}", config.datalake_account_prefix),
        ResourceKind::SqlServer => format!("{}{suffix}", config.sql_server_prefix),
        ResourceKind::OrchestrationService => format!("{}{suffix}", config.data_factory_prefix),
    }
}

/// Fresh lowercase hex suffix
#[must_use]
pub fn generate_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..NAME_SUFFIX_LEN].to_string()
}

/// Result of asking the provider whether a resource exists
#[derive(Debug, Clone)]
pub enum ResourceState {
    Absent,
    Present,
    /// The existence check itself failed; existence is not known
    Unknown(ProviderError),
}

#[derive(Debug, Clone)]
pub enum ExistenceDecision {
    /// Present: keep as is, never diff or update
    Reuse,
    Create,
    Abort(ProviderError),
}

/// Map an existence check result to what the provisioner does next
#[must_use]
pub fn decide(state: ResourceState) -> ExistenceDecision {
    match state {
        ResourceState::Present => ExistenceDecision::Reuse,
        ResourceState::Absent => ExistenceDecision::Create,
        ResourceState::Unknown(error) => ExistenceDecision::Abort(error),
    }
}
