//! # Provider Modules
//!
//! The management-plane seam used by the provisioner.
//!
//! A `ResourceProvider` answers four questions per resource: does it exist,
//! is its (globally unique) name free, create it, and hand back its
//! connection material. The Azure Resource Manager implementation lives in
//! [`azure`]; tests drive the provisioner with an in-memory provider.

use crate::config::AdminPassword;
use crate::resource::{ResourceDescriptor, ResourceState};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod azure;

/// ARM error codes meaning "this global name belongs to someone else"
const NAME_COLLISION_CODES: &[&str] = &[
    "StorageAccountAlreadyTaken",
    "StorageAccountAlreadyExists",
    "NameAlreadyExists",
    "ServerNameAlreadyExists",
    "DataFactoryNameInUse",
];

/// Substrings of ARM error codes meaning quota or region restrictions
const QUOTA_OR_REGION_MARKERS: &[&str] = &[
    "Quota",
    "RegionDoesNotAllowProvisioning",
    "LocationNotAvailableForResourceType",
    "SkuNotAvailable",
    "ProvisioningDisabled",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("name '{name}' is not available: {message}")]
    NameCollision { name: String, message: String },

    #[error("quota or region restriction ({code}): {message}")]
    QuotaOrRegion { code: String, message: String },

    #[error("provider error {status} ({code}): {message}")]
    Provider {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation did not finish within {0:?}")]
    Timeout(Duration),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Classify an error reported by the provider for resource `name`
    ///
    /// 401/403 are authentication failures; known collision codes and
    /// quota/region codes get their own variants; everything else keeps the
    /// provider's status, code and message.
    #[must_use]
    pub fn classify(status: u16, code: &str, message: &str, name: &str) -> Self {
        if status == 401 || status == 403 {
            return Self::Authentication(format!("{code}: {message}"));
        }
        if NAME_COLLISION_CODES.contains(&code) {
            return Self::NameCollision {
                name: name.to_string(),
                message: message.to_string(),
            };
        }
        if QUOTA_OR_REGION_MARKERS
            .iter()
            .any(|marker| code.contains(marker))
        {
            return Self::QuotaOrRegion {
                code: code.to_string(),
                message: message.to_string(),
            };
        }
        Self::Provider {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_name_collision(&self) -> bool {
        matches!(self, Self::NameCollision { .. })
    }
}

/// What a resource hands back once it exists
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionMaterial {
    None,
    StorageAccount { connection_string: String },
    SqlServer { fqdn: String },
}

impl fmt::Debug for ConnectionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::StorageAccount { .. } => f
                .debug_struct("StorageAccount")
                .finish_non_exhaustive(),
            Self::SqlServer { fqdn } => f.debug_struct("SqlServer").field("fqdn", fqdn).finish(),
        }
    }
}

/// Provider trait for cloud resource managers
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Verify credentials before any resource is touched
    async fn authenticate(&self) -> Result<(), ProviderError>;

    /// Existence check for {resource group, name}
    async fn inspect(&self, resource: &ResourceDescriptor) -> ResourceState;

    /// Pre-validate a global name; kinds without global names are always available
    async fn name_available(&self, resource: &ResourceDescriptor) -> Result<bool, ProviderError>;

    /// Create with the desired configuration and block until the provider is done
    async fn create(
        &self,
        resource: &ResourceDescriptor,
        admin_password: &AdminPassword,
    ) -> Result<(), ProviderError>;

    /// Create child objects (containers, firewall rules) that do not exist yet
    ///
    /// Runs for created and reused parents alike. Children that already exist
    /// are left as they are.
    async fn ensure_children(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError>;

    async fn connection_material(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<ConnectionMaterial, ProviderError>;
}
