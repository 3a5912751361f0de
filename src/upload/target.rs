//! # Upload Target
//!
//! Resolves the destination container and its connection string from the
//! credential store written by the provisioner.

use crate::config::ConfigSource;
use crate::constants::DEFAULT_CREDENTIAL_STORE_PATH;
use crate::credentials::{CredentialStore, ResourceStatus};
use crate::error::{ConfigError, FieldIssue};
use crate::resource::ResourceKind;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

const CONNECTION_STRING_KEY: &str = "STORAGE_CONNECTION_STRING";
const CONTAINER_KEY: &str = "STORAGE_CONTAINER_NAME";
const STORE_PATH_KEY: &str = "CREDENTIAL_STORE_PATH";

/// Credential store the provisioner wrote to
///
/// `explicit` (flag or process environment) wins, then `CREDENTIAL_STORE_PATH`
/// from the layered config, then the default location.
#[must_use]
pub fn credential_store_path(explicit: Option<PathBuf>, source: &ConfigSource) -> PathBuf {
    explicit
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| source.get(STORE_PATH_KEY).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_STORE_PATH))
}

pub struct UploadTarget {
    pub container: String,
    connection_string: Zeroizing<String>,
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl UploadTarget {
    /// Read the blob storage section of `store`
    ///
    /// `container` overrides `STORAGE_CONTAINER_NAME`.
    ///
    /// # Errors
    /// Returns a `ConfigError` when the store is empty, the blob storage
    /// account was not provisioned successfully, or a key is missing
    pub fn from_store(
        store: &CredentialStore,
        container: Option<String>,
    ) -> Result<Self, ConfigError> {
        let store_field = store.path().display().to_string();
        if store.is_empty() {
            return Err(ConfigError::single(
                store_field,
                "credential store is missing or empty; run sca-provision first",
            ));
        }

        let kind = ResourceKind::BlobStorageAccount;
        if store.status(kind) != Some(ResourceStatus::Complete) {
            return Err(ConfigError::single(
                kind.status_key(),
                "blob storage account is not provisioned; run sca-provision first",
            ));
        }

        let mut issues = Vec::new();
        let connection_string = store.get(CONNECTION_STRING_KEY).map(str::to_string);
        if connection_string.is_none() {
            issues.push(FieldIssue::new(CONNECTION_STRING_KEY, "is missing"));
        }
        let container = container
            .filter(|c| !c.is_empty())
            .or_else(|| store.get(CONTAINER_KEY).map(str::to_string));
        if container.is_none() {
            issues.push(FieldIssue::new(
                CONTAINER_KEY,
                "is missing; pass --container",
            ));
        }

        match (connection_string, container) {
            (Some(connection_string), Some(container)) => Ok(Self {
                container,
                connection_string: Zeroizing::new(connection_string),
            }),
            _ => Err(ConfigError { issues }),
        }
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}
