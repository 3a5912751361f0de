//! # Blob Store
//!
//! The uploader's view of a remote container: does it exist, does an object
//! exist, put an object. Backed by `object_store`'s Azure client in
//! production and by `object_store::memory::InMemory` in tests.

use async_trait::async_trait;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("invalid blob path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("storage request failed: {0}")]
    Request(String),
}

impl From<object_store::Error> for BlobStoreError {
    fn from(e: object_store::Error) -> Self {
        Self::Request(e.to_string())
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Container name, for messages and the audit log
    fn container(&self) -> &str;

    async fn container_exists(&self) -> Result<bool, BlobStoreError>;

    async fn exists(&self, path: &str) -> Result<bool, BlobStoreError>;

    /// Create or replace the object at `path`
    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), BlobStoreError>;
}

/// Parsed `DefaultEndpointsProtocol=...;AccountName=...;AccountKey=...` string
pub struct StorageConnection {
    pub account_name: String,
    account_key: Zeroizing<String>,
    /// Explicit blob endpoint (emulator, sovereign cloud or private link)
    pub blob_endpoint: Option<String>,
}

impl fmt::Debug for StorageConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConnection")
            .field("account_name", &self.account_name)
            .field("blob_endpoint", &self.blob_endpoint)
            .finish_non_exhaustive()
    }
}

impl StorageConnection {
    /// # Errors
    /// Returns `BlobStoreError::InvalidConnectionString` naming the missing part
    pub fn parse(connection_string: &str) -> Result<Self, BlobStoreError> {
        let mut protocol = "https".to_string();
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;
        let mut endpoint_suffix = None;

        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may end in '='; split on the first one only
            let Some((key, value)) = part.split_once('=') else {
                return Err(BlobStoreError::InvalidConnectionString(format!(
                    "segment without '=' near '{}'",
                    part.chars().take(20).collect::<String>()
                )));
            };
            match key {
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(Zeroizing::new(value.to_string())),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "EndpointSuffix" => endpoint_suffix = Some(value.to_string()),
                _ => {}
            }
        }

        let account_name = account_name.ok_or_else(|| {
            BlobStoreError::InvalidConnectionString("AccountName is missing".to_string())
        })?;
        let account_key = account_key.ok_or_else(|| {
            BlobStoreError::InvalidConnectionString("AccountKey is missing".to_string())
        })?;

        let blob_endpoint = blob_endpoint.or_else(|| {
            endpoint_suffix
                .filter(|suffix| suffix != DEFAULT_ENDPOINT_SUFFIX)
                .map(|suffix| format!("{protocol}://{account_name}.blob.{suffix}"))
        });

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }
}

/// `BlobStore` over any `object_store` backend
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
    container: String,
}

impl fmt::Debug for ObjectStoreBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreBlobStore")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    /// Azure Blob Storage client for `container` from a storage connection string
    ///
    /// # Errors
    /// Returns an error if the connection string is incomplete or the client
    /// cannot be built
    pub fn from_connection_string(
        connection_string: &str,
        container: &str,
    ) -> Result<Self, BlobStoreError> {
        let connection = StorageConnection::parse(connection_string)?;

        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&connection.account_name)
            .with_access_key(connection.account_key.as_str())
            .with_container_name(container);

        if let Some(endpoint) = &connection.blob_endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build()?;
        Ok(Self::new(Arc::new(store), container))
    }

    fn object_path(path: &str) -> Result<ObjectPath, BlobStoreError> {
        ObjectPath::parse(path).map_err(|e| BlobStoreError::InvalidPath {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> Result<bool, BlobStoreError> {
        match self.store.list_with_delimiter(None).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) if e.to_string().contains("ContainerNotFound") => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, BlobStoreError> {
        match self.store.head(&Self::object_path(path)?).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> Result<(), BlobStoreError> {
        self.store
            .put(&Self::object_path(path)?, PutPayload::from(data))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_parse_azure_connection_string() {
        let connection = StorageConnection::parse(
            "DefaultEndpointsProtocol=https;AccountName=scasa1a2b3c4d;AccountKey=a2V5PT0=;EndpointSuffix=core.windows.net",
        )
        .unwrap();
        assert_eq!(connection.account_name, "scasa1a2b3c4d");
        assert_eq!(connection.account_key.as_str(), "a2V5PT0=");
        assert_eq!(connection.blob_endpoint, None);
        assert!(!format!("{connection:?}").contains("a2V5PT0"));
    }

    #[test]
    fn test_parse_custom_endpoints() {
        let emulator = StorageConnection::parse(
            "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/",
        )
        .unwrap();
        assert_eq!(
            emulator.blob_endpoint.as_deref(),
            Some("http://127.0.0.1:10000/devstoreaccount1")
        );

        let sovereign = StorageConnection::parse(
            "AccountName=scasa1;AccountKey=a2V5;EndpointSuffix=core.chinacloudapi.cn",
        )
        .unwrap();
        assert_eq!(
            sovereign.blob_endpoint.as_deref(),
            Some("https://scasa1.blob.core.chinacloudapi.cn")
        );
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert!(StorageConnection::parse("AccountName=scasa1").is_err());
        assert!(StorageConnection::parse("AccountKey=a2V5").is_err());
        assert!(StorageConnection::parse("garbage").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_exists_and_put() {
        let store = ObjectStoreBlobStore::new(Arc::new(InMemory::new()), "master-data");
        assert!(store.container_exists().await.unwrap());
        assert!(!store.exists("products/products_master.tsv.gz").await.unwrap());

        store
            .put("products/products_master.tsv.gz", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(store.exists("products/products_master.tsv.gz").await.unwrap());
    }
}
