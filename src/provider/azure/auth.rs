//! # Azure Authentication
//!
//! Bearer tokens for Azure Resource Manager.
//!
//! Supports:
//! - Azure CLI (`az login` session of the operator, the default)
//! - Managed Identity (Azure-hosted runners)
//! - Workload Identity (federated credentials, client id required)

use crate::config::AuthMethod;
use crate::provider::ProviderError;
use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_identity::{AzureCliCredential, ManagedIdentityCredential, WorkloadIdentityCredential};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Source of ARM bearer tokens
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<Zeroizing<String>, ProviderError>;
}

/// Token source backed by an `azure_identity` credential
///
/// The credential caches tokens and refreshes them before expiry.
pub struct CredentialTokenSource {
    credential: Arc<dyn TokenCredential>,
    method: AuthMethod,
    scope: String,
}

impl std::fmt::Debug for CredentialTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialTokenSource")
            .field("method", &self.method)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl CredentialTokenSource {
    /// Build the credential for the configured auth method
    ///
    /// Tokens are requested for the audience of `arm_endpoint`.
    ///
    /// # Errors
    /// Returns `ProviderError::Authentication` if the credential cannot be created
    pub fn from_method(method: &AuthMethod, arm_endpoint: &str) -> Result<Self, ProviderError> {
        let credential: Arc<dyn TokenCredential> = match method {
            AuthMethod::AzureCli => {
                info!("Using Azure CLI authentication (run `az login` first)");
                AzureCliCredential::new(None).map_err(|e| {
                    ProviderError::Authentication(format!(
                        "failed to create AzureCliCredential: {e}"
                    ))
                })?
            }
            AuthMethod::ManagedIdentity => {
                info!("Using Managed Identity authentication");
                ManagedIdentityCredential::new(None).map_err(|e| {
                    ProviderError::Authentication(format!(
                        "failed to create ManagedIdentityCredential: {e}"
                    ))
                })?
            }
            AuthMethod::WorkloadIdentity { client_id } => {
                info!(
                    "Using Azure Workload Identity authentication with client ID: {}",
                    client_id
                );
                let options = azure_identity::WorkloadIdentityCredentialOptions {
                    client_id: Some(client_id.clone()),
                    ..Default::default()
                };
                WorkloadIdentityCredential::new(Some(options)).map_err(|e| {
                    ProviderError::Authentication(format!(
                        "failed to create WorkloadIdentityCredential: {e}"
                    ))
                })?
            }
        };

        Ok(Self {
            credential,
            method: method.clone(),
            scope: token_scope(arm_endpoint),
        })
    }
}

#[async_trait]
impl AccessTokenSource for CredentialTokenSource {
    async fn bearer_token(&self) -> Result<Zeroizing<String>, ProviderError> {
        let token = self
            .credential
            .get_token(&[self.scope.as_str()], None)
            .await
            .map_err(|e| {
                ProviderError::Authentication(format!(
                    "could not acquire a token via {}: {e}",
                    self.method
                ))
            })?;
        debug!(method = %self.method, "Acquired ARM access token");
        Ok(Zeroizing::new(token.token.secret().to_string()))
    }
}

/// `.default` scope for a Resource Manager endpoint
///
/// Sovereign clouds have their own audience.
#[must_use]
pub fn token_scope(arm_endpoint: &str) -> String {
    format!("{}/.default", arm_endpoint.trim_end_matches('/'))
}

/// Pre-acquired bearer token, for local fake endpoints and tests
pub struct StaticTokenSource(Zeroizing<String>);

impl std::fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticTokenSource(***)")
    }
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn bearer_token(&self) -> Result<Zeroizing<String>, ProviderError> {
        Ok(self.0.clone())
    }
}
