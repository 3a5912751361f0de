//! # Errors
//!
//! Error taxonomy shared by the provisioner and the uploader.
//!
//! Pre-flight errors (configuration, authentication, missing container)
//! abort a run. Per-resource and per-file errors are recorded in the
//! respective report and never stop sibling work.

use crate::credentials::CredentialStoreError;
use crate::provider::ProviderError;
use crate::resource::ResourceKind;
use crate::upload::BlobStoreError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single invalid or missing configuration field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Missing or invalid input, reported before any network call
///
/// Carries every field issue found, not just the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration:{}", format_issues(.issues))]
pub struct ConfigError {
    pub issues: Vec<FieldIssue>,
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues.iter().map(|issue| format!("\n  - {issue}")).collect()
}

impl ConfigError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Whether a given field has an issue
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

/// Creation or resolution failure for one resource
///
/// Fatal for that resource only; sibling resources are still attempted.
#[derive(Debug, Error)]
#[error("{kind} '{name}' failed: {source}")]
pub struct ResourceCreationError {
    pub kind: ResourceKind,
    pub name: String,
    #[source]
    pub source: ProviderError,
}

/// Fatal provisioning errors that abort the whole run
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("credential store error: {0}")]
    CredentialStore(#[from] CredentialStoreError),
}

/// Failure uploading one file; recorded in the report, the batch continues
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer of {path} failed: {message}")]
pub struct TransferError {
    pub path: String,
    pub message: String,
}

/// Fatal uploader errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("container '{container}' does not exist; run the provisioner first")]
    ContainerNotFound { container: String },

    #[error("storage connectivity check failed: {0}")]
    Store(#[from] BlobStoreError),

    #[error("failed to enumerate data files under {root}: {message}")]
    Enumeration { root: PathBuf, message: String },

    #[error("failed to write audit log: {0}")]
    AuditLog(#[source] std::io::Error),
}
