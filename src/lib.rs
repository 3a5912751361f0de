//! Supply Chain Analytics Infrastructure Library
//!
//! Core of the two operator tools:
//!
//! - **Provisioner** (`sca-provision`): idempotently creates the Azure
//!   resource topology (resource group, blob and data lake storage, SQL
//!   server and database, Data Factory) and persists connection material
//!   in a local credential store.
//! - **Uploader** (`sca-upload`): pushes generated master-data files into
//!   the provisioned blob container with skip, overwrite and dry-run
//!   semantics.
//!
//! The credential store is the only coupling between the two.

pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod provider;
pub mod provisioner;
pub mod resource;
pub mod upload;

pub use error::{ConfigError, ProvisionError, UploadError};
pub use provisioner::{ProvisionReport, Provisioner};
pub use upload::{UploadReport, Uploader};
