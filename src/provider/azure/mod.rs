//! # Azure Provider
//!
//! Azure Resource Manager implementation of `ResourceProvider`.

pub mod auth;
pub mod client;
pub mod requests;
pub mod resource_manager;
pub mod responses;

pub use auth::{AccessTokenSource, CredentialTokenSource, StaticTokenSource};
pub use client::ArmClient;
pub use resource_manager::AzureResourceManager;
