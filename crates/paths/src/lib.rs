//! Azure Resource Manager (ARM) path definitions
//!
//! This crate centralizes every management-plane path the provisioner
//! issues so the ARM client, the provider implementation and the test
//! fakes agree on a single source of truth.
//!
//! ## Quick Start
//!
//! ```rust
//! use sca_paths::prelude::*;
//!
//! let path = PathBuilder::new()
//!     .operation(ArmOperation::GetStorageAccount)
//!     .subscription("00000000-0000-0000-0000-000000000000")
//!     .resource_group("sca-rg-dev")
//!     .name("scasa1234abcd")
//!     .build_http_path()
//!     .unwrap();
//! assert!(path.ends_with("?api-version=2023-01-01"));
//! ```
//!
//! ## PathBuilder
//!
//! `PathBuilder` validates that every parameter an operation needs is set
//! and renders either the bare resource id or the full request path with
//! the namespace's `api-version`.

pub mod arm;

pub mod builder;
pub mod errors;
pub mod formats;
pub mod namespace;
pub mod operations;
pub mod prelude;
