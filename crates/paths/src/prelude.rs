//! # Prelude
//!
//! ```rust
//! use sca_paths::prelude::*;
//! ```

pub use crate::builder::PathBuilder;
pub use crate::errors::PathBuilderError;
pub use crate::formats::PathFormat;
pub use crate::namespace::Namespace;
pub use crate::operations::ArmOperation;
