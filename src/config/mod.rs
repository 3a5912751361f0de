//! # Configuration
//!
//! Environment config, admin password resolution and name validation.

pub mod environment;
pub mod password;
pub mod validation;

pub use environment::{AuthMethod, ConfigSource, EnvironmentConfig, FirewallRule, SqlDatabaseSku};
pub use password::{prompt_terminal, AdminPassword, PasswordSource};
