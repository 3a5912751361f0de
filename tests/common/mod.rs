//! Common test utilities shared by the integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use sca_infra::config::{AdminPassword, ConfigSource, EnvironmentConfig};
use std::path::Path;
use std::sync::Once;

static RUSTLS_INIT: Once = Once::new();

pub const SUBSCRIPTION_ID: &str = "3f2b1c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d";
pub const ADMIN_PASSWORD: &str = "S3cure!Passw0rd";

/// Install the ring crypto provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Another test in this binary may have installed it already
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Config for a dev environment whose credential store lives in `dir`
pub fn test_config(dir: &Path, extra: &[(&str, &str)]) -> EnvironmentConfig {
    let store_path = dir.join("config").join("azure_resources.env");
    let mut pairs = vec![
        ("AZURE_SUBSCRIPTION_ID".to_string(), SUBSCRIPTION_ID.to_string()),
        (
            "CREDENTIAL_STORE_PATH".to_string(),
            store_path.display().to_string(),
        ),
    ];
    pairs.extend(extra.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));

    EnvironmentConfig::from_source(&ConfigSource::from_pairs(pairs))
        .expect("test config should be valid")
}

pub fn admin_password() -> AdminPassword {
    AdminPassword::new(ADMIN_PASSWORD, "sqladmin").expect("test password should be valid")
}
