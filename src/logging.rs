//! # Logging
//!
//! Tracing subscriber setup shared by both binaries.

use crate::constants::DEFAULT_LOG_FILTER;
use tracing::debug;

/// Initialize tracing with an `EnvFilter` (RUST_LOG overrides the default)
///
/// Also installs the ring rustls crypto provider, which must happen before
/// any TLS connection is opened.
pub fn init() {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    // try_init: tests and embedding callers may already own a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_target(false)
        .try_init();

    if !provider_installed {
        debug!("rustls crypto provider was already installed");
    }
}
