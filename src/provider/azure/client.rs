//! # ARM REST Client
//!
//! Thin reqwest client for Azure Resource Manager.
//!
//! - Every request carries a fresh bearer token from an [`AccessTokenSource`]
//! - ARM error envelopes are classified into [`ProviderError`]
//! - `PUT` follows long-running operations (`Azure-AsyncOperation`,
//!   `Location`, or a non-terminal `provisioningState`) until they finish,
//!   honoring `Retry-After`, within a fixed ceiling
//!
//! References:
//! - [ARM async operations](https://learn.microsoft.com/en-us/azure/azure-resource-manager/management/async-operations)

use super::auth::AccessTokenSource;
use super::responses::{
    terminal_state, ArmErrorResponse, OperationStatus, ResourceEnvelope, TerminalState,
};
use crate::constants::{DEFAULT_POLL_INTERVAL_SECS, MAX_OPERATION_WAIT_SECS};
use crate::provider::ProviderError;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

pub struct ArmClient {
    http_client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    /// # Errors
    /// Returns `ProviderError::Transport` if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, ProviderError> {
        // Create HTTP client with rustls (already configured in Cargo.toml)
        let http_client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_wait: Duration::from_secs(MAX_OPERATION_WAIT_SECS),
        })
    }

    /// Override the default poll interval and the long-running operation ceiling
    #[must_use]
    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    /// Token check without touching any resource
    ///
    /// # Errors
    /// Returns `ProviderError::Authentication` if no token can be acquired
    pub async fn ensure_token(&self) -> Result<(), ProviderError> {
        self.tokens.bearer_token().await.map(|_| ())
    }

    /// Build HTTP request with authentication headers
    ///
    /// Absolute URLs (polling locations returned by ARM) are used as-is.
    async fn make_request(&self, method: Method, path: &str) -> Result<RequestBuilder, ProviderError> {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        let token = self.tokens.bearer_token().await?;

        Ok(self
            .http_client
            .request(method, url)
            .bearer_auth(token.as_str())
            .header("Accept", "application/json"))
    }

    async fn send(request: RequestBuilder) -> Result<Response, ProviderError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Transport(format!("request timed out: {e}"))
            } else {
                ProviderError::Transport(e.to_string())
            }
        })
    }

    /// Turn a non-success response into a classified error
    async fn error_from(response: Response, name: &str) -> ProviderError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ArmErrorResponse>(&text) {
            Ok(body) => {
                ProviderError::classify(status.as_u16(), &body.error.code, &body.error.message, name)
            }
            Err(_) => ProviderError::classify(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &text,
                name,
            ),
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response body: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("unexpected response body: {e}")))
    }

    /// GET a resource; `Ok(None)` when ARM answers 404
    ///
    /// # Errors
    /// Returns a classified `ProviderError` for any other non-success status
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        name: &str,
    ) -> Result<Option<T>, ProviderError> {
        let response = Self::send(self.make_request(Method::GET, path).await?).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::parse_json(response).await.map(Some),
            _ => Err(Self::error_from(response, name).await),
        }
    }

    /// POST an action (`listKeys`, `checkNameAvailability`)
    ///
    /// # Errors
    /// Returns a classified `ProviderError` for a non-success status
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>, name: &str) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self.make_request(Method::POST, path).await?;
        request = match body {
            Some(body) => request.json(body),
            None => request.header("Content-Length", "0"),
        };

        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, name).await);
        }
        Self::parse_json(response).await
    }

    /// PUT a resource and wait for the provider to report completion
    ///
    /// # Errors
    /// Returns a classified `ProviderError` if the request or the operation
    /// fails, or `ProviderError::Timeout` past the polling ceiling
    pub async fn put_and_wait<B>(&self, path: &str, body: &B, name: &str) -> Result<(), ProviderError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let span = info_span!("arm.put", resource.name = name);

        async move {
            let deadline = Instant::now() + self.max_wait;
            let response =
                Self::send(self.make_request(Method::PUT, path).await?.json(body)).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Self::error_from(response, name).await);
            }

            let headers = response.headers().clone();
            if let Some(url) = header_value(&headers, AZURE_ASYNC_OPERATION) {
                debug!("Following Azure-AsyncOperation");
                return self
                    .poll_async_operation(&url, self.retry_after(&headers), deadline, name)
                    .await;
            }
            if status == StatusCode::ACCEPTED {
                if let Some(url) = header_value(&headers, LOCATION.as_str()) {
                    debug!("Following Location header");
                    return self
                        .poll_location(&url, self.retry_after(&headers), deadline, name)
                        .await;
                }
            }

            let text = response.text().await.unwrap_or_default();
            let state = if text.trim().is_empty() {
                None
            } else {
                serde_json::from_str::<ResourceEnvelope>(&text)
                    .ok()
                    .and_then(|body| body.properties.provisioning_state)
            };

            match state.as_deref().map(|s| (s, terminal_state(s))) {
                None | Some((_, Some(TerminalState::Succeeded))) => Ok(()),
                Some((state, Some(_))) => Err(ProviderError::Provider {
                    status: status.as_u16(),
                    code: format!("Provisioning{state}"),
                    message: format!("provisioningState is {state}"),
                }),
                Some((_, None)) => {
                    self.poll_provisioning_state(path, self.poll_interval, deadline, name)
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    fn retry_after(&self, headers: &HeaderMap) -> Duration {
        header_value(headers, RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(self.poll_interval, Duration::from_secs)
    }

    async fn wait(&self, delay: Duration, deadline: Instant) -> Result<(), ProviderError> {
        if Instant::now() + delay > deadline {
            return Err(ProviderError::Timeout(self.max_wait));
        }
        tokio::time::sleep(delay).await;
        Ok(())
    }

    async fn poll_async_operation(
        &self,
        url: &str,
        mut delay: Duration,
        deadline: Instant,
        name: &str,
    ) -> Result<(), ProviderError> {
        loop {
            self.wait(delay, deadline).await?;
            let response = Self::send(self.make_request(Method::GET, url).await?).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Self::error_from(response, name).await);
            }
            delay = self.retry_after(response.headers());

            let operation: OperationStatus = Self::parse_json(response).await?;
            match terminal_state(&operation.status) {
                None => debug!(status = %operation.status, "Operation still running"),
                Some(TerminalState::Succeeded) => return Ok(()),
                Some(_) => {
                    let error = operation.error.unwrap_or_default();
                    return Err(ProviderError::classify(
                        status.as_u16(),
                        &error.code,
                        &error.message,
                        name,
                    ));
                }
            }
        }
    }

    async fn poll_location(
        &self,
        url: &str,
        mut delay: Duration,
        deadline: Instant,
        name: &str,
    ) -> Result<(), ProviderError> {
        loop {
            self.wait(delay, deadline).await?;
            let response = Self::send(self.make_request(Method::GET, url).await?).await?;
            match response.status() {
                StatusCode::ACCEPTED => {
                    delay = self.retry_after(response.headers());
                    debug!("Operation still running");
                }
                status if status.is_success() => return Ok(()),
                _ => return Err(Self::error_from(response, name).await),
            }
        }
    }

    async fn poll_provisioning_state(
        &self,
        path: &str,
        delay: Duration,
        deadline: Instant,
        name: &str,
    ) -> Result<(), ProviderError> {
        loop {
            self.wait(delay, deadline).await?;
            let body: ResourceEnvelope = self.get(path, name).await?.ok_or_else(|| {
                ProviderError::InvalidResponse(format!("{name} disappeared while provisioning"))
            })?;
            let state = body.properties.provisioning_state;
            match state.as_deref().map(|s| (s, terminal_state(s))) {
                None | Some((_, Some(TerminalState::Succeeded))) => return Ok(()),
                Some((state, Some(_))) => {
                    return Err(ProviderError::Provider {
                        status: StatusCode::OK.as_u16(),
                        code: format!("Provisioning{state}"),
                        message: format!("provisioningState is {state}"),
                    })
                }
                Some((state, None)) => debug!(state, "Resource still provisioning"),
            }
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
