//! HTTP checkout-session client.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CheckoutConfig;
use crate::error::{AssistantError, Result};
use crate::tools::{CheckoutRequest, CheckoutService};

/// Posts `{store_id, merchant_id, items}` and expects `{url}` back.
#[derive(Debug, Clone)]
pub struct HttpCheckoutService {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

impl HttpCheckoutService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// `None` when no endpoint is configured.
    pub fn from_config(config: &CheckoutConfig) -> Option<Self> {
        let endpoint = config.endpoint.trim();
        (!endpoint.is_empty()).then(|| Self::new(endpoint))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CheckoutService for HttpCheckoutService {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| AssistantError::CheckoutError(format!("checkout request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::CheckoutError(format!(
                "checkout HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::CheckoutError(format!("malformed checkout response: {e}")))?;
        session
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AssistantError::CheckoutError("checkout response has no url".into()))
    }
}
