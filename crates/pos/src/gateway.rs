//! Network submission of a sale.
//!
//! [`SaleGateway`] is the seam between the register and whatever receives
//! the sale. [`HttpSaleGateway`] posts the JSON payload to the sales backend
//! with `reqwest`, once, with no retry.

use std::future::Future;
use std::time::Duration;

use forneria_core::SaleId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::PosConfig;
use crate::sale::SaleRequest;

/// Header carrying the CSRF token expected by the sales backend.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Errors that prevent a sale response from being obtained.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with something that is not a sale response.
    #[error("invalid response from sales backend (HTTP {status}): {source}")]
    InvalidResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

/// Response body returned by the sales backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleResponse {
    /// `"success"` when the sale was recorded; anything else is a failure.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, rename = "venta_id", skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<SaleId>,
}

impl SaleResponse {
    pub const SUCCESS: &'static str = "success";

    #[must_use]
    pub fn success(sale_id: SaleId) -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
            message: None,
            sale_id: Some(sale_id),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            sale_id: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}

/// Something that can record a sale.
pub trait SaleGateway {
    /// Submit `request` once and return the backend's response.
    fn submit(
        &self,
        request: &SaleRequest,
    ) -> impl Future<Output = Result<SaleResponse, GatewayError>> + Send;
}

// =============================================================================
// HttpSaleGateway
// =============================================================================

/// Posts sales as JSON to the sales backend.
///
/// Implements `Debug` manually to redact the CSRF token.
#[derive(Clone)]
pub struct HttpSaleGateway {
    client: reqwest::Client,
    endpoint: Url,
    csrf_token: Option<SecretString>,
}

impl std::fmt::Debug for HttpSaleGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSaleGateway")
            .field("endpoint", &self.endpoint.as_str())
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpSaleGateway {
    /// Create a gateway posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        csrf_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            csrf_token,
        })
    }

    /// Create a gateway from register configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn from_config(config: &PosConfig, endpoint: Url) -> Result<Self, GatewayError> {
        Self::new(endpoint, config.csrf_token.clone(), config.request_timeout)
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SaleGateway for HttpSaleGateway {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, lines = request.lines.len()))]
    async fn submit(&self, request: &SaleRequest) -> Result<SaleResponse, GatewayError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(token) = &self.csrf_token {
            builder = builder.header(CSRF_HEADER, token.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();

        // The backend reports failures in the body, so read it whatever the status
        let response_text = response.text().await?;

        let body: SaleResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                status = %status,
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse sales backend response"
            );
            GatewayError::InvalidResponse {
                status: status.as_u16(),
                source: e,
            }
        })?;

        debug!(status = %status, sale_status = %body.status, "Sales backend responded");
        Ok(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_parse() {
        let response: SaleResponse =
            serde_json::from_str(r#"{"status": "success", "venta_id": 42}"#).unwrap();
        assert!(response.is_success());
        assert_eq!(response.sale_id, Some(SaleId::new(42)));
        assert!(response.message.is_none());
    }

    #[test]
    fn test_response_error_parse() {
        let response: SaleResponse = serde_json::from_str(
            r#"{"status": "error", "message": "Stock insuficiente para Queque (disp: 0)"}"#,
        )
        .unwrap();
        assert!(!response.is_success());
        assert_eq!(
            response.message.as_deref(),
            Some("Stock insuficiente para Queque (disp: 0)")
        );
    }

    #[test]
    fn test_unknown_status_is_failure() {
        let response: SaleResponse = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert!(!response.is_success());
    }

    #[test]
    fn test_debug_redacts_token() {
        let gateway = HttpSaleGateway::new(
            Url::parse("http://localhost:8000/ventas/nuevo/").unwrap(),
            Some(SecretString::from("csrf-abc123")),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{gateway:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("csrf-abc123"));
    }
}
