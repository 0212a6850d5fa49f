//! POS backend API client
//!
//! HTTP client for the order and terminal endpoints, with bearer
//! authentication and transport-level retry via [`HttpClient`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tillpoint_core::checkout::ports::OrderGateway;
use tillpoint_core::terminal::ports::ConnectionTokenProvider;
use tillpoint_domain::{CreateOrderRequest, CreatedOrder, Menu, OrderConfirmation, Result};
use tracing::{debug, info, instrument};

use super::auth::AccessTokenProvider;
use super::errors::ApiError;
use crate::http::HttpClient;

/// Configuration for the backend API client
#[derive(Debug, Clone)]
pub struct PosApiConfig {
    /// Base URL for the API (e.g., "https://api.tillpoint.dev/v1")
    pub base_url: String,
    /// Timeout for API requests
    pub timeout: Duration,
}

impl Default for PosApiConfig {
    fn default() -> Self {
        Self { base_url: "https://api.tillpoint.dev/v1".to_string(), timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionTokenResponse {
    secret: String,
}

/// Client for the POS backend.
///
/// Implements [`OrderGateway`] and [`ConnectionTokenProvider`], so the
/// core layer only ever sees the port traits.
pub struct PosApiClient {
    http: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    config: PosApiConfig,
}

impl PosApiClient {
    pub fn new(
        config: PosApiConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> std::result::Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(3)
            .user_agent("tillpoint-register")
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self { http, auth, config })
    }

    /// Fetch the sellable menu for a location.
    #[instrument(skip(self))]
    pub async fn fetch_menu(&self, location_id: i64) -> std::result::Result<Menu, ApiError> {
        self.get(&format!("/admin/pos/menu?location_id={location_id}")).await
    }

    /// Request a fresh reader connection token from the backend.
    #[instrument(skip(self))]
    pub async fn fetch_connection_token(&self) -> std::result::Result<String, ApiError> {
        let response: ConnectionTokenResponse =
            self.post("/admin/stripe_terminal/connection_token", &serde_json::json!({})).await?;
        Ok(response.secret)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "GET request");

        let token = self.auth.access_token().await?;
        let request = self
            .http
            .request(Method::GET, &url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json");

        let response = self.http.send(request).await?;
        Self::decode(response, &url).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "POST request");

        let token = self.auth.access_token().await?;
        let request = self
            .http
            .request(Method::POST, &url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(body);

        let response = self.http.send(request).await?;
        Self::decode(response, &url).await
    }

    /// POST where the endpoint acknowledges with an empty body
    async fn post_no_content<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<(), ApiError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, "POST request");

        let token = self.auth.access_token().await?;
        let request = self
            .http
            .request(Method::POST, &url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .json(body);

        let response = self.http.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &url, body));
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> std::result::Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, url, body));
        }

        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Client(format!(
                    "{url}: empty response body cannot satisfy the expected payload"
                ))
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Client(format!("{url}: failed to parse response: {e}")))
    }
}

#[async_trait]
impl OrderGateway for PosApiClient {
    #[instrument(skip(self, request), fields(payment_method = ?request.payment_method))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder> {
        let order: CreatedOrder = self.post("/admin/pos/orders", request).await?;
        info!(order_number = %order.order_number, "order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn confirm_terminal_payment(&self, order_id: i64) -> Result<OrderConfirmation> {
        let confirmation: OrderConfirmation = self
            .post(
                &format!("/admin/pos/orders/{order_id}/confirm_terminal_payment"),
                &serde_json::json!({}),
            )
            .await?;
        info!(order_number = %confirmation.order_number, "terminal payment confirmed");
        Ok(confirmation)
    }

    #[instrument(skip(self))]
    async fn confirm_manual_payment(&self, order_id: i64) -> Result<OrderConfirmation> {
        let confirmation: OrderConfirmation = self
            .post(
                &format!("/admin/pos/orders/{order_id}/confirm_manual_payment"),
                &serde_json::json!({}),
            )
            .await?;
        info!(order_number = %confirmation.order_number, "manual payment confirmed");
        Ok(confirmation)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: i64) -> Result<()> {
        self.post_no_content(&format!("/admin/orders/{order_id}/cancel"), &serde_json::json!({}))
            .await?;
        info!(order_id, "order cancelled");
        Ok(())
    }
}

#[async_trait]
impl ConnectionTokenProvider for PosApiClient {
    async fn connection_token(&self) -> Result<String> {
        Ok(self.fetch_connection_token().await?)
    }
}
