//! HTTP/JSON boundary to the checkout server.

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::CheckoutId,
    error::ApiError,
    protocol::{
        CheckoutSession, CompleteCheckoutRequest, CreateCheckoutRequest, MerchantProfile,
        UpdateCheckoutRequest,
    },
};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::{
    config::ControllerConfig,
    error::{CheckoutError, Result},
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
pub const REQUEST_ID_HEADER: &str = "Request-Id";
pub const REQUEST_SIGNATURE_HEADER: &str = "Request-Signature";
pub const UCP_AGENT_HEADER: &str = "UCP-Agent";

#[async_trait]
pub trait CheckoutTransport: Send + Sync {
    async fn fetch_profile(&self) -> Result<MerchantProfile>;
    async fn create_checkout(&self, body: &CreateCheckoutRequest) -> Result<CheckoutSession>;
    async fn update_checkout(
        &self,
        id: &CheckoutId,
        body: &UpdateCheckoutRequest,
    ) -> Result<CheckoutSession>;
    async fn complete_checkout(
        &self,
        id: &CheckoutId,
        body: &CompleteCheckoutRequest,
    ) -> Result<CheckoutSession>;
    async fn cancel_checkout(&self, id: &CheckoutId) -> Result<()>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
    agent_profile: String,
    request_signature: String,
}

impl HttpTransport {
    pub fn new(server_url: &str, config: &ControllerConfig) -> Result<Self> {
        let base_url = Url::parse(server_url.trim())
            .map_err(|err| CheckoutError::InvalidServerUrl(format!("{server_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CheckoutError::InvalidServerUrl(server_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            agent_profile: config.agent_profile.clone(),
            request_signature: config.request_signature.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CheckoutError::InvalidServerUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        operation: &str,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request_id = Uuid::new_v4();
        debug!(%method, %url, %request_id, operation, "dispatching checkout request");

        let mut request = self
            .http
            .request(method, url)
            .header(IDEMPOTENCY_KEY_HEADER, Uuid::new_v4().to_string())
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .header(REQUEST_SIGNATURE_HEADER, &self.request_signature)
            .header(
                UCP_AGENT_HEADER,
                format!("profile=\"{}\"", self.agent_profile),
            );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.bytes().await.unwrap_or_default();
        Err(ApiError::from_body(status.as_u16(), &raw, operation).into())
    }

    async fn decode<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
        let raw = response.bytes().await?;
        serde_json::from_slice(&raw)
            .map_err(|err| CheckoutError::MalformedResponse(format!("{operation}: {err}")))
    }
}

#[async_trait]
impl CheckoutTransport for HttpTransport {
    async fn fetch_profile(&self) -> Result<MerchantProfile> {
        let url = self.endpoint(&[".well-known", "ucp"])?;
        let response = self
            .execute::<()>(Method::GET, url, None, "fetch merchant profile")
            .await?;
        Self::decode(response, "fetch merchant profile").await
    }

    async fn create_checkout(&self, body: &CreateCheckoutRequest) -> Result<CheckoutSession> {
        let url = self.endpoint(&["checkout-sessions"])?;
        let response = self
            .execute(Method::POST, url, Some(body), "create checkout")
            .await?;
        Self::decode(response, "create checkout").await
    }

    async fn update_checkout(
        &self,
        id: &CheckoutId,
        body: &UpdateCheckoutRequest,
    ) -> Result<CheckoutSession> {
        let url = self.endpoint(&["checkout-sessions", id.as_str()])?;
        let response = self
            .execute(Method::PUT, url, Some(body), "update checkout")
            .await?;
        Self::decode(response, "update checkout").await
    }

    async fn complete_checkout(
        &self,
        id: &CheckoutId,
        body: &CompleteCheckoutRequest,
    ) -> Result<CheckoutSession> {
        let url = self.endpoint(&["checkout-sessions", id.as_str(), "complete"])?;
        let response = self
            .execute(Method::POST, url, Some(body), "payment")
            .await?;
        Self::decode(response, "payment").await
    }

    async fn cancel_checkout(&self, id: &CheckoutId) -> Result<()> {
        let url = self.endpoint(&["checkout-sessions", id.as_str(), "cancel"])?;
        self.execute::<()>(Method::POST, url, None, "cancel checkout")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
