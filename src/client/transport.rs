//! Transport seam and the reqwest-backed implementation.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::config::ClientConfig;
use super::request::{ApiResponse, RequestSpec};
use crate::auth::AccessToken;
use crate::{Error, Result};

/// Performs a single outbound request and classifies the outcome: response,
/// network failure, 401, or other HTTP error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, spec: &RequestSpec, token: Option<&AccessToken>) -> Result<ApiResponse>;
}

/// HTTP transport over a shared reqwest client.
///
/// The cookie jar is enabled so the HttpOnly refresh and temp cookies set by
/// the identity endpoints ride along on later calls.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self::with_http(config, http))
    }

    /// Use a preconfigured reqwest client (proxy, TLS, pool settings).
    pub fn with_http(config: &ClientConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    async fn classify(response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(Error::Network)?;
            return Ok(ApiResponse::new(status.as_u16(), body));
        }

        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized { message });
        }
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, spec: &RequestSpec, token: Option<&AccessToken>) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, spec.path());
        let mut request = self.http.request(spec.method().clone(), url);

        if !spec.query_params().is_empty() {
            request = request.query(spec.query_params());
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        for (name, value) in spec.headers() {
            request = request.header(name, value);
        }
        if let Some(body) = spec.body() {
            request = request.json(body);
        }

        let response = request.send().await.map_err(Error::Network)?;
        Self::classify(response).await
    }
}
