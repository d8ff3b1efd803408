//! HTTP transport for the round-trip render call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Url,
    header::{ACCEPT, CONTENT_TYPE},
};
use tracing::debug;

use crate::application::render::{RENDER_ENDPOINT_PATH, RenderTransport, TransportError};
use crate::domain::{context::RequestContext, publication::PublishedContent};

pub const JSON_UTF8: &str = "application/json; charset=utf-8";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Posts markdown to the render endpoint on the caller's own host and returns
/// the raw response body.
#[derive(Debug, Clone)]
pub struct HttpRenderTransport {
    client: Client,
    theme: String,
}

impl HttpRenderTransport {
    /// Idle connections are not kept: each call opens and releases its own.
    pub fn new(theme: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| TransportError::Request {
                source: Box::new(err),
            })?;
        Ok(Self {
            client,
            theme: theme.into(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(request: &RequestContext) -> Result<Url, TransportError> {
        let authority = request
            .authority()
            .map_err(|err| TransportError::invalid_endpoint(err.to_string()))?;
        authority
            .join(RENDER_ENDPOINT_PATH)
            .map_err(|err| TransportError::invalid_endpoint(err.to_string()))
    }
}

#[async_trait]
impl RenderTransport for HttpRenderTransport {
    async fn fetch_rendered_output(
        &self,
        markdown: &str,
        request: &RequestContext,
    ) -> Result<String, TransportError> {
        let url = Self::endpoint(request)?;
        let payload = PublishedContent::render_request(self.theme.as_str(), markdown);
        let body = serde_json::to_vec(&payload).map_err(|err| TransportError::Request {
            source: Box::new(err),
        })?;

        debug!(
            target = "infra::render_client",
            url = %url,
            bytes = body.len(),
            "requesting remote render"
        );

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .header(ACCEPT, "text/html")
            .body(body)
            .send()
            .await
            .map_err(|err| TransportError::Request {
                source: Box::new(err),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| TransportError::Body {
            source: Box::new(err),
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(text)
    }
}
