use std::error::Error as StdError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::context::RequestContext;

/// Well-known relative path of the markup-rendering endpoint.
pub const RENDER_ENDPOINT_PATH: &str = "/api/markdown/render";

/// Rendering request passed into the local pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Source markdown captured from the editor.
    pub markdown: String,
    /// Optional theme name; when present the output is wrapped in a themed article.
    #[serde(default)]
    pub theme: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            theme: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        let theme = theme.into();
        if !theme.trim().is_empty() {
            self.theme = Some(theme);
        }
        self
    }
}

/// Structured errors surfaced by the local rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
}

/// Trait exposed by the local rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}

/// Failures of the outbound render call. Every variant means no rendered
/// output was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid render endpoint: {message}")]
    InvalidEndpoint { message: String },
    #[error("render request could not be completed")]
    Request {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("render endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("render response body could not be read")]
    Body {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl TransportError {
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
        }
    }
}

/// Round-trip render through the canonical endpoint on the caller's own host.
#[async_trait]
pub trait RenderTransport: Send + Sync {
    async fn fetch_rendered_output(
        &self,
        markdown: &str,
        request: &RequestContext,
    ) -> Result<String, TransportError>;
}
