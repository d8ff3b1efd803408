use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::HOST},
    response::Html,
};
use serde::Deserialize;
use tracing::info;

use crate::application::{
    error::HttpError,
    publish::PublishDeadline,
    render::RenderRequest,
};
use crate::domain::{
    context::RequestContext,
    publication::{PublishedContent, PublishedPostPath},
};

use super::HttpState;

pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostBody {
    pub markdown: String,
}

/// Canonical markup-rendering endpoint. Answers with raw HTML, not JSON.
pub(super) async fn render_markdown(
    State(state): State<HttpState>,
    Json(content): Json<PublishedContent>,
) -> Result<Html<String>, HttpError> {
    let request = RenderRequest::new(content.markdown).with_theme(content.theme);
    let html = state.renderer.render(&request).map_err(|err| {
        HttpError::from_error(
            "infra::http::posts::render_markdown",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Rendering failed",
            &err,
        )
    })?;
    Ok(Html(html))
}

pub(super) async fn preview_post(
    State(state): State<HttpState>,
    Json(body): Json<PostBody>,
) -> Result<Html<String>, HttpError> {
    let html = state.publication.get_preview_html(&body.markdown)?;
    Ok(Html(html))
}

pub(super) async fn publish_post(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(body): Json<PostBody>,
) -> Result<Json<PublishedPostPath>, HttpError> {
    let request = request_context(&headers);
    let deadline = PublishDeadline::after(state.publish_timeout);

    let paths = state
        .publication
        .publish_post(
            &body.markdown,
            Some(state.environment.as_ref()),
            request.as_ref(),
            deadline,
        )
        .await?;

    info!(
        target = "infra::http::posts",
        markdown_path = %paths.markdown_path,
        html_path = %paths.html_path,
        "publish request completed"
    );
    Ok(Json(paths))
}

/// Read the caller's scheme and host from the inbound headers. A missing or
/// malformed `Host` yields `None`, which the orchestrator rejects.
pub fn request_context(headers: &HeaderMap) -> Option<RequestContext> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let scheme = headers
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");
    RequestContext::new(scheme, host).ok()
}
