//! Thin HTTP surface around the publication pipeline.

mod middleware;
mod posts;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::{
    publish::PublicationService,
    render::{RENDER_ENDPOINT_PATH, RenderService},
};
use crate::domain::context::HostEnvironment;

pub use middleware::{RequestId, log_responses, set_request_context};
pub use posts::{FORWARDED_PROTO_HEADER, PostBody, request_context};

pub const PREVIEW_PATH: &str = "/api/posts/preview";
pub const PUBLISH_PATH: &str = "/api/posts/publish";
pub const HEALTH_PATH: &str = "/health";

#[derive(Clone)]
pub struct HttpState {
    pub publication: Arc<PublicationService>,
    pub renderer: Arc<dyn RenderService>,
    pub environment: Arc<HostEnvironment>,
    pub publish_timeout: Duration,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(RENDER_ENDPOINT_PATH, post(posts::render_markdown))
        .route(PREVIEW_PATH, post(posts::preview_post))
        .route(PUBLISH_PATH, post(posts::publish_post))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
