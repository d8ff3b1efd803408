//! Markup rendering: the local comrak pipeline and the remote render transport port.
//!
//! The local renderer is pure: it accepts markdown, produces deterministic
//! sanitised HTML, and never performs I/O. The transport asks a render endpoint
//! for the same output over HTTP and is what the publish path uses.

mod service;
mod types;

pub use service::{ComrakRenderService, render_service};
pub use types::{
    RENDER_ENDPOINT_PATH, RenderError, RenderRequest, RenderService, RenderTransport,
    TransportError,
};
