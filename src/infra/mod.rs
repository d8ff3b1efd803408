//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod render_client;
pub mod storage;
pub mod telemetry;
