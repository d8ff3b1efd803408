//! Domain layer: request-scoped publication values and their validation rules.

pub mod context;
pub mod error;
pub mod publication;
