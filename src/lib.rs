//! Folio: render markdown posts and persist both artifacts under a content root.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
