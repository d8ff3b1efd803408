//! Application services: the publication pipeline and the ports it drives.

pub mod error;
pub mod publish;
pub mod render;
pub mod repos;
