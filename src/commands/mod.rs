//! CLI command implementations.

pub mod build;
pub mod sources;
pub mod verify;
