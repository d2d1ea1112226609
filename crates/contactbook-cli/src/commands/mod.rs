//! CLI command implementations

pub mod config;
pub mod contact;
pub mod status;
pub mod sync;
