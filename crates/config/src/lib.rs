//! Configuration management for table-api
//!
//! Provides the configuration types consumed by the query pipeline and a
//! loader for environment-sectioned JSON configuration files.

pub mod environment;
pub mod loader;
pub mod types;

pub use loader::load;
pub use types::*;
