//! Brent Dashboard Service Library
//!
//! Configuration, logging, store loading and the HTTP routes for the
//! read-only Brent oil dashboard API.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod rest_api;
pub mod service;
pub mod signals;

pub use config::DashboardConfig;
pub use logging::initialize_logging;
pub use rest_api::create_routes;
pub use service::DashboardState;
pub use signals::shutdown_signal;

/// Load configuration from an optional file and environment variables
pub fn load_configuration(config_file: Option<&Path>) -> Result<DashboardConfig> {
    config::load_config(config_file).context("Failed to load service configuration")
}
