//! Configuration loader for the `waterquality-forecast` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
//! Model parameters (ARIMA order, minimum sample count, horizon) are fixed
//! constants in `forecast.rs` and are deliberately not configurable.
use std::{env, net::IpAddr, net::SocketAddr};

use anyhow::{anyhow, Result};

/// Parse an optional environment variable into `$ty` with a default value.
macro_rules! parse_env_or {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // ---
    /// Interface the HTTP listener binds to.
    pub host: IpAddr,

    /// TCP port the HTTP listener binds to.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 5000,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `FORECAST_HOST` – bind address (default: `0.0.0.0`)
/// - `FORECAST_PORT` – bind port (default: 5000)
///
/// Returns an error if any variable is set but cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();
    let host = parse_env_or!("FORECAST_HOST", IpAddr, defaults.host);
    let port = parse_env_or!("FORECAST_PORT", u16, defaults.port);

    Ok(Config { host, port })
}

impl Config {
    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  FORECAST_HOST : {}", self.host);
        tracing::info!("  FORECAST_PORT : {}", self.port);
    }
}
