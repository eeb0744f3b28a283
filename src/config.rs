//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The database URL is wrapped in secrecy::SecretString to prevent log leaks.
//!
//! Timestamps are stored and modeled in UTC throughout; `display_timezone`
//! applies only at the presentation boundary (CLI output).

use crate::error::{Error, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub display_timezone: chrono_tz::Tz,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let tz_name =
            std::env::var("DISPLAY_TIMEZONE").unwrap_or_else(|_| "America/Los_Angeles".to_string());
        let display_timezone = tz_name
            .parse::<chrono_tz::Tz>()
            .map_err(|_| Error::Config(format!("unknown DISPLAY_TIMEZONE: {tz_name}")))?;

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            display_timezone,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
