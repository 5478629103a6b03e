//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or blank.
//! The Event Hubs key is wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug)]
pub struct Config {
    pub sink: SinkConfig,
    pub bind_addr: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Connection identity for the event stream.
#[derive(Debug)]
pub struct SinkConfig {
    /// Event Hubs namespace, either `name` or a full host name.
    pub namespace: String,
    /// Event hub (stream) name inside the namespace.
    pub event_hub: String,
    /// Shared access policy name.
    pub key_name: String,
    /// Shared access policy key.
    pub key: SecretString,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            sink: SinkConfig::from_lookup(&lookup)?,
            bind_addr: lookup("PIXEL_BIND_ADDR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            otel_endpoint: lookup("OTEL_ENDPOINT").filter(|v| !v.trim().is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

impl SinkConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            namespace: required_var(lookup, "EVENTHUB_NAMESPACE")?,
            event_hub: required_var(lookup, "EVENTHUB_NAME")?,
            key_name: required_var(lookup, "EVENTHUB_KEY_NAME")?,
            key: SecretString::from(required_var(lookup, "EVENTHUB_KEY")?),
        })
    }
}

fn required_var<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => Err(Error::Config(format!(
            "required environment variable {name} is blank"
        ))),
        None => Err(Error::Config(format!(
            "required environment variable {name} is not set"
        ))),
    }
}
