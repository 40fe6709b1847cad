//! Application Configuration
//!
//! Layered: in-code defaults, then an optional `config/default.toml`,
//! then environment variables prefixed `HAZARD_`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime configuration for the hazard core
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Listen address for the combined WebSocket/HTTP server
    pub bind_addr: String,
    /// Escalation window in milliseconds, severity-independent
    pub escalation_timeout_ms: u64,
    /// Outbound channel depth per device connection
    pub device_channel_capacity: usize,
    /// Engine command channel depth
    pub command_capacity: usize,
    /// All-clients broadcast channel depth
    pub broadcast_capacity: usize,
    /// Recently terminal alerts kept for audit logging
    pub terminal_retention: usize,
    /// Static bearer token for admin routes; empty disables the check
    pub admin_token: String,
    /// Admin rate limit: replenish interval in seconds
    pub rate_limit_per_second: u64,
    /// Admin rate limit: burst size
    pub rate_limit_burst: u32,
}

impl AppConfig {
    /// Load configuration from defaults, file and environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("escalation_timeout_ms", 15_000i64)?
            .set_default("device_channel_capacity", 64i64)?
            .set_default("command_capacity", 128i64)?
            .set_default("broadcast_capacity", 64i64)?
            .set_default("terminal_retention", 256i64)?
            .set_default("admin_token", "")?
            .set_default("rate_limit_per_second", 2i64)?
            .set_default("rate_limit_burst", 5i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("HAZARD"))
            .build()?
            .try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            escalation_timeout_ms: 15_000,
            device_channel_capacity: 64,
            command_capacity: 128,
            broadcast_capacity: 64,
            terminal_retention: 256,
            admin_token: String::new(),
            rate_limit_per_second: 2,
            rate_limit_burst: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_matches_defaults() {
        let loaded = AppConfig::load().unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_default_window_is_fifteen_seconds() {
        assert_eq!(AppConfig::default().escalation_timeout_ms, 15_000);
    }
}
