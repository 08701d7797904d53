use serde::Deserialize;

use crate::firewall::FirewallConfig;

/// Root configuration for nodefw
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Firewall rule spec
    #[serde(default)]
    pub firewall: FirewallConfig,

    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON logs instead of pretty output
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
