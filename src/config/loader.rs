use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::firewall::CompiledFirewall;

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    ///
    /// Compiles the firewall section so that malformed CIDRs, out-of-range
    /// ICMP fields and bad port ranges are caught at the configuration
    /// boundary, before rules become active.
    pub fn validate(&self) -> Result<()> {
        CompiledFirewall::from_config(&self.firewall)
            .context("invalid firewall rules")?;

        info!(
            rule_sets = self.firewall.ingress.len(),
            "configuration validated successfully"
        );
        Ok(())
    }
}
