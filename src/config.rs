// src/config.rs

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;

use crate::aggregator::{lifi::DEFAULT_BASE_URL, LifiConfig};
use crate::blockchain::registry::ChainRegistry;

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Hex private key of the agent account. Never logged.
    pub private_key: Option<SecretString>,

    /// JSON map of chain key -> descriptor; replaces the built-in chains.
    pub chain_config: Option<String>,
    pub default_chain: Option<String>,
    pub rpc_timeout: Duration,

    // Route aggregator
    pub aggregator_url: String,
    pub aggregator_api_key: Option<String>,
    pub integrator: String,
    pub status_poll_interval: Duration,
    pub max_status_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            private_key: None,
            chain_config: None,
            default_chain: None,
            rpc_timeout: Duration::from_secs(30),
            aggregator_url: DEFAULT_BASE_URL.to_string(),
            aggregator_api_key: None,
            integrator: "evm-agent-wallet".to_string(),
            status_poll_interval: Duration::from_secs(10),
            max_status_polls: 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let private_key = env::var("PRIVATE_KEY")
            .context("PRIVATE_KEY must be set to the agent's hex private key")?;

        Ok(Config {
            port: parse_var("PORT", defaults.port)?,
            private_key: Some(SecretString::new(private_key)),
            chain_config: env::var("CHAIN_CONFIG").ok().filter(|c| !c.trim().is_empty()),
            default_chain: env::var("DEFAULT_CHAIN").ok().filter(|c| !c.trim().is_empty()),
            rpc_timeout: Duration::from_secs(parse_var("RPC_TIMEOUT_SECS", 30)?),
            aggregator_url: env::var("AGGREGATOR_URL").unwrap_or(defaults.aggregator_url),
            aggregator_api_key: env::var("AGGREGATOR_API_KEY").ok(),
            integrator: env::var("INTEGRATOR").unwrap_or(defaults.integrator),
            status_poll_interval: Duration::from_secs(parse_var("STATUS_POLL_INTERVAL_SECS", 10)?),
            max_status_polls: parse_var("MAX_STATUS_POLLS", defaults.max_status_polls)?,
        })
    }

    /// Built-in chains, or the `CHAIN_CONFIG` override when present.
    pub fn chain_registry(&self) -> Result<ChainRegistry> {
        match &self.chain_config {
            Some(json) => ChainRegistry::from_json(json).context("Invalid CHAIN_CONFIG JSON format"),
            None => Ok(ChainRegistry::builtin()),
        }
    }

    pub fn aggregator_config(&self) -> LifiConfig {
        let config = LifiConfig::new()
            .with_base_url(self.aggregator_url.clone())
            .with_integrator(self.integrator.clone())
            .with_timeout_ms(self.rpc_timeout.as_millis() as u64)
            .with_status_polling(self.status_poll_interval, self.max_status_polls);
        match &self.aggregator_api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_builtin_chains() {
        let config = Config::default();
        let registry = config.chain_registry().unwrap();
        assert!(registry.len() >= 4);
        assert_eq!(config.aggregator_config().base_url(), "https://li.quest");
    }

    #[test]
    fn bad_chain_override_is_rejected() {
        let config = Config {
            chain_config: Some("not json".into()),
            ..Config::default()
        };
        assert!(config.chain_registry().is_err());
    }
}
