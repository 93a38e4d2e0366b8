use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ExchangeError;
use crate::identity::{SEED_ALPHABET, SEED_LENGTH};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExchangeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_peer_host")]
    pub peer_host: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub initial_tick: u64,
    #[serde(default = "default_balance_poll_interval_ms")]
    pub balance_poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccountsConfig {
    #[serde(default = "default_initial_balance")]
    pub initial_balance: u64,
    /// Balances of the accounts provisioned at startup
    #[serde(default = "default_demo_balances")]
    pub demo_balances: Vec<u64>,
    #[serde(default = "default_seed_length")]
    pub seed_length: usize,
    #[serde(default = "default_seed_alphabet")]
    pub seed_alphabet: String,
    #[serde(default)]
    pub hot_wallet_seed: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_peer_host() -> String {
    "82.197.173.131".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_balance_poll_interval_ms() -> u64 {
    5000
}

fn default_initial_balance() -> u64 {
    1000
}

fn default_demo_balances() -> Vec<u64> {
    vec![1000, 10000]
}

fn default_seed_length() -> usize {
    SEED_LENGTH
}

fn default_seed_alphabet() -> String {
    SEED_ALPHABET.to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_host: default_peer_host(),
            tick_interval_ms: default_tick_interval_ms(),
            initial_tick: 0,
            balance_poll_interval_ms: default_balance_poll_interval_ms(),
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            demo_balances: default_demo_balances(),
            seed_length: default_seed_length(),
            seed_alphabet: default_seed_alphabet(),
            hot_wallet_seed: None,
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            network: NetworkConfig::default(),
            accounts: AccountsConfig::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn from_toml(s: &str) -> Result<Self, ExchangeError> {
        let config: Self = toml::from_str(s).map_err(|e| ExchangeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.network.tick_interval_ms == 0 || self.network.balance_poll_interval_ms == 0 {
            return Err(ExchangeError::Config("intervals must be positive".to_string()));
        }
        if self.accounts.seed_alphabet.is_empty() || self.accounts.seed_length == 0 {
            return Err(ExchangeError::Config("seed alphabet and length must be non-empty".to_string()));
        }
        Ok(())
    }

    /// Parse `path` if it exists, otherwise write and return the defaults.
    /// Unreadable or invalid files fall back to the defaults.
    pub fn load_or_default(path: &str) -> Self {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match Self::from_toml(&s) {
                    Ok(c) => {
                        info!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Err(e) = config.save(path) {
                warn!("Could not write default config: {}", e);
            }
            config
        }
    }

    pub fn save(&self, path: &str) -> Result<(), ExchangeError> {
        let s = toml::to_string_pretty(self).map_err(|e| ExchangeError::Config(e.to_string()))?;
        std::fs::write(path, s)?;
        Ok(())
    }
}
