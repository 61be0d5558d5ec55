//! Configuration loader for nft-sniper

use crate::client::ClientSettings;
use crate::dispatcher::DispatchSettings;
use crate::overrides::MintOverrides;
use crate::scheduler::MintScheduler;
use anyhow::{Context, Result};
use core_logic::{ChainConfig, ConfigError, GasConfig, GasConfigToml, WalletSource};
use serde::Deserialize;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Configuration for the sniper
#[derive(Debug, Clone, Deserialize)]
pub struct SniperConfig {
    /// Built-in network preset (`monad`, `monad-testnet`, `ethereum`)
    #[serde(default)]
    pub network: Option<String>,
    /// RPC endpoint URL, overrides the preset
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Expected chain ID, overrides the preset
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub explorer: Option<String>,
    /// Blocks scanned by the analyzer
    #[serde(default = "default_block_window")]
    pub block_window: u64,
    #[serde(default)]
    pub dispatch: DispatchToml,
    #[serde(default)]
    pub scheduler: SchedulerToml,
    #[serde(default)]
    pub gas: GasConfigToml,
    #[serde(default)]
    pub wallets: WalletSource,
    /// Pattern-level overrides applied before every batch
    #[serde(default)]
    pub overrides: MintOverrides,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchToml {
    /// Total submission attempts per account
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Start offset between consecutive accounts
    pub stagger_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_ms: u64,
}

impl Default for DispatchToml {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            stagger_ms: 100,
            confirmation_timeout_secs: 60,
            receipt_poll_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerToml {
    /// Final window spent busy-polling the clock
    pub spin_window_ms: u64,
    pub block_poll_ms: u64,
    pub countdown: bool,
}

impl Default for SchedulerToml {
    fn default() -> Self {
        Self {
            spin_window_ms: 100,
            block_poll_ms: 400,
            countdown: true,
        }
    }
}

fn default_block_window() -> u64 {
    50
}

fn deserialize_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct U128Visitor;

    impl<'de> serde::de::Visitor<'de> for U128Visitor {
        type Value = u128;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer representing a u128")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u128::from_str(value.trim()).map_err(|_| E::custom("invalid u128"))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as u128)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value >= 0 {
                Ok(value as u128)
            } else {
                Err(E::custom("negative u128"))
            }
        }
    }

    deserializer.deserialize_any(U128Visitor)
}

/// Wei amounts given either as a TOML integer or a decimal string.
pub(crate) fn deserialize_opt_u128<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_u128(deserializer).map(Some)
}

impl SniperConfig {
    /// Load configuration from a TOML file
    pub fn from_path(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config from {}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Applies `RPC_URL`, `CHAIN_ID`, `RETRY_ATTEMPTS`, `RETRY_DELAY`,
    /// `MAX_PRIORITY_FEE` (gwei) and `GAS_LIMIT_MAX` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RPC_URL").filter(|v| !v.trim().is_empty()) {
            self.rpc_url = Some(url.trim().to_string());
        }
        if let Some(raw) = lookup("CHAIN_ID") {
            self.chain_id = Some(parse_env("CHAIN_ID", &raw)?);
        }
        if let Some(raw) = lookup("RETRY_ATTEMPTS") {
            self.dispatch.max_retries = parse_env("RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("RETRY_DELAY") {
            self.dispatch.retry_delay_ms = parse_env("RETRY_DELAY", &raw)?;
        }
        if let Some(raw) = lookup("MAX_PRIORITY_FEE") {
            self.gas.priority_fee_gwei = Some(parse_env("MAX_PRIORITY_FEE", &raw)?);
        }
        if let Some(raw) = lookup("GAS_LIMIT_MAX") {
            self.gas.gas_limit_cap = Some(parse_env("GAS_LIMIT_MAX", &raw)?);
        }
        Ok(())
    }

    /// Resolves the target network from the preset and explicit keys.
    pub fn chain(&self) -> Result<ChainConfig, ConfigError> {
        let mut chain = match &self.network {
            Some(name) => ChainConfig::preset(name)?,
            None => ChainConfig {
                name: "custom".to_string(),
                rpc_endpoint: self.rpc_url.clone().ok_or_else(|| ConfigError::MissingField {
                    field: "rpc_url".to_string(),
                })?,
                chain_id: self.chain_id.ok_or_else(|| ConfigError::MissingField {
                    field: "chain_id".to_string(),
                })?,
                explorer: None,
                native_symbol: "ETH".to_string(),
            },
        };

        if let Some(url) = &self.rpc_url {
            chain.rpc_endpoint = url.clone();
        }
        if let Some(id) = self.chain_id {
            chain.chain_id = id;
        }
        if self.explorer.is_some() {
            chain.explorer = self.explorer.clone();
        }

        chain.validate()?;
        Ok(chain)
    }

    pub fn gas_config(&self) -> GasConfig {
        GasConfig::from(self.gas.clone())
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_attempts: self.dispatch.max_retries.max(1),
            retry_delay: Duration::from_millis(self.dispatch.retry_delay_ms),
            stagger: Duration::from_millis(self.dispatch.stagger_ms),
            confirmation_timeout: Duration::from_secs(self.dispatch.confirmation_timeout_secs),
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            receipt_poll: Duration::from_millis(self.dispatch.receipt_poll_ms),
            block_poll: Duration::from_millis(self.scheduler.block_poll_ms),
            ..ClientSettings::default()
        }
    }

    pub fn scheduler(&self) -> MintScheduler {
        MintScheduler::new(Duration::from_millis(self.scheduler.spin_window_ms))
            .with_countdown(self.scheduler.countdown)
    }
}

fn parse_env<T: FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' is not a valid number", raw),
    })
}
