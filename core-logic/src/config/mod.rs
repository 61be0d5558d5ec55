use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Where private keys are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WalletSource {
    /// One hex key per line, `#` comments allowed.
    File { path: String },
    /// Comma-separated hex keys in an environment variable.
    Env { key: String },
}

impl Default for WalletSource {
    fn default() -> Self {
        WalletSource::File {
            path: "pv.txt".to_string(),
        }
    }
}

impl WalletSource {
    pub fn describe(&self) -> String {
        match self {
            WalletSource::File { path } => format!("file '{}'", path),
            WalletSource::Env { key } => format!("env var '{}'", key),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_endpoint: String,
    pub chain_id: u64,
    #[serde(default)]
    pub explorer: Option<String>,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

impl ChainConfig {
    /// Built-in network presets. `monad` honours `MONAD_RPC` / `MONAD_CHAIN_ID`.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let normalized = name.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "monad" | "monad-mainnet" => {
                let rpc_endpoint = std::env::var("MONAD_RPC")
                    .unwrap_or_else(|_| "https://rpc.monad.xyz".to_string());
                let chain_id = match std::env::var("MONAD_CHAIN_ID") {
                    Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                        field: "MONAD_CHAIN_ID".to_string(),
                        reason: format!("'{}' is not a chain id", raw),
                    })?,
                    Err(_) => 143,
                };
                Ok(Self {
                    name: "Monad Mainnet".to_string(),
                    rpc_endpoint,
                    chain_id,
                    explorer: Some("https://monadexplorer.com".to_string()),
                    native_symbol: "MON".to_string(),
                })
            }
            "monad-testnet" | "monadtestnet" => Ok(Self {
                name: "Monad Testnet".to_string(),
                rpc_endpoint: "https://testnet-rpc.monad.xyz".to_string(),
                chain_id: 10143,
                explorer: Some("https://testnet.monadexplorer.com".to_string()),
                native_symbol: "MON".to_string(),
            }),
            "ethereum" | "mainnet" => Ok(Self {
                name: "Ethereum Mainnet".to_string(),
                rpc_endpoint: "https://eth.llamarpc.com".to_string(),
                chain_id: 1,
                explorer: Some("https://etherscan.io".to_string()),
                native_symbol: "ETH".to_string(),
            }),
            _ => Err(ConfigError::UnknownNetwork {
                name: name.to_string(),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_url".to_string(),
            });
        }
        if !(self.rpc_endpoint.starts_with("http://") || self.rpc_endpoint.starts_with("https://"))
        {
            return Err(ConfigError::InvalidRpcUrl {
                url: self.rpc_endpoint.clone(),
            });
        }
        Ok(())
    }

    /// Explorer link for a transaction hash, if the network has an explorer.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}
