use core_logic::config::{ChainConfig, WalletSource};
use core_logic::{ConfigError, GasConfig, GasConfigToml};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WalletsTable {
    wallets: WalletSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_source_file_parsing() {
        let parsed: WalletsTable = toml::from_str(
            r#"
            [wallets]
            type = "file"
            path = "keys.txt"
            "#,
        )
        .unwrap();

        match parsed.wallets {
            WalletSource::File { path } => assert_eq!(path, "keys.txt"),
            _ => panic!("Expected File variant"),
        }
    }

    #[test]
    fn test_wallet_source_env_parsing() {
        let parsed: WalletsTable = toml::from_str(
            r#"
            [wallets]
            type = "env"
            key = "SNIPER_PRIVATE_KEYS"
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.wallets,
            WalletSource::Env {
                key: "SNIPER_PRIVATE_KEYS".to_string()
            }
        );
        assert!(parsed.wallets.describe().contains("SNIPER_PRIVATE_KEYS"));
    }

    #[test]
    fn test_network_presets() {
        let testnet = ChainConfig::preset("monad-testnet").unwrap();
        assert_eq!(testnet.chain_id, 10143);
        assert_eq!(testnet.native_symbol, "MON");

        let eth = ChainConfig::preset("Ethereum").unwrap();
        assert_eq!(eth.chain_id, 1);
        assert_eq!(
            eth.tx_url("0xabc").as_deref(),
            Some("https://etherscan.io/tx/0xabc")
        );
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        match ChainConfig::preset("solana") {
            Err(ConfigError::UnknownNetwork { name }) => assert_eq!(name, "solana"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_chain_config_validation() {
        let mut config = ChainConfig {
            name: "Local".to_string(),
            rpc_endpoint: "ws://localhost:8546".to_string(),
            chain_id: 31337,
            explorer: None,
            native_symbol: "ETH".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRpcUrl { .. })
        ));

        config.rpc_endpoint = "http://localhost:8545".to_string();
        assert!(config.validate().is_ok());
        assert!(config.tx_url("0x1").is_none());
    }

    #[test]
    fn test_gas_config_from_toml() {
        let raw: GasConfigToml = toml::from_str(
            r#"
            max_fee_gwei = 80.0
            priority_fee_gwei = 3.5
            limit_marketplace_signed = 450000
            "#,
        )
        .unwrap();
        let gas: GasConfig = raw.into();

        assert_eq!(gas.fallback_max_fee_wei, 80_000_000_000);
        assert_eq!(gas.priority_fee_wei, 3_500_000_000);
        assert_eq!(gas.limits.marketplace_signed, 450_000);
        assert_eq!(gas.limits.standard, 300_000);
        assert!(gas.gas_limit_cap.is_none());
    }
}
