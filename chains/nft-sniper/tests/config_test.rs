use core_logic::WalletSource;
use nft_sniper::SniperConfig;
use nft_sniper::accounts::load_signers;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_shipped_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml");
    let config = SniperConfig::from_path(path).unwrap();

    assert_eq!(config.network.as_deref(), Some("monad"));
    assert_eq!(config.block_window, 50);
    assert!(config.overrides.is_empty());
    assert_eq!(
        config.wallets,
        WalletSource::File {
            path: "pv.txt".to_string()
        }
    );
    assert_eq!(config.scheduler().spin_window(), Duration::from_millis(100));
}

#[test]
fn test_full_config_from_file() {
    let file = write_temp(
        r#"
        rpc_url = "https://rpc.example.org"
        chain_id = 8453
        explorer = "https://basescan.org"
        block_window = 120

        [dispatch]
        max_retries = 0
        stagger_ms = 0
        confirmation_timeout_secs = 15

        [scheduler]
        spin_window_ms = 250
        countdown = false

        [gas]
        max_fee_gwei = 3.0
        priority_fee_gwei = 0.5
        gas_limit_cap = 200000

        [wallets]
        type = "env"
        key = "SNIPER_KEYS"

        [overrides]
        price = "0.015"
        function = "publicMint(uint256)"
        maxPriorityFee = "1500000000"
        gas_limit = 250000
        "#,
    );

    let config = SniperConfig::from_path(file.path().to_str().unwrap()).unwrap();

    let chain = config.chain().unwrap();
    assert_eq!(chain.chain_id, 8453);
    assert_eq!(
        chain.tx_url("0xabc").as_deref(),
        Some("https://basescan.org/tx/0xabc")
    );

    // zero retries still means one attempt
    let dispatch = config.dispatch_settings();
    assert_eq!(dispatch.max_attempts, 1);
    assert_eq!(dispatch.stagger, Duration::ZERO);
    assert_eq!(dispatch.confirmation_timeout, Duration::from_secs(15));
    assert_eq!(dispatch.retry_delay, Duration::from_millis(500));

    let gas = config.gas_config();
    assert_eq!(gas.fallback_max_fee_wei, 3_000_000_000);
    assert_eq!(gas.priority_fee_wei, 500_000_000);
    assert_eq!(gas.capped(300_000), 200_000);

    assert_eq!(config.overrides.price.as_deref(), Some("0.015"));
    assert_eq!(config.overrides.max_priority_fee, Some(1_500_000_000));
    assert_eq!(config.overrides.gas_limit, Some(250_000));
    assert_eq!(
        config.overrides.function.as_deref(),
        Some("publicMint(uint256)")
    );
    assert_eq!(config.wallets.describe(), "env var 'SNIPER_KEYS'");
}

#[test]
fn test_missing_file_is_an_error() {
    let err = SniperConfig::from_path("/nonexistent/sniper.toml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config"));
}

#[test]
fn test_unknown_network_is_rejected() {
    let config = SniperConfig::from_toml("network = \"solana\"").unwrap();
    assert!(config.chain().is_err());
}

#[test]
fn test_load_signers_from_key_file() {
    let file = write_temp(&format!("# sniper wallets\n{}\n\n{}\n", KEY_A, KEY_B));
    let source = WalletSource::File {
        path: file.path().to_str().unwrap().to_string(),
    };

    let signers = load_signers(&source).unwrap();
    assert_eq!(signers.len(), 2);
    assert_eq!(
        signers[0].address().to_string(),
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
    );
}

#[test]
fn test_empty_key_file_is_rejected() {
    let file = write_temp("# nothing here\n\n");
    let source = WalletSource::File {
        path: file.path().to_str().unwrap().to_string(),
    };

    let err = load_signers(&source).unwrap_err();
    assert!(err.to_string().contains("No private keys"), "{}", err);
}
