use alloy::primitives::Address;
use alloy::primitives::utils::format_ether;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use core_logic::{RESULT_TARGET, gwei_to_wei, setup_logger};
use dialoguer::{Confirm, theme::ColorfulTheme};
use dotenv::dotenv;
use nft_sniper::accounts::load_signers;
use nft_sniper::detector::format_start_time;
use nft_sniper::utils::{extract_contract_address, short_address, validate_mint_quantity};
use nft_sniper::{
    Account, ManualDetector, MintDispatcher, MintOverrides, MintPattern, PatternAnalyzer,
    RpcChainClient, SniperConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Adaptive multi-account NFT mint sniper", long_about = None)]
struct Args {
    #[arg(short, long, default_value = nft_sniper::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Debug output on the console
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Infer the mint pattern of a contract from recent mints
    Analyze {
        /// Contract address or launchpad URL
        contract: String,
        #[arg(short, long)]
        window: Option<u64>,
    },
    /// Read price, supply and sale status of a contract
    Inspect { contract: String },
    /// Mint from every loaded wallet
    Mint {
        contract: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u64,
        #[arg(short, long)]
        window: Option<u64>,
        /// Release at this UNIX timestamp (seconds)
        #[arg(long, conflicts_with_all = ["block", "after"])]
        at: Option<u64>,
        /// Release once this block height is reached
        #[arg(long, conflicts_with = "after")]
        block: Option<u64>,
        /// Release after this many seconds
        #[arg(long)]
        after: Option<u64>,
        /// Unit price in native units, e.g. 0.01
        #[arg(long)]
        price: Option<String>,
        /// Entry-point signature, e.g. "mintTo(address,uint256)"
        #[arg(long)]
        function: Option<String>,
        #[arg(long)]
        gas_limit: Option<u64>,
        /// Priority fee in gwei
        #[arg(long)]
        priority_fee: Option<f64>,
        /// Max fee per gas in gwei
        #[arg(long)]
        max_fee: Option<f64>,
        /// Total submission attempts per wallet
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        retry_delay_ms: Option<u64>,
        #[arg(long)]
        fee_recipient: Option<Address>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_contract(input: &str) -> Result<Address> {
    extract_contract_address(input)
        .with_context(|| format!("No contract address found in '{}'", input))
}

fn print_pattern(pattern: &MintPattern, symbol: &str) {
    println!("\nMint pattern");
    println!("  Function:    {}", pattern.signature());
    println!("  Selector:    {}", pattern.selector());
    println!("  Shape:       {}", pattern.shape());
    println!("  Call target: {}", pattern.call_target);
    println!(
        "  Unit price:  {} {}",
        format_ether(pattern.mean_unit_price),
        symbol
    );
    println!("  Avg qty/tx:  {}", pattern.mean_quantity);
    println!("  Samples:     {}", pattern.sample_count);
    let access = if pattern.is_whitelist_like {
        "allowlist"
    } else if pattern.is_public_like {
        "public"
    } else {
        "other"
    };
    println!("  Access:      {}", access);
    for sample in &pattern.samples {
        println!(
            "    {:?} block {} from {} qty {}",
            sample.event.tx_hash,
            sample.event.block_number,
            short_address(&sample.event.from),
            sample.event.quantity
        );
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let _log_guard = setup_logger(args.verbose);

    // Auto-detect config path when run from the workspace root
    let config_path = if std::path::Path::new(&args.config).exists() {
        args.config.clone()
    } else if args.config == nft_sniper::config::DEFAULT_CONFIG_PATH
        && std::path::Path::new("chains/nft-sniper/config/config.toml").exists()
    {
        "chains/nft-sniper/config/config.toml".to_string()
    } else {
        args.config.clone()
    };

    let mut config = SniperConfig::from_path(&config_path).context("Failed to load config")?;
    config.apply_env()?;
    let chain = config.chain()?;

    info!(target: RESULT_TARGET, "Network: {} (chain {})", chain.name, chain.chain_id);
    info!(target: RESULT_TARGET, "RPC: {}", chain.rpc_endpoint);

    match args.command {
        Commands::Analyze { contract, window } => {
            let token = parse_contract(&contract)?;
            let client = Arc::new(
                RpcChainClient::connect(
                    &chain.rpc_endpoint,
                    Some(chain.chain_id),
                    Vec::new(),
                    config.client_settings(),
                )
                .await?,
            );

            let analyzer = PatternAnalyzer::new(client.clone());
            match analyzer
                .analyze(token, window.unwrap_or(config.block_window))
                .await
            {
                Some(pattern) => print_pattern(&pattern, &chain.native_symbol),
                None => {
                    warn!("No pattern found, falling back to contract inspection");
                    let pattern = ManualDetector::new(client).detect(token).await;
                    print_pattern(&pattern, &chain.native_symbol);
                }
            }
        }

        Commands::Inspect { contract } => {
            let token = parse_contract(&contract)?;
            let client = Arc::new(
                RpcChainClient::connect(
                    &chain.rpc_endpoint,
                    Some(chain.chain_id),
                    Vec::new(),
                    config.client_settings(),
                )
                .await?,
            );

            let report = ManualDetector::new(client).report(token).await;
            println!("\nContract {}", token);
            println!(
                "  Price:      {} {} ({})",
                format_ether(report.price),
                chain.native_symbol,
                report.price_source.unwrap_or("not readable, assuming free")
            );
            match report.supply {
                Some(supply) => println!("  Supply:     {}", supply),
                None => println!("  Supply:     unknown"),
            }
            println!("  Status:     {:?}", report.status);
            match report.start_time {
                Some(start) => println!("  Starts:     {}", format_start_time(start)),
                None => println!("  Starts:     unknown"),
            }
            println!();
        }

        Commands::Mint {
            contract,
            quantity,
            window,
            at,
            block,
            after,
            price,
            function,
            gas_limit,
            priority_fee,
            max_fee,
            max_retries,
            retry_delay_ms,
            fee_recipient,
            yes,
        } => {
            let token = parse_contract(&contract)?;
            let quantity = validate_mint_quantity(quantity)?;

            let signers = load_signers(&config.wallets)?;
            let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();
            let accounts = Account::numbered(&addresses);
            info!(
                target: RESULT_TARGET,
                "Loaded {} wallet(s) from {}",
                accounts.len(),
                config.wallets.describe()
            );

            let client = Arc::new(
                RpcChainClient::connect(
                    &chain.rpc_endpoint,
                    Some(chain.chain_id),
                    signers,
                    config.client_settings(),
                )
                .await?,
            );

            let mut dispatcher = MintDispatcher::new(
                client.clone(),
                token,
                config.gas_config(),
                config.dispatch_settings(),
            );

            let cli_overrides = MintOverrides {
                price,
                function,
                gas_limit,
                max_priority_fee: priority_fee.map(gwei_to_wei),
                max_fee_per_gas: max_fee.map(gwei_to_wei),
                max_retries,
                retry_delay_ms,
                fee_recipient,
                ..Default::default()
            };
            dispatcher.set_overrides(cli_overrides.merged_over(&config.overrides))?;

            if !dispatcher.analyze(window.unwrap_or(config.block_window)).await {
                warn!("No recent mints to learn from, using manual detection");
                let detector = ManualDetector::new(client.clone());
                let status = detector.sale_status(token).await;
                if !status.is_open() {
                    warn!("Sale status of {:?} is {:?}", token, status);
                }
                dispatcher.use_pattern(detector.detect(token).await)?;
            }

            let Some(pattern) = dispatcher.pattern() else {
                bail!("No mint pattern available for {:?}", token);
            };
            print_pattern(pattern, &chain.native_symbol);

            let per_wallet = pattern
                .mean_unit_price
                .saturating_mul(alloy::primitives::U256::from(quantity));
            println!(
                "Minting {} per wallet from {} wallet(s), {} {} each",
                quantity,
                accounts.len(),
                format_ether(per_wallet),
                chain.native_symbol
            );

            if !yes
                && !Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Proceed?")
                    .default(false)
                    .interact()?
            {
                info!(target: RESULT_TARGET, "Aborted");
                return Ok(());
            }

            let scheduler = config.scheduler();
            let extras = MintOverrides::default();
            let release = || dispatcher.dispatch_batch(&accounts, quantity, &extras);

            let batch = if let Some(ts) = at {
                match scheduler.schedule_at_timestamp(ts, release).await {
                    Some(batch) => batch?,
                    None => bail!("Release time {} has already passed", ts),
                }
            } else if let Some(height) = block {
                scheduler
                    .schedule_at_block(client.as_ref(), height, release)
                    .await??
            } else if let Some(secs) = after {
                match scheduler.schedule_after(secs, release).await {
                    Some(batch) => batch?,
                    None => bail!("Release time has already passed"),
                }
            } else {
                release().await?
            };

            batch.log_summary(Some(&chain));
        }
    }

    Ok(())
}
