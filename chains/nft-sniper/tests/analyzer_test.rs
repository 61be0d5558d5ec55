mod common;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Selector, U256};
use common::{MockChainClient, calldata, ether, uint};
use nft_sniper::detector::SaleStatus;
use nft_sniper::shape::STANDARD_MINT_SELECTOR;
use nft_sniper::{EntryPointShape, ManualDetector, PatternAnalyzer};
use std::sync::Arc;

const WINDOW: u64 = 50;

fn token() -> Address {
    Address::repeat_byte(0xaa)
}

fn setup() -> (Arc<MockChainClient>, PatternAnalyzer<MockChainClient>) {
    let client = Arc::new(MockChainClient::new(token()));
    let analyzer = PatternAnalyzer::new(client.clone());
    (client, analyzer)
}

fn mint_qty(quantity: u64) -> alloy::primitives::Bytes {
    calldata("mint(uint256)", &[uint(quantity)])
}

#[tokio::test]
async fn test_dominant_selector_and_mean_price() {
    let (client, analyzer) = setup();
    client.add_mint(1, mint_qty(1), ether("0.01"), 1, 990);
    client.add_mint(2, mint_qty(2), ether("0.02"), 2, 991);
    client.add_mint(
        3,
        calldata(
            "mint(address,uint256)",
            &[DynSolValue::Address(Address::repeat_byte(3)), uint(1)],
        ),
        ether("0.5"),
        1,
        992,
    );
    client.add_mint(4, mint_qty(1), ether("0.01"), 1, 993);

    let pattern = analyzer.analyze(token(), WINDOW).await.unwrap();

    assert_eq!(pattern.selector(), STANDARD_MINT_SELECTOR);
    assert_eq!(pattern.shape(), EntryPointShape::Quantity);
    assert_eq!(pattern.signature(), "mint(uint256)");
    assert_eq!(pattern.sample_count, 3);
    // the 0.5 ether mint(address,uint256) call is not part of the dominant group
    assert_eq!(pattern.mean_unit_price, ether("0.01"));
    assert_eq!(pattern.mean_quantity, 1);
    assert_eq!(pattern.call_target, token());
    assert!(pattern.is_public_like);
    assert!(!pattern.is_whitelist_like);
    assert!(pattern.samples.iter().all(|s| s.selector() == STANDARD_MINT_SELECTOR));
}

#[tokio::test]
async fn test_marketplace_call_target_comes_from_samples() {
    let (client, analyzer) = setup();
    let marketplace = Address::repeat_byte(0xcc);
    let args = [
        DynSolValue::Address(token()),
        DynSolValue::Address(Address::repeat_byte(0xfe)),
        DynSolValue::Address(Address::ZERO),
        uint(1),
    ];
    client.add_mint_via(
        1,
        marketplace,
        calldata("mintPublic(address,address,address,uint256)", &args),
        ether("0.02"),
        1,
        995,
    );

    let pattern = analyzer.analyze(token(), WINDOW).await.unwrap();
    assert_eq!(pattern.shape(), EntryPointShape::MarketplacePublic);
    assert_eq!(pattern.call_target, marketplace);
    assert_eq!(pattern.samples[0].params.len(), 4);
}

#[tokio::test]
async fn test_unknown_selector_keeps_observed_selector() {
    let (client, analyzer) = setup();
    let data = calldata("claimDrop(uint256)", &[uint(2)]);
    let selector = Selector::try_from(&data[..4]).unwrap();
    client.add_mint(1, data, U256::ZERO, 2, 999);

    let pattern = analyzer.analyze(token(), WINDOW).await.unwrap();
    assert_eq!(pattern.selector(), selector);
    assert_eq!(pattern.shape(), EntryPointShape::Quantity);
    assert_eq!(pattern.mean_unit_price, U256::ZERO);
    assert_eq!(pattern.mean_quantity, 2);
}

#[tokio::test]
async fn test_missing_transaction_is_skipped() {
    let (client, analyzer) = setup();
    client.add_mint(1, mint_qty(1), ether("0.01"), 1, 990);
    let missing = client.add_mint(2, mint_qty(1), ether("0.03"), 1, 991);
    client.drop_transaction(missing);

    let pattern = analyzer.analyze(token(), WINDOW).await.unwrap();
    assert_eq!(pattern.sample_count, 1);
    assert_eq!(pattern.mean_unit_price, ether("0.01"));
}

#[tokio::test]
async fn test_no_activity_in_window() {
    let (client, analyzer) = setup();
    assert!(analyzer.analyze(token(), WINDOW).await.is_none());

    // older than latest - window
    client.add_mint(1, mint_qty(1), ether("0.01"), 1, 900);
    assert!(analyzer.analyze(token(), WINDOW).await.is_none());
    assert!(analyzer.analyze(token(), 200).await.is_some());
}

#[tokio::test]
async fn test_rpc_failure_yields_none() {
    let (client, analyzer) = setup();
    client.add_mint(1, mint_qty(1), ether("0.01"), 1, 990);
    client.fail_logs("429 Too Many Requests");

    assert!(analyzer.analyze(token(), WINDOW).await.is_none());
}

#[tokio::test]
async fn test_analysis_is_repeatable() {
    let (client, analyzer) = setup();
    client.add_mint(1, mint_qty(3), ether("0.03"), 3, 990);
    client.add_mint(2, mint_qty(1), ether("0.01"), 1, 995);

    let first = analyzer.analyze(token(), WINDOW).await;
    let second = analyzer.analyze(token(), WINDOW).await;
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_account_at_wallet_limit_is_ineligible() {
    let (client, analyzer) = setup();
    let account = Address::repeat_byte(0x42);
    client.set_uint(
        "numberMinted(address)",
        &[DynSolValue::Address(account)],
        U256::from(3),
    );
    client.set_uint("maxPerWallet()", &[], U256::from(3));

    let eligibility = analyzer.can_account_mint(token(), account).await;
    assert!(!eligibility.can_mint);
    let reason = eligibility.reason.unwrap();
    assert!(reason.contains("already minted 3 of max 3"), "{}", reason);
    assert_eq!(eligibility.minted, Some(U256::from(3)));
    assert_eq!(eligibility.max_per_wallet, Some(U256::from(3)));

    // a different account has no minted count readable
    let other = analyzer
        .can_account_mint(token(), Address::repeat_byte(0x43))
        .await;
    assert!(other.can_mint);
}

#[tokio::test]
async fn test_fallback_limit_accessors() {
    let (client, analyzer) = setup();
    let account = Address::repeat_byte(0x42);
    client.set_uint(
        "mintedCount(address)",
        &[DynSolValue::Address(account)],
        U256::from(5),
    );
    client.set_uint("maxPerAddress()", &[], U256::from(5));

    assert!(!analyzer.can_account_mint(token(), account).await.can_mint);
}

#[tokio::test]
async fn test_under_limit_and_unverifiable_are_eligible() {
    let (client, analyzer) = setup();
    let account = Address::repeat_byte(0x42);

    let unknown = analyzer.can_account_mint(token(), account).await;
    assert!(unknown.can_mint);
    assert!(unknown.reason.unwrap().starts_with("unverifiable"));

    client.set_uint(
        "numberMinted(address)",
        &[DynSolValue::Address(account)],
        U256::from(1),
    );
    client.set_uint("maxPerWallet()", &[], U256::from(3));
    let under = analyzer.can_account_mint(token(), account).await;
    assert!(under.can_mint);
    assert_eq!(under.reason, None);
}

#[tokio::test]
async fn test_zero_limit_means_unlimited() {
    let (client, analyzer) = setup();
    let account = Address::repeat_byte(0x42);
    client.set_uint(
        "numberMinted(address)",
        &[DynSolValue::Address(account)],
        U256::from(7),
    );
    client.set_uint("maxPerWallet()", &[], U256::ZERO);

    assert!(analyzer.can_account_mint(token(), account).await.can_mint);
}

#[tokio::test]
async fn test_current_price_follows_accessor_order() {
    let (client, analyzer) = setup();
    assert_eq!(analyzer.current_mint_price(token()).await, None);

    client.set_uint("cost()", &[], ether("0.2"));
    assert_eq!(analyzer.current_mint_price(token()).await, Some(ether("0.2")));

    client.set_uint("price()", &[], ether("0.1"));
    assert_eq!(analyzer.current_mint_price(token()).await, Some(ether("0.1")));
}

#[tokio::test]
async fn test_manual_detection_and_report() {
    let client = Arc::new(MockChainClient::new(token()));
    let detector = ManualDetector::new(client.clone());

    let free = detector.detect(token()).await;
    assert_eq!(free.selector(), STANDARD_MINT_SELECTOR);
    assert_eq!(free.mean_unit_price, U256::ZERO);
    assert_eq!(free.sample_count, 0);
    assert_eq!(detector.sale_status(token()).await, SaleStatus::Unknown);

    client.set_uint("getPrice()", &[], ether("0.05"));
    client.set_uint("totalSupply()", &[], U256::from(250));
    client.set_uint("maxSupply()", &[], U256::from(1000));
    client.set_bool("paused()", false);
    client.set_uint("mintStartTime()", &[], U256::from(1_700_000_000u64));

    let report = detector.report(token()).await;
    assert_eq!(report.price, ether("0.05"));
    assert_eq!(report.price_source, Some("getPrice()"));
    assert_eq!(report.supply.unwrap().remaining(), U256::from(750));
    assert_eq!(report.status, SaleStatus::Active);
    assert_eq!(report.start_time, Some(1_700_000_000));

    let priced = detector.detect(token()).await;
    assert_eq!(priced.mean_unit_price, ether("0.05"));
    assert_eq!(priced.call_target, token());
}

#[tokio::test]
async fn test_supply_info_needs_both_counters() {
    let client = Arc::new(MockChainClient::new(token()));
    let detector = ManualDetector::new(client.clone());

    client.set_uint("totalSupply()", &[], U256::from(40));
    assert!(detector.supply_info(token()).await.is_none());

    client.set_uint("maxSupply()", &[], U256::from(100));
    let supply = detector.supply_info(token()).await.unwrap();
    assert_eq!(supply.total_supply, U256::from(40));
    assert_eq!(supply.max_supply, U256::from(100));
    assert_eq!(supply.remaining(), U256::from(60));
}

#[tokio::test]
async fn test_busy_window_keeps_every_sample_and_tie_order() {
    let (client, analyzer) = setup();
    let public_mint = calldata("publicMint(uint256)", &[uint(1)]);
    for tag in 1..=40u8 {
        // alternate selectors so neither dominates
        let data = if tag % 2 == 1 { public_mint.clone() } else { mint_qty(1) };
        client.add_mint(tag, data, ether("0.01"), 1, 960 + tag as u64);
    }

    let pattern = analyzer.analyze(token(), WINDOW).await.unwrap();
    assert_eq!(pattern.signature(), "publicMint(uint256)");
    assert_eq!(pattern.sample_count, 20);
}
