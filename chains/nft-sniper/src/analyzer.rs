//! Pattern Analyzer
//!
//! Replays recent creation transfers of a token contract to infer how it is
//! minted: which entry point, at what price, with which auxiliary arguments.
//! The analyzer never fails loudly; any RPC problem turns into "no pattern"
//! and the caller falls back to [`crate::detector::ManualDetector`].

use crate::client::{ChainClient, LogEntry, LogFilter};
use crate::pattern::{MintEvent, MintPattern, MintSample, aggregate};
use crate::shape::EntryPoint;
use alloy::primitives::{Address, B256, Bytes, Selector, U256, b256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolType, sol_data};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of blocks to look back.
pub const DEFAULT_BLOCK_WINDOW: u64 = 50;

/// Transaction lookups in flight at once while analyzing a window.
pub const FETCH_CONCURRENCY: usize = 16;

/// `keccak256("Transfer(address,address,uint256)")`
pub const TRANSFER_EVENT_SIGNATURE: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

sol! {
    interface IMintProbe {
        function numberMinted(address owner) external view returns (uint256);
        function mintedCount(address owner) external view returns (uint256);
        function maxPerWallet() external view returns (uint256);
        function maxPerAddress() external view returns (uint256);
        function maxMintPerWallet() external view returns (uint256);

        function mintPrice() external view returns (uint256);
        function price() external view returns (uint256);
        function cost() external view returns (uint256);
        function publicPrice() external view returns (uint256);
        function getPrice() external view returns (uint256);

        function totalSupply() external view returns (uint256);
        function maxSupply() external view returns (uint256);
        function paused() external view returns (bool);
        function publicSaleActive() external view returns (bool);
        function mintStartTime() external view returns (uint256);
    }
}

/// One candidate read-only call in a fallback chain.
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pub name: &'static str,
    pub calldata: Bytes,
}

impl Probe {
    pub fn new<T: SolCall>(call: T) -> Self {
        Self {
            name: T::SIGNATURE,
            calldata: call.abi_encode().into(),
        }
    }
}

/// Price accessors, in the order the analyzer tries them.
pub(crate) fn price_probes() -> Vec<Probe> {
    vec![
        Probe::new(IMintProbe::mintPriceCall {}),
        Probe::new(IMintProbe::priceCall {}),
        Probe::new(IMintProbe::costCall {}),
        Probe::new(IMintProbe::publicPriceCall {}),
    ]
}

/// Runs a single probe; any failure reads as absent.
pub(crate) async fn read_call<C: ChainClient + ?Sized>(
    client: &C,
    contract: Address,
    probe: &Probe,
) -> Option<Bytes> {
    match client.call(contract, probe.calldata.clone()).await {
        Ok(data) if !data.is_empty() => Some(data),
        Ok(_) => {
            debug!("{} on {:?} returned no data", probe.name, contract);
            None
        }
        Err(e) => {
            debug!("{} on {:?} failed: {}", probe.name, contract, e);
            None
        }
    }
}

pub(crate) async fn read_uint<C: ChainClient + ?Sized>(
    client: &C,
    contract: Address,
    probe: &Probe,
) -> Option<U256> {
    let data = read_call(client, contract, probe).await?;
    <sol_data::Uint<256> as SolType>::abi_decode(&data).ok()
}

pub(crate) async fn read_bool<C: ChainClient + ?Sized>(
    client: &C,
    contract: Address,
    probe: &Probe,
) -> Option<bool> {
    let data = read_call(client, contract, probe).await?;
    <sol_data::Bool as SolType>::abi_decode(&data).ok()
}

/// Tries each probe in order and returns the first value that resolves.
pub(crate) async fn first_uint<C: ChainClient + ?Sized>(
    client: &C,
    contract: Address,
    probes: &[Probe],
) -> Option<(&'static str, U256)> {
    let found = stream::iter(probes).filter_map(|probe| async move {
        read_uint(client, contract, probe)
            .await
            .map(|value| (probe.name, value))
    });
    let mut found = std::pin::pin!(found);
    found.next().await
}

/// A creation transfer: `Transfer(0x0, to, tokenId)` emitted by `token`.
pub fn is_creation_transfer(log: &LogEntry, token: Address) -> bool {
    log.address == token
        && log.topics.len() == 4
        && log.topics[0] == TRANSFER_EVENT_SIGNATURE
        && log.topics[1] == B256::ZERO
}

/// Per-transaction quantities in first-seen order.
pub fn group_by_transaction(logs: &[LogEntry], token: Address) -> Vec<(B256, u64)> {
    let mut grouped: Vec<(B256, u64)> = Vec::new();
    for log in logs.iter().filter(|l| is_creation_transfer(l, token)) {
        let Some(hash) = log.transaction_hash else {
            continue;
        };
        match grouped.iter_mut().find(|(h, _)| *h == hash) {
            Some((_, count)) => *count += 1,
            None => grouped.push((hash, 1)),
        }
    }
    grouped
}

/// Result of the advisory per-account limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub can_mint: bool,
    pub reason: Option<String>,
    pub minted: Option<U256>,
    pub max_per_wallet: Option<U256>,
}

impl Eligibility {
    fn eligible(reason: Option<String>, minted: Option<U256>, max: Option<U256>) -> Self {
        Self {
            can_mint: true,
            reason,
            minted,
            max_per_wallet: max,
        }
    }
}

pub struct PatternAnalyzer<C: ChainClient> {
    client: Arc<C>,
}

impl<C: ChainClient> Clone for PatternAnalyzer<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<C: ChainClient> PatternAnalyzer<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Infers the mint pattern of `token` from the last `block_window` blocks.
    ///
    /// Returns `None` when there was no mint activity or when the analysis
    /// could not be completed; the cause is logged.
    pub async fn analyze(&self, token: Address, block_window: u64) -> Option<MintPattern> {
        match self.try_analyze(token, block_window).await {
            Ok(Some(pattern)) => {
                info!(
                    "Pattern for {:?}: {} ({}) from {} tx, {} wei/unit, ~{} per tx",
                    token,
                    pattern.signature(),
                    pattern.shape(),
                    pattern.sample_count,
                    pattern.mean_unit_price,
                    pattern.mean_quantity
                );
                Some(pattern)
            }
            Ok(None) => {
                info!(
                    "No mint activity on {:?} in the last {} blocks",
                    token, block_window
                );
                None
            }
            Err(e) => {
                warn!("Pattern analysis failed for {:?}: {:#}", token, e);
                None
            }
        }
    }

    async fn try_analyze(&self, token: Address, block_window: u64) -> Result<Option<MintPattern>> {
        let latest = self
            .client
            .latest_block_height()
            .await
            .context("Failed to read latest block")?;

        let filter = LogFilter {
            address: token,
            event_signature: TRANSFER_EVENT_SIGNATURE,
            topic1: Some(B256::ZERO),
            from_block: latest.saturating_sub(block_window),
            to_block: latest,
        };
        let logs = self
            .client
            .get_logs(&filter)
            .await
            .context("Failed to query transfer logs")?;

        let mints = group_by_transaction(&logs, token);
        if mints.is_empty() {
            return Ok(None);
        }
        debug!(
            "{} creation transfers across {} transactions",
            logs.len(),
            mints.len()
        );

        // buffered keeps first-seen order for tie-breaking
        let samples: Vec<MintSample> = stream::iter(mints.iter())
            .map(|&(hash, quantity)| self.analyze_transaction(hash, quantity))
            .buffered(FETCH_CONCURRENCY)
            .filter_map(|sample| async move { sample })
            .collect()
            .await;

        Ok(aggregate(samples, token))
    }

    /// Fetches one mint transaction; anything missing skips it.
    async fn analyze_transaction(&self, hash: B256, quantity: u64) -> Option<MintSample> {
        let (tx, receipt) = tokio::join!(
            self.client.get_transaction(hash),
            self.client.get_transaction_receipt(hash)
        );

        let tx = match tx {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                debug!("Transaction {:?} not found, skipping", hash);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch transaction {:?}: {}", hash, e);
                return None;
            }
        };
        let receipt = match receipt {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                debug!("Receipt for {:?} not found, skipping", hash);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch receipt {:?}: {}", hash, e);
                return None;
            }
        };

        let Some(selector) = tx.input.get(..4).and_then(|s| Selector::try_from(s).ok()) else {
            debug!("Transaction {:?} carries no selector, skipping", hash);
            return None;
        };
        let entry_point = EntryPoint::classify(selector, tx.input.len());
        let params = entry_point.decode_params(&tx.input);

        Some(MintSample {
            event: MintEvent {
                tx_hash: hash,
                block_number: receipt.block_number.or(tx.block_number).unwrap_or_default(),
                from: tx.from,
                quantity,
                value: tx.value,
                gas_used: receipt.gas_used,
                success: receipt.status,
            },
            entry_point,
            call_target: tx.to,
            params,
        })
    }

    /// Advisory per-wallet limit check. Unreadable limits are optimistic.
    pub async fn can_account_mint(&self, token: Address, account: Address) -> Eligibility {
        let client = self.client.as_ref();
        let minted_probes = [
            Probe::new(IMintProbe::numberMintedCall { owner: account }),
            Probe::new(IMintProbe::mintedCountCall { owner: account }),
        ];
        let max_probes = [
            Probe::new(IMintProbe::maxPerWalletCall {}),
            Probe::new(IMintProbe::maxPerAddressCall {}),
            Probe::new(IMintProbe::maxMintPerWalletCall {}),
        ];

        let (minted, max) = tokio::join!(
            first_uint(client, token, &minted_probes),
            first_uint(client, token, &max_probes)
        );
        let minted = minted.map(|(_, v)| v);
        let max = max.map(|(_, v)| v);

        match (minted, max) {
            (Some(m), Some(limit)) if limit > U256::ZERO && m >= limit => Eligibility {
                can_mint: false,
                reason: Some(format!("already minted {} of max {} per wallet", m, limit)),
                minted,
                max_per_wallet: max,
            },
            (Some(_), Some(_)) => Eligibility::eligible(None, minted, max),
            (None, None) => Eligibility::eligible(
                Some("unverifiable: no minted-count or per-wallet limit readable".to_string()),
                None,
                None,
            ),
            (None, Some(_)) => Eligibility::eligible(
                Some("unverifiable: minted count not readable".to_string()),
                None,
                max,
            ),
            (Some(_), None) => Eligibility::eligible(
                Some("unverifiable: per-wallet limit not readable".to_string()),
                minted,
                None,
            ),
        }
    }

    /// First price accessor that answers, in wei.
    pub async fn current_mint_price(&self, token: Address) -> Option<U256> {
        let found = first_uint(self.client.as_ref(), token, &price_probes()).await;
        if let Some((name, price)) = found {
            debug!("Price from {}: {} wei", name, price);
        }
        found.map(|(_, price)| price)
    }
}
