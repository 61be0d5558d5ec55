//! Manual detection fallback
//!
//! Used when there is no recent mint activity to learn from: assumes the
//! plain `mint(uint256)` entry point and reads whatever sale information the
//! contract exposes through common accessor names.

use crate::analyzer::{IMintProbe, Probe, first_uint, read_bool, read_uint};
use crate::client::ChainClient;
use crate::pattern::MintPattern;
use crate::shape::EntryPoint;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyInfo {
    pub total_supply: U256,
    pub max_supply: U256,
}

impl SupplyInfo {
    pub fn remaining(&self) -> U256 {
        self.max_supply.saturating_sub(self.total_supply)
    }

    /// Minted share in basis points, 0 when the maximum is zero.
    pub fn minted_bps(&self) -> u64 {
        if self.max_supply.is_zero() {
            return 0;
        }
        let bps = self.total_supply.saturating_mul(U256::from(10_000)) / self.max_supply;
        bps.try_into().unwrap_or(u64::MAX)
    }
}

impl fmt::Display for SupplyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.minted_bps();
        write!(
            f,
            "{}/{} ({}.{:02}% minted, {} left)",
            self.total_supply,
            self.max_supply,
            bps / 100,
            bps % 100,
            self.remaining()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    Active,
    Paused,
    PublicSaleInactive,
    /// Neither `paused()` nor `publicSaleActive()` answered.
    Unknown,
}

impl SaleStatus {
    /// Unknown status is treated as open.
    pub fn is_open(&self) -> bool {
        matches!(self, SaleStatus::Active | SaleStatus::Unknown)
    }
}

/// Everything the detector could learn about a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractReport {
    pub price: U256,
    pub price_source: Option<&'static str>,
    pub supply: Option<SupplyInfo>,
    pub status: SaleStatus,
    pub start_time: Option<u64>,
}

pub struct ManualDetector<C: ChainClient> {
    client: Arc<C>,
}

impl<C: ChainClient> ManualDetector<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Quantity-only pattern priced from the contract, free when no accessor answers.
    pub async fn detect(&self, token: Address) -> MintPattern {
        let (_, price) = self.mint_price(token).await;
        info!(
            "Using manual pattern for {:?}: mint(uint256) at {} per unit",
            token,
            format_ether(price)
        );
        MintPattern::manual(EntryPoint::standard(), token, price)
    }

    pub async fn mint_price(&self, token: Address) -> (Option<&'static str>, U256) {
        let probes = [
            Probe::new(IMintProbe::costCall {}),
            Probe::new(IMintProbe::priceCall {}),
            Probe::new(IMintProbe::mintPriceCall {}),
            Probe::new(IMintProbe::getPriceCall {}),
        ];
        match first_uint(self.client.as_ref(), token, &probes).await {
            Some((name, price)) => {
                debug!("Price from {}: {} wei", name, price);
                (Some(name), price)
            }
            None => {
                warn!("Could not read mint price of {:?}, assuming free mint", token);
                (None, U256::ZERO)
            }
        }
    }

    pub async fn supply_info(&self, token: Address) -> Option<SupplyInfo> {
        let client = self.client.as_ref();
        let total_probe = Probe::new(IMintProbe::totalSupplyCall {});
        let max_probe = Probe::new(IMintProbe::maxSupplyCall {});
        let (total, max) = tokio::join!(
            read_uint(client, token, &total_probe),
            read_uint(client, token, &max_probe)
        );
        Some(SupplyInfo {
            total_supply: total?,
            max_supply: max?,
        })
    }

    pub async fn sale_status(&self, token: Address) -> SaleStatus {
        let client = self.client.as_ref();
        if let Some(paused) = read_bool(client, token, &Probe::new(IMintProbe::pausedCall {})).await
        {
            return if paused {
                SaleStatus::Paused
            } else {
                SaleStatus::Active
            };
        }
        match read_bool(client, token, &Probe::new(IMintProbe::publicSaleActiveCall {})).await {
            Some(true) => SaleStatus::Active,
            Some(false) => SaleStatus::PublicSaleInactive,
            None => SaleStatus::Unknown,
        }
    }

    /// Sale start as a UNIX timestamp in seconds.
    pub async fn mint_start_time(&self, token: Address) -> Option<u64> {
        let start = read_uint(
            self.client.as_ref(),
            token,
            &Probe::new(IMintProbe::mintStartTimeCall {}),
        )
        .await?;
        start.try_into().ok()
    }

    pub async fn report(&self, token: Address) -> ContractReport {
        let ((price_source, price), supply, status, start_time) = tokio::join!(
            self.mint_price(token),
            self.supply_info(token),
            self.sale_status(token),
            self.mint_start_time(token)
        );
        ContractReport {
            price,
            price_source,
            supply,
            status,
            start_time,
        }
    }
}

/// Local-time rendering of a UNIX timestamp, for operator output.
pub fn format_start_time(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| secs.to_string())
}
