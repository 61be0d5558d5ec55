//! # Core Logic - Gas Configuration
//!
//! Fee and gas-limit configuration shared by chain crates. This module provides
//! configuration only; chain-specific code performs the actual fee estimation
//! and falls back to these values when estimation fails.

use serde::Deserialize;

/// Gas ceilings for the known mint entry-point families.
///
/// Shapes carrying proofs or signatures get a larger ceiling than the plain
/// quantity mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintGasLimits {
    pub standard: u64,
    pub signed_allowlist: u64,
    pub merkle_allowlist: u64,
    pub marketplace_public: u64,
    pub marketplace_signed: u64,
    pub launchpad: u64,
    pub public: u64,
}

impl Default for MintGasLimits {
    fn default() -> Self {
        Self {
            standard: 300_000,
            signed_allowlist: 350_000,
            merkle_allowlist: 350_000,
            marketplace_public: 300_000,
            marketplace_signed: 400_000,
            launchpad: 280_000,
            public: 300_000,
        }
    }
}

/// Configuration for gas management. Fees are stored in wei.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasConfig {
    /// Used when the node cannot produce a fee estimate.
    pub fallback_max_fee_wei: u128,
    pub priority_fee_wei: u128,
    /// Optional hard ceiling applied to every per-shape limit.
    pub gas_limit_cap: Option<u64>,
    pub limits: MintGasLimits,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            fallback_max_fee_wei: gwei_to_wei(50.0), // 50 Gwei
            priority_fee_wei: gwei_to_wei(2.0),      // 2 Gwei
            gas_limit_cap: None,
            limits: MintGasLimits::default(),
        }
    }
}

impl GasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback_max_fee(mut self, max_gwei: f64) -> Self {
        self.fallback_max_fee_wei = gwei_to_wei(max_gwei);
        self
    }

    pub fn with_priority_fee(mut self, priority_gwei: f64) -> Self {
        self.priority_fee_wei = gwei_to_wei(priority_gwei);
        self
    }

    pub fn with_gas_limit_cap(mut self, cap: u64) -> Self {
        self.gas_limit_cap = Some(cap);
        self
    }

    pub fn max_gwei(&self) -> f64 {
        wei_to_gwei(self.fallback_max_fee_wei)
    }

    pub fn priority_gwei(&self) -> f64 {
        wei_to_gwei(self.priority_fee_wei)
    }

    /// Applies the optional cap to a shape default.
    pub fn capped(&self, limit: u64) -> u64 {
        match self.gas_limit_cap {
            Some(cap) => limit.min(cap),
            None => limit,
        }
    }
}

/// Convert gwei to wei
pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei * 1e9).round() as u128
}

pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / 1e9
}

/// Deserialize helper for GasConfig from TOML (`[gas]` table, gwei units)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GasConfigToml {
    pub max_fee_gwei: Option<f64>,
    pub priority_fee_gwei: Option<f64>,
    pub gas_limit_cap: Option<u64>,
    pub limit_standard: Option<u64>,
    pub limit_signed_allowlist: Option<u64>,
    pub limit_merkle_allowlist: Option<u64>,
    pub limit_marketplace_public: Option<u64>,
    pub limit_marketplace_signed: Option<u64>,
    pub limit_launchpad: Option<u64>,
    pub limit_public: Option<u64>,
}

impl From<GasConfigToml> for GasConfig {
    fn from(toml: GasConfigToml) -> Self {
        let defaults = MintGasLimits::default();
        Self {
            fallback_max_fee_wei: gwei_to_wei(toml.max_fee_gwei.unwrap_or(50.0)),
            priority_fee_wei: gwei_to_wei(toml.priority_fee_gwei.unwrap_or(2.0)),
            gas_limit_cap: toml.gas_limit_cap,
            limits: MintGasLimits {
                standard: toml.limit_standard.unwrap_or(defaults.standard),
                signed_allowlist: toml
                    .limit_signed_allowlist
                    .unwrap_or(defaults.signed_allowlist),
                merkle_allowlist: toml
                    .limit_merkle_allowlist
                    .unwrap_or(defaults.merkle_allowlist),
                marketplace_public: toml
                    .limit_marketplace_public
                    .unwrap_or(defaults.marketplace_public),
                marketplace_signed: toml
                    .limit_marketplace_signed
                    .unwrap_or(defaults.marketplace_signed),
                launchpad: toml.limit_launchpad.unwrap_or(defaults.launchpad),
                public: toml.limit_public.unwrap_or(defaults.public),
            },
        }
    }
}
