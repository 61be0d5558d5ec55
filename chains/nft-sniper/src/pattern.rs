//! Mint events and the aggregated mint pattern.

use crate::errors::SynthesisError;
use crate::overrides::MintOverrides;
use crate::shape::{EntryPoint, EntryPointShape};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, Selector, U256};
use std::collections::HashMap;

/// Samples kept from the dominant group for parameter recovery.
pub const MAX_SAMPLES: usize = 3;

/// One observed mint transaction, derived from its creation-transfer logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEvent {
    pub tx_hash: B256,
    pub block_number: u64,
    pub from: Address,
    /// Creation-transfer logs emitted by this transaction.
    pub quantity: u64,
    pub value: U256,
    pub gas_used: u64,
    pub success: bool,
}

impl MintEvent {
    /// Attached value per unit, integer division. A zero quantity falls back
    /// to the raw value.
    pub fn price_per_unit(&self) -> U256 {
        if self.quantity > 0 {
            self.value / U256::from(self.quantity)
        } else {
            self.value
        }
    }
}

/// Per-transaction analysis: the event plus what the calldata revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct MintSample {
    pub event: MintEvent,
    pub entry_point: EntryPoint,
    /// The address the transaction was sent to.
    pub call_target: Option<Address>,
    /// Decoded arguments, empty when decoding failed.
    pub params: Vec<DynSolValue>,
}

impl MintSample {
    pub fn selector(&self) -> Selector {
        self.entry_point.selector
    }
}

/// Conclusion of an analysis run. Statistics only cover transactions that
/// share the dominant selector.
#[derive(Debug, Clone, PartialEq)]
pub struct MintPattern {
    pub entry_point: EntryPoint,
    /// Where mint calls are sent. Differs from the token contract for
    /// marketplace drops.
    pub call_target: Address,
    pub mean_unit_price: U256,
    pub mean_quantity: u64,
    pub sample_count: usize,
    pub samples: Vec<MintSample>,
    pub is_whitelist_like: bool,
    pub is_public_like: bool,
}

impl MintPattern {
    /// Pattern for an externally chosen entry point with no observed samples.
    pub fn manual(entry_point: EntryPoint, call_target: Address, unit_price: U256) -> Self {
        Self {
            is_whitelist_like: entry_point.shape.is_whitelist_like(),
            is_public_like: entry_point.shape.is_public_like(),
            entry_point,
            call_target,
            mean_unit_price: unit_price,
            mean_quantity: 1,
            sample_count: 0,
            samples: Vec::new(),
        }
    }

    pub fn shape(&self) -> EntryPointShape {
        self.entry_point.shape
    }

    pub fn selector(&self) -> Selector {
        self.entry_point.selector
    }

    pub fn signature(&self) -> &str {
        &self.entry_point.signature
    }

    /// Applies the operator's price and function overrides, if any.
    pub fn with_overrides(&self, overrides: &MintOverrides) -> Result<Self, SynthesisError> {
        let mut pattern = self.clone();

        if let Some(price) = overrides.unit_price()? {
            pattern.mean_unit_price = price;
        }

        if let Some(signature) = overrides.function.as_deref() {
            pattern.entry_point = EntryPoint::from_signature(signature)?;
            pattern.is_whitelist_like = pattern.entry_point.shape.is_whitelist_like();
            pattern.is_public_like = pattern.entry_point.shape.is_public_like();
        }

        Ok(pattern)
    }
}

/// Picks the dominant selector and aggregates its statistics.
///
/// Groups keep first-seen order, so ties go to the selector whose first
/// transaction appeared earliest. Zero-quantity transactions are left out.
pub fn aggregate(samples: Vec<MintSample>, token: Address) -> Option<MintPattern> {
    let samples: Vec<MintSample> = samples
        .into_iter()
        .filter(|s| s.event.quantity > 0)
        .collect();

    let mut order: Vec<Selector> = Vec::new();
    let mut groups: HashMap<Selector, Vec<usize>> = HashMap::new();
    for (idx, sample) in samples.iter().enumerate() {
        let members = groups.entry(sample.selector()).or_insert_with(|| {
            order.push(sample.selector());
            Vec::new()
        });
        members.push(idx);
    }

    let mut dominant: Option<&Vec<usize>> = None;
    for selector in &order {
        let members = &groups[selector];
        if dominant.is_none_or(|best| members.len() > best.len()) {
            dominant = Some(members);
        }
    }
    let members = dominant?;

    let count = members.len() as u64;
    let price_sum = members
        .iter()
        .fold(U256::ZERO, |acc, &i| acc + samples[i].event.price_per_unit());
    let quantity_sum: u64 = members.iter().map(|&i| samples[i].event.quantity).sum();

    let first = &samples[members[0]];
    let entry_point = first.entry_point.clone();
    let call_target = first.call_target.unwrap_or(token);

    Some(MintPattern {
        is_whitelist_like: entry_point.shape.is_whitelist_like(),
        is_public_like: entry_point.shape.is_public_like(),
        entry_point,
        call_target,
        mean_unit_price: price_sum / U256::from(count),
        // round half up
        mean_quantity: (quantity_sum * 2 + count) / (count * 2),
        sample_count: members.len(),
        samples: members
            .iter()
            .take(MAX_SAMPLES)
            .map(|&i| samples[i].clone())
            .collect(),
    })
}
