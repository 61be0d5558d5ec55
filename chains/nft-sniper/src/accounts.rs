//! Minting accounts and private key loading.

use crate::utils::short_address;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use core_logic::{WalletError, WalletSource};
use std::fs;
use zeroize::Zeroizing;

/// An account the dispatcher mints from. Keys stay inside the chain client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub label: String,
    pub address: Address,
}

impl Account {
    pub fn new(label: impl Into<String>, address: Address) -> Self {
        Self {
            label: label.into(),
            address,
        }
    }

    /// `#1 0x1234...abcd` style labels in load order.
    pub fn numbered(addresses: &[Address]) -> Vec<Account> {
        addresses
            .iter()
            .enumerate()
            .map(|(i, a)| Account::new(format!("#{} {}", i + 1, short_address(a)), *a))
            .collect()
    }
}

/// Reads and parses every key from `source`.
pub fn load_signers(source: &WalletSource) -> Result<Vec<PrivateKeySigner>> {
    let raw = match source {
        WalletSource::File { path } => Zeroizing::new(
            fs::read_to_string(path).with_context(|| format!("Failed to read keys from {}", path))?,
        ),
        WalletSource::Env { key } => Zeroizing::new(
            std::env::var(key).with_context(|| format!("Environment variable {} not set", key))?,
        ),
    };

    let signers = parse_keys(&raw)?;
    if signers.is_empty() {
        return Err(WalletError::Empty {
            source_name: source.describe(),
        }
        .into());
    }
    Ok(signers)
}

/// Keys separated by newlines or commas; blank entries and `#` comments are skipped.
pub fn parse_keys(raw: &str) -> Result<Vec<PrivateKeySigner>, WalletError> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| parse_key(index + 1, entry))
        .collect()
}

fn parse_key(index: usize, entry: &str) -> Result<PrivateKeySigner, WalletError> {
    let hex_part = entry.strip_prefix("0x").unwrap_or(entry);
    if hex_part.len() != 64 {
        return Err(WalletError::InvalidKeyLength {
            index,
            length: hex_part.len(),
        });
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidKeyFormat { index });
    }
    hex_part
        .parse::<PrivateKeySigner>()
        .map_err(|_| WalletError::InvalidKeyFormat { index })
}
