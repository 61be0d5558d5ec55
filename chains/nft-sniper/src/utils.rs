//! Small operator-facing helpers.

use crate::errors::DispatchError;
use alloy::primitives::Address;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

pub const MAX_MINT_QUANTITY: u64 = 100;

// Launchpad and marketplace URL forms first, then any bare address.
static CONTRACT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"launchpad/[a-z0-9-]+/(0x[a-fA-F0-9]{40})",
        r"mint-terminal/[a-z0-9-]+/(0x[a-fA-F0-9]{40})",
        r"marketplace/(0x[a-fA-F0-9]{40})",
        r"(0x[a-fA-F0-9]{40})",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Contract address from a raw address or a launchpad/marketplace URL.
pub fn extract_contract_address(input: &str) -> Option<Address> {
    let input = input.trim();
    CONTRACT_PATTERNS
        .iter()
        .filter_map(|re| re.captures(input))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| Address::from_str(m.as_str()).ok())
}

pub fn validate_mint_quantity(quantity: u64) -> Result<u64, DispatchError> {
    if (1..=MAX_MINT_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(DispatchError::InvalidQuantity {
            got: quantity,
            max: MAX_MINT_QUANTITY,
        })
    }
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_hms(secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
