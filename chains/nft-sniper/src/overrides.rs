//! Operator overrides and per-dispatch extras.
//!
//! The same structure is used for pattern-level overrides (set once before a
//! batch) and for extras passed to a single dispatch. Merging is field-wise:
//! a value already set on the higher-priority side is never replaced.

use crate::config::deserialize_opt_u128;
use crate::errors::SynthesisError;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, B256, Bytes, U256};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MintOverrides {
    /// Unit price in native units as a decimal string, e.g. `"0.01"`.
    pub price: Option<String>,
    /// Entry-point signature replacing the inferred one.
    pub function: Option<String>,
    pub proof: Option<Vec<B256>>,
    pub limit: Option<u64>,
    pub signature: Option<Bytes>,
    /// Mint-params tuple literal for signed marketplace stages, e.g. `"(1,2,3,4,5,6,7,true)"`.
    #[serde(alias = "dropStage")]
    pub drop_stage: Option<String>,
    /// Literal for the validation argument (salt) of signed marketplace stages.
    #[serde(alias = "validationParams")]
    pub validation_params: Option<String>,
    #[serde(alias = "feeRecipient")]
    pub fee_recipient: Option<Address>,
    /// Recipient for shapes that take one. Defaults to the minting account.
    pub to: Option<Address>,
    pub timestamp: Option<u64>,
    #[serde(alias = "merkleKey")]
    pub merkle_key: Option<B256>,
    #[serde(alias = "maxPriorityFee", deserialize_with = "deserialize_opt_u128")]
    pub max_priority_fee: Option<u128>,
    #[serde(alias = "maxFeePerGas", deserialize_with = "deserialize_opt_u128")]
    pub max_fee_per_gas: Option<u128>,
    #[serde(alias = "gasLimit")]
    pub gas_limit: Option<u64>,
    /// Total submission attempts.
    #[serde(alias = "maxRetries")]
    pub max_retries: Option<u32>,
    #[serde(alias = "retryDelay")]
    pub retry_delay_ms: Option<u64>,
}

impl MintOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise merge where `self` wins over `base`.
    pub fn merged_over(&self, base: &MintOverrides) -> MintOverrides {
        MintOverrides {
            price: self.price.clone().or_else(|| base.price.clone()),
            function: self.function.clone().or_else(|| base.function.clone()),
            proof: self.proof.clone().or_else(|| base.proof.clone()),
            limit: self.limit.or(base.limit),
            signature: self.signature.clone().or_else(|| base.signature.clone()),
            drop_stage: self.drop_stage.clone().or_else(|| base.drop_stage.clone()),
            validation_params: self
                .validation_params
                .clone()
                .or_else(|| base.validation_params.clone()),
            fee_recipient: self.fee_recipient.or(base.fee_recipient),
            to: self.to.or(base.to),
            timestamp: self.timestamp.or(base.timestamp),
            merkle_key: self.merkle_key.or(base.merkle_key),
            max_priority_fee: self.max_priority_fee.or(base.max_priority_fee),
            max_fee_per_gas: self.max_fee_per_gas.or(base.max_fee_per_gas),
            gas_limit: self.gas_limit.or(base.gas_limit),
            max_retries: self.max_retries.or(base.max_retries),
            retry_delay_ms: self.retry_delay_ms.or(base.retry_delay_ms),
        }
    }

    /// Parsed unit price override in wei.
    pub fn unit_price(&self) -> Result<Option<U256>, SynthesisError> {
        match self.price.as_deref() {
            None => Ok(None),
            Some(raw) => parse_ether(raw.trim())
                .map(Some)
                .map_err(|e| SynthesisError::InvalidPrice {
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_extras_win_field_by_field() {
        let extras = MintOverrides {
            gas_limit: Some(500_000),
            price: Some("0.02".to_string()),
            ..Default::default()
        };
        let pattern_level = MintOverrides {
            gas_limit: Some(250_000),
            max_priority_fee: Some(3_000_000_000),
            price: Some("0.01".to_string()),
            ..Default::default()
        };

        let merged = extras.merged_over(&pattern_level);
        assert_eq!(merged.gas_limit, Some(500_000));
        assert_eq!(merged.price.as_deref(), Some("0.02"));
        assert_eq!(merged.max_priority_fee, Some(3_000_000_000));
        assert!(merged.proof.is_none());
    }

    #[test]
    fn test_price_parsing() {
        let ok = MintOverrides {
            price: Some("0.01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ok.unit_price().unwrap(),
            Some(U256::from(10_000_000_000_000_000u64))
        );

        let bad = MintOverrides {
            price: Some("ten".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            bad.unit_price(),
            Err(SynthesisError::InvalidPrice { .. })
        ));

        assert_eq!(MintOverrides::default().unit_price().unwrap(), None);
    }

    #[test]
    fn test_deserialize_camel_case_aliases() {
        let parsed: MintOverrides = toml::from_str(
            r#"
            price = "0.05"
            maxPriorityFee = "3000000000"
            gasLimit = 320000
            feeRecipient = "0x0000a26b00c1F0DF003000390027140000fAa719"
            proof = ["0x1111111111111111111111111111111111111111111111111111111111111111"]
            "#,
        )
        .unwrap();

        assert_eq!(parsed.max_priority_fee, Some(3_000_000_000));
        assert_eq!(parsed.gas_limit, Some(320_000));
        assert_eq!(parsed.proof.as_ref().map(Vec::len), Some(1));
        assert!(parsed.fee_recipient.is_some());
        assert!(!parsed.is_empty());
    }
}
