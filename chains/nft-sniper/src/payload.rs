//! Payload Synthesizer
//!
//! Turns a [`MintPattern`] into one concrete call for one account. Arguments
//! that cannot be derived from quantity and account (proofs, signatures,
//! drop-stage metadata) are resolved in this order:
//!
//! 1. explicit operator override
//! 2. the same argument position in a retained sample transaction
//! 3. a zero/empty value, which [`validate`] reports
//!
//! Construction never fails because auxiliary data is missing; only overrides
//! that cannot be parsed are errors.

use crate::client::CallRequest;
use crate::errors::SynthesisError;
use crate::overrides::MintOverrides;
use crate::pattern::MintPattern;
use crate::shape::{EntryPoint, EntryPointShape};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256, Bytes, I256, U256};
use core_logic::GasConfig;
use tracing::{debug, warn};

/// Transaction settings of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfig {
    /// Contract that receives the call.
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    /// `None` means "use the network estimate".
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: u128,
}

/// One concrete mint call for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub method: String,
    pub args: Vec<DynSolValue>,
    pub entry_point: EntryPoint,
    pub calldata: Bytes,
    pub tx: TxConfig,
    /// Units this call asks for.
    pub quantity: u64,
    pub needs_whitelist_proof: bool,
    pub needs_signature: bool,
    proof_arg: Option<usize>,
    signature_arg: Option<usize>,
}

impl Payload {
    /// Prices the call. `estimated_max_fee` is used unless the payload
    /// carries its own cap; the result never undercuts the priority fee.
    pub fn call_request(&self, estimated_max_fee: u128) -> CallRequest {
        let max_fee = self
            .tx
            .max_fee_per_gas
            .unwrap_or(estimated_max_fee)
            .max(self.tx.max_priority_fee_per_gas);
        CallRequest {
            to: self.tx.to,
            data: self.calldata.clone(),
            value: self.tx.value,
            gas_limit: self.tx.gas_limit,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: self.tx.max_priority_fee_per_gas,
        }
    }

    pub fn proof_arg(&self) -> Option<&DynSolValue> {
        self.proof_arg.and_then(|i| self.args.get(i))
    }

    pub fn signature_arg(&self) -> Option<&DynSolValue> {
        self.signature_arg.and_then(|i| self.args.get(i))
    }
}

/// Argument list plus where the auxiliary data sits in it.
struct ShapedArgs {
    args: Vec<DynSolValue>,
    quantity: u64,
    proof_arg: Option<usize>,
    signature_arg: Option<usize>,
    needs_whitelist_proof: bool,
    needs_signature: bool,
}

impl ShapedArgs {
    fn plain(args: Vec<DynSolValue>, quantity: u64) -> Self {
        Self {
            args,
            quantity,
            proof_arg: None,
            signature_arg: None,
            needs_whitelist_proof: false,
            needs_signature: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    /// The token contract being minted.
    token: Address,
    gas: GasConfig,
}

impl PayloadBuilder {
    pub fn new(token: Address, gas: GasConfig) -> Self {
        Self { token, gas }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn gas(&self) -> &GasConfig {
        &self.gas
    }

    /// Builds the call for `account` minting `quantity` units.
    pub fn build(
        &self,
        pattern: &MintPattern,
        quantity: u64,
        account: Address,
        overrides: &MintOverrides,
    ) -> Result<Payload, SynthesisError> {
        let entry_point = if pattern.entry_point.is_known_layout() {
            pattern.entry_point.clone()
        } else {
            debug!(
                "Unknown layout for selector {}, falling back to mint(uint256)",
                pattern.selector()
            );
            EntryPoint::standard()
        };

        let recovery = Recovery { pattern, overrides };
        let recipient = overrides.to.unwrap_or(account);

        let shaped = match entry_point.shape {
            EntryPointShape::SignedAllowlist => recovery.signed_allowlist(&entry_point, quantity)?,
            EntryPointShape::MerkleAllowlist => {
                recovery.merkle_allowlist(&entry_point, quantity, recipient)
            }
            EntryPointShape::MarketplacePublic => {
                recovery.marketplace_public(self.token, quantity, recipient)
            }
            EntryPointShape::MarketplaceSigned => {
                recovery.marketplace_signed(&entry_point, self.token, quantity, recipient)?
            }
            EntryPointShape::Launchpad if entry_point.params.is_empty() => {
                if quantity > 1 {
                    debug!("{} mints one unit per call", entry_point.signature);
                }
                ShapedArgs::plain(Vec::new(), 1)
            }
            EntryPointShape::Quantity
            | EntryPointShape::RecipientQuantity
            | EntryPointShape::NamedPublic
            | EntryPointShape::Launchpad
            | EntryPointShape::Unknown => recovery.by_types(&entry_point, quantity, recipient),
        };

        let calldata = entry_point.encode_call(&shaped.args)?;

        let unit_price = overrides.unit_price()?.unwrap_or(pattern.mean_unit_price);
        let value = unit_price.saturating_mul(U256::from(shaped.quantity));
        let gas_limit = overrides.gas_limit.unwrap_or_else(|| {
            self.gas
                .capped(entry_point.shape.default_gas_limit(&self.gas.limits))
        });

        debug!(
            "Built {} for {:?}: {} unit(s), value {}, gas {}",
            entry_point.signature,
            account,
            shaped.quantity,
            format_ether(value),
            gas_limit
        );

        Ok(Payload {
            method: entry_point.method_name().to_string(),
            args: shaped.args,
            calldata: calldata.into(),
            tx: TxConfig {
                to: pattern.call_target,
                value,
                gas_limit,
                max_fee_per_gas: overrides.max_fee_per_gas,
                max_priority_fee_per_gas: overrides
                    .max_priority_fee
                    .unwrap_or(self.gas.priority_fee_wei),
            },
            quantity: shaped.quantity,
            needs_whitelist_proof: shaped.needs_whitelist_proof,
            needs_signature: shaped.needs_signature,
            proof_arg: shaped.proof_arg,
            signature_arg: shaped.signature_arg,
            entry_point,
        })
    }
}

/// Resolves auxiliary arguments from overrides and samples.
struct Recovery<'a> {
    pattern: &'a MintPattern,
    overrides: &'a MintOverrides,
}

impl Recovery<'_> {
    /// Argument `index` of the first sample with the pattern's selector whose
    /// value has the expected type.
    fn sample_arg(&self, index: usize, ty: &DynSolType) -> Option<DynSolValue> {
        self.pattern
            .samples
            .iter()
            .filter(|s| s.selector() == self.pattern.selector())
            .find_map(|s| s.params.get(index).filter(|v| ty.matches(v)).cloned())
    }

    fn sample_or_zero(&self, index: usize, ty: &DynSolType) -> DynSolValue {
        self.sample_arg(index, ty).unwrap_or_else(|| zero_value(ty))
    }

    fn signature(&self, index: usize) -> DynSolValue {
        match &self.overrides.signature {
            Some(sig) => DynSolValue::Bytes(sig.to_vec()),
            None => self.sample_or_zero(index, &DynSolType::Bytes),
        }
    }

    fn coerce(
        &self,
        field: &str,
        raw: Option<&str>,
        index: usize,
        ty: &DynSolType,
    ) -> Result<DynSolValue, SynthesisError> {
        match raw {
            Some(raw) => ty
                .coerce_str(raw.trim())
                .map_err(|e| SynthesisError::InvalidOverride {
                    field: field.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(self.sample_or_zero(index, ty)),
        }
    }

    /// Addresses get the recipient, integers the quantity, everything else
    /// is recovered.
    fn by_types(&self, entry_point: &EntryPoint, quantity: u64, recipient: Address) -> ShapedArgs {
        let args = entry_point
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| match ty {
                DynSolType::Address => DynSolValue::Address(recipient),
                DynSolType::Uint(bits) => DynSolValue::Uint(U256::from(quantity), *bits),
                other => self.sample_or_zero(i, other),
            })
            .collect();
        ShapedArgs::plain(args, quantity)
    }

    /// `(uint32 quantity, uint32 limit, bytes32[] proof, uint256 timestamp, bytes signature)`
    fn signed_allowlist(
        &self,
        entry_point: &EntryPoint,
        quantity: u64,
    ) -> Result<ShapedArgs, SynthesisError> {
        let limit = match self.overrides.limit {
            Some(limit) => {
                let limit = u32::try_from(limit).map_err(|_| SynthesisError::InvalidOverride {
                    field: "limit".to_string(),
                    reason: format!("{} does not fit in uint32", limit),
                })?;
                DynSolValue::Uint(U256::from(limit), 32)
            }
            None => self.sample_or_zero(1, &entry_point.params[1]),
        };
        let proof = match &self.overrides.proof {
            Some(proof) => proof_array(proof),
            None => self.sample_or_zero(2, &entry_point.params[2]),
        };
        let timestamp = match self.overrides.timestamp {
            Some(ts) => DynSolValue::Uint(U256::from(ts), 256),
            None => self.sample_or_zero(3, &entry_point.params[3]),
        };

        let open_to_all = is_empty_proof(&proof) && limit.as_uint().is_some_and(|(l, _)| l.is_zero());

        Ok(ShapedArgs {
            args: vec![
                DynSolValue::Uint(U256::from(quantity), 32),
                limit,
                proof,
                timestamp,
                self.signature(4),
            ],
            quantity,
            proof_arg: Some(2),
            signature_arg: Some(4),
            needs_whitelist_proof: !open_to_all,
            needs_signature: true,
        })
    }

    /// `((bytes32 key, bytes32[] proof), uint256 quantity, address to, bytes signature)`
    fn merkle_allowlist(
        &self,
        entry_point: &EntryPoint,
        quantity: u64,
        recipient: Address,
    ) -> ShapedArgs {
        let sampled = self.sample_arg(0, &entry_point.params[0]);
        let sampled_parts = match &sampled {
            Some(DynSolValue::Tuple(parts)) => parts.as_slice(),
            _ => &[],
        };

        let key = match self.overrides.merkle_key {
            Some(key) => DynSolValue::FixedBytes(key, 32),
            None => sampled_parts
                .first()
                .cloned()
                .unwrap_or(DynSolValue::FixedBytes(B256::ZERO, 32)),
        };
        let proof = match &self.overrides.proof {
            Some(proof) => proof_array(proof),
            None => sampled_parts
                .get(1)
                .cloned()
                .unwrap_or(DynSolValue::Array(Vec::new())),
        };

        ShapedArgs {
            args: vec![
                DynSolValue::Tuple(vec![key, proof]),
                DynSolValue::Uint(U256::from(quantity), 256),
                DynSolValue::Address(recipient),
                self.signature(3),
            ],
            quantity,
            proof_arg: Some(0),
            signature_arg: Some(3),
            needs_whitelist_proof: true,
            needs_signature: true,
        }
    }

    fn fee_recipient(&self) -> DynSolValue {
        match self.overrides.fee_recipient {
            Some(fee) => DynSolValue::Address(fee),
            None => self.sample_or_zero(1, &DynSolType::Address),
        }
    }

    /// `(address nftContract, address feeRecipient, address minterIfNotPayer, uint256 quantity)`
    fn marketplace_public(&self, token: Address, quantity: u64, recipient: Address) -> ShapedArgs {
        ShapedArgs::plain(
            vec![
                DynSolValue::Address(token),
                self.fee_recipient(),
                DynSolValue::Address(recipient),
                DynSolValue::Uint(U256::from(quantity), 256),
            ],
            quantity,
        )
    }

    /// Public-stage arguments followed by the mint-params tuple, a salt and
    /// the signature.
    fn marketplace_signed(
        &self,
        entry_point: &EntryPoint,
        token: Address,
        quantity: u64,
        recipient: Address,
    ) -> Result<ShapedArgs, SynthesisError> {
        let drop_stage = self.coerce(
            "drop_stage",
            self.overrides.drop_stage.as_deref(),
            4,
            &entry_point.params[4],
        )?;
        let validation = self.coerce(
            "validation_params",
            self.overrides.validation_params.as_deref(),
            5,
            &entry_point.params[5],
        )?;

        Ok(ShapedArgs {
            args: vec![
                DynSolValue::Address(token),
                self.fee_recipient(),
                DynSolValue::Address(recipient),
                DynSolValue::Uint(U256::from(quantity), 256),
                drop_stage,
                validation,
                self.signature(6),
            ],
            quantity,
            proof_arg: None,
            signature_arg: Some(6),
            needs_whitelist_proof: false,
            needs_signature: true,
        })
    }
}

fn proof_array(proof: &[B256]) -> DynSolValue {
    DynSolValue::Array(
        proof
            .iter()
            .map(|h| DynSolValue::FixedBytes(*h, 32))
            .collect(),
    )
}

/// Zero/empty value of a type, used when nothing better is known.
pub fn zero_value(ty: &DynSolType) -> DynSolValue {
    match ty {
        DynSolType::Address => DynSolValue::Address(Address::ZERO),
        DynSolType::Bool => DynSolValue::Bool(false),
        DynSolType::Int(bits) => DynSolValue::Int(I256::ZERO, *bits),
        DynSolType::Uint(bits) => DynSolValue::Uint(U256::ZERO, *bits),
        DynSolType::FixedBytes(size) => DynSolValue::FixedBytes(B256::ZERO, *size),
        DynSolType::Bytes => DynSolValue::Bytes(Vec::new()),
        DynSolType::String => DynSolValue::String(String::new()),
        DynSolType::Array(_) => DynSolValue::Array(Vec::new()),
        DynSolType::FixedArray(inner, len) => {
            DynSolValue::FixedArray(vec![zero_value(inner); *len])
        }
        DynSolType::Tuple(types) => DynSolValue::Tuple(types.iter().map(zero_value).collect()),
        _ => DynSolValue::Bytes(Vec::new()),
    }
}

fn is_empty_proof(value: &DynSolValue) -> bool {
    match value {
        DynSolValue::Array(items) => items.iter().all(is_zero_word),
        DynSolValue::Tuple(parts) => parts.get(1).is_none_or(is_empty_proof),
        other => is_zero_word(other),
    }
}

fn is_zero_word(value: &DynSolValue) -> bool {
    matches!(value, DynSolValue::FixedBytes(word, _) if word.is_zero())
}

fn is_empty_signature(value: &DynSolValue) -> bool {
    match value {
        DynSolValue::Bytes(bytes) => bytes.iter().all(|b| *b == 0),
        _ => true,
    }
}

/// Advisory checks. An empty result means nothing looked suspicious.
pub fn validate(payload: &Payload, pattern: &MintPattern) -> Vec<String> {
    let mut warnings = Vec::new();

    if !pattern.entry_point.is_known_layout() {
        warnings.push(format!(
            "Entry point {} has no known layout, sending {} instead",
            pattern.selector(),
            payload.entry_point.signature
        ));
    }

    if payload.needs_whitelist_proof && payload.proof_arg().is_none_or(is_empty_proof) {
        warnings.push(
            "This mint requires an allowlist (Merkle proof); it will likely fail without a valid proof"
                .to_string(),
        );
    }

    if payload.needs_signature && payload.signature_arg().is_none_or(is_empty_signature) {
        warnings.push(
            "This mint requires a valid signature; it will likely fail without one".to_string(),
        );
    }

    for w in &warnings {
        warn!("{}", w);
    }
    warnings
}
