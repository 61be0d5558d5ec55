//! Entry-point shapes
//!
//! Mint contracts expose no common interface, so the entry point is inferred
//! from the 4-byte selector of observed mint transactions: first through a
//! static table of known mint functions, then through a calldata-length
//! heuristic.

use crate::errors::SynthesisError;
use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::Selector;
use core_logic::MintGasLimits;
use std::fmt;

/// Calldata hex length (with `0x`) up to which an unknown selector is read as `f(uint256)`.
pub const QUANTITY_ONLY_MAX_HEX_LEN: usize = 74;
/// Calldata hex length (with `0x`) up to which an unknown selector is read as `f(address,uint256)`.
pub const RECIPIENT_QUANTITY_MAX_HEX_LEN: usize = 138;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPointShape {
    /// `mint(uint256 quantity)`
    Quantity,
    /// `mint(address to, uint256 quantity)`
    RecipientQuantity,
    /// quantity, limit, merkle proof, timestamp, signature
    SignedAllowlist,
    /// (key, proof) tuple, quantity, recipient, signature
    MerkleAllowlist,
    /// Marketplace drop contract, public stage
    MarketplacePublic,
    /// Marketplace drop contract, signed stage
    MarketplaceSigned,
    /// Launchpad `mint()`, one unit per call
    Launchpad,
    /// `publicMint(uint256)` style names
    NamedPublic,
    Unknown,
}

impl EntryPointShape {
    pub fn label(&self) -> &'static str {
        match self {
            EntryPointShape::Quantity => "quantity",
            EntryPointShape::RecipientQuantity => "recipient-quantity",
            EntryPointShape::SignedAllowlist => "signed-allowlist",
            EntryPointShape::MerkleAllowlist => "merkle-allowlist",
            EntryPointShape::MarketplacePublic => "marketplace-public",
            EntryPointShape::MarketplaceSigned => "marketplace-signed",
            EntryPointShape::Launchpad => "launchpad",
            EntryPointShape::NamedPublic => "public",
            EntryPointShape::Unknown => "unknown",
        }
    }

    pub fn is_whitelist_like(&self) -> bool {
        matches!(
            self,
            EntryPointShape::SignedAllowlist | EntryPointShape::MerkleAllowlist
        )
    }

    pub fn is_public_like(&self) -> bool {
        matches!(
            self,
            EntryPointShape::Quantity
                | EntryPointShape::RecipientQuantity
                | EntryPointShape::NamedPublic
        )
    }

    pub fn default_gas_limit(&self, limits: &MintGasLimits) -> u64 {
        match self {
            EntryPointShape::Quantity
            | EntryPointShape::RecipientQuantity
            | EntryPointShape::Unknown => limits.standard,
            EntryPointShape::SignedAllowlist => limits.signed_allowlist,
            EntryPointShape::MerkleAllowlist => limits.merkle_allowlist,
            EntryPointShape::MarketplacePublic => limits.marketplace_public,
            EntryPointShape::MarketplaceSigned => limits.marketplace_signed,
            EntryPointShape::Launchpad => limits.launchpad,
            EntryPointShape::NamedPublic => limits.public,
        }
    }
}

impl fmt::Display for EntryPointShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct KnownEntryPoint {
    pub selector: Selector,
    pub signature: &'static str,
    pub shape: EntryPointShape,
}

/// Static selector table.
///
/// Marketplace entries follow the drop-contract layout
/// `(nftContract, feeRecipient, minterIfNotPayer, quantity, ...)`; the signed
/// stage adds the mint-params tuple, a salt and the signature.
pub const KNOWN_ENTRY_POINTS: &[KnownEntryPoint] = &[
    KnownEntryPoint {
        selector: Selector::new([0xa0, 0x71, 0x2d, 0x68]),
        signature: "mint(uint256)",
        shape: EntryPointShape::Quantity,
    },
    KnownEntryPoint {
        selector: Selector::new([0x40, 0xc1, 0x0f, 0x19]),
        signature: "mint(address,uint256)",
        shape: EntryPointShape::RecipientQuantity,
    },
    KnownEntryPoint {
        selector: Selector::new([0xb9, 0x71, 0xb4, 0xc4]),
        signature: "mint(uint32,uint32,bytes32[],uint256,bytes)",
        shape: EntryPointShape::SignedAllowlist,
    },
    KnownEntryPoint {
        selector: Selector::new([0x4a, 0x21, 0xa2, 0xdf]),
        signature: "mint((bytes32,bytes32[]),uint256,address,bytes)",
        shape: EntryPointShape::MerkleAllowlist,
    },
    KnownEntryPoint {
        selector: Selector::new([0x16, 0x1a, 0xc2, 0x1f]),
        signature: "mintPublic(address,address,address,uint256)",
        shape: EntryPointShape::MarketplacePublic,
    },
    KnownEntryPoint {
        selector: Selector::new([0x4b, 0x61, 0xcd, 0x6f]),
        signature: "mintSigned(address,address,address,uint256,(uint256,uint256,uint256,uint256,uint256,uint256,uint256,bool),uint256,bytes)",
        shape: EntryPointShape::MarketplaceSigned,
    },
    KnownEntryPoint {
        selector: Selector::new([0x12, 0x49, 0xc5, 0x8b]),
        signature: "mint()",
        shape: EntryPointShape::Launchpad,
    },
    KnownEntryPoint {
        selector: Selector::new([0x2d, 0xb1, 0x15, 0x44]),
        signature: "publicMint(uint256)",
        shape: EntryPointShape::NamedPublic,
    },
    KnownEntryPoint {
        selector: Selector::new([0xb3, 0xab, 0x66, 0xb0]),
        signature: "publicSaleMint(uint256)",
        shape: EntryPointShape::NamedPublic,
    },
];

/// `mint(uint256)`, the layout assumed when nothing better is known.
pub const STANDARD_MINT_SELECTOR: Selector = Selector::new([0xa0, 0x71, 0x2d, 0x68]);

pub fn lookup_selector(selector: Selector) -> Option<&'static KnownEntryPoint> {
    KNOWN_ENTRY_POINTS.iter().find(|k| k.selector == selector)
}

/// Fallback for unrecognized selectors, keyed on calldata length in hex
/// characters including the `0x` prefix.
pub fn shape_for_calldata_len(hex_len: usize) -> (EntryPointShape, Option<&'static str>) {
    if hex_len <= QUANTITY_ONLY_MAX_HEX_LEN {
        (EntryPointShape::Quantity, Some("mint(uint256)"))
    } else if hex_len <= RECIPIENT_QUANTITY_MAX_HEX_LEN {
        (EntryPointShape::RecipientQuantity, Some("mint(address,uint256)"))
    } else {
        (EntryPointShape::Unknown, None)
    }
}

/// A classified entry point: shape, the selector to call and the argument layout.
///
/// For heuristically classified selectors `selector` is the observed one while
/// `signature` is the assumed layout, so calls go to the same entry point that
/// was seen on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub shape: EntryPointShape,
    pub selector: Selector,
    /// Canonical signature, or `"unknown"`.
    pub signature: String,
    pub params: Vec<DynSolType>,
}

impl EntryPoint {
    pub const UNKNOWN_SIGNATURE: &'static str = "unknown";

    /// Total classification of a selector plus calldata byte length.
    pub fn classify(selector: Selector, calldata_len: usize) -> Self {
        if let Some(known) = lookup_selector(selector) {
            return Self::with_layout(known.shape, selector, known.signature);
        }

        let hex_len = 2 + calldata_len * 2;
        match shape_for_calldata_len(hex_len) {
            (shape, Some(signature)) => Self::with_layout(shape, selector, signature),
            (shape, None) => Self {
                shape,
                selector,
                signature: Self::UNKNOWN_SIGNATURE.to_string(),
                params: Vec::new(),
            },
        }
    }

    /// Plain `mint(uint256)`.
    pub fn standard() -> Self {
        Self::with_layout(
            EntryPointShape::Quantity,
            STANDARD_MINT_SELECTOR,
            "mint(uint256)",
        )
    }

    /// Builds an entry point from an operator-supplied signature such as
    /// `"mintTo(address,uint256)"` or `"function mint(uint256 qty) payable"`.
    pub fn from_signature(signature: &str) -> Result<Self, SynthesisError> {
        let function = parse_function(signature)?;
        let params = resolve_params(&function, signature)?;
        let selector = function.selector();
        let canonical = function.signature();

        let shape = match lookup_selector(selector) {
            Some(known) => known.shape,
            None if function.name.starts_with("public") => EntryPointShape::NamedPublic,
            None => shape_from_params(&params),
        };

        Ok(Self {
            shape,
            selector,
            signature: canonical,
            params,
        })
    }

    fn with_layout(shape: EntryPointShape, selector: Selector, signature: &str) -> Self {
        // Table and heuristic signatures are constants that always parse.
        let params = parse_function(signature)
            .and_then(|f| resolve_params(&f, signature))
            .unwrap_or_default();
        Self {
            shape,
            selector,
            signature: signature.to_string(),
            params,
        }
    }

    pub fn is_known_layout(&self) -> bool {
        self.signature != Self::UNKNOWN_SIGNATURE
    }

    /// Method name part of the signature.
    pub fn method_name(&self) -> &str {
        self.signature
            .split('(')
            .next()
            .unwrap_or(self.signature.as_str())
    }

    /// Best-effort decode of full calldata (selector included). Any mismatch
    /// yields an empty list.
    pub fn decode_params(&self, calldata: &[u8]) -> Vec<DynSolValue> {
        if self.params.is_empty() || calldata.len() < 4 {
            return Vec::new();
        }
        match DynSolType::Tuple(self.params.clone()).abi_decode_params(&calldata[4..]) {
            Ok(DynSolValue::Tuple(values)) => values,
            _ => Vec::new(),
        }
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn encode_call(&self, args: &[DynSolValue]) -> Result<Vec<u8>, SynthesisError> {
        if args.len() != self.params.len()
            || !self.params.iter().zip(args).all(|(ty, v)| ty.matches(v))
        {
            return Err(SynthesisError::Encoding {
                signature: self.signature.clone(),
                reason: format!(
                    "argument list does not match ({} expected, {} given)",
                    self.params.len(),
                    args.len()
                ),
            });
        }

        let mut data = self.selector.to_vec();
        data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
        Ok(data)
    }
}

fn parse_function(signature: &str) -> Result<Function, SynthesisError> {
    Function::parse(signature.trim()).map_err(|e| SynthesisError::InvalidSignature {
        signature: signature.to_string(),
        reason: e.to_string(),
    })
}

fn resolve_params(function: &Function, signature: &str) -> Result<Vec<DynSolType>, SynthesisError> {
    function
        .inputs
        .iter()
        .map(|p| p.resolve())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SynthesisError::InvalidSignature {
            signature: signature.to_string(),
            reason: e.to_string(),
        })
}

fn shape_from_params(params: &[DynSolType]) -> EntryPointShape {
    let simple = params
        .iter()
        .all(|p| matches!(p, DynSolType::Uint(_) | DynSolType::Address));
    let has_quantity = params.iter().any(|p| matches!(p, DynSolType::Uint(_)));
    let has_address = params.iter().any(|p| matches!(p, DynSolType::Address));

    match (simple, has_quantity, has_address) {
        (true, true, false) => EntryPointShape::Quantity,
        (true, true, true) => EntryPointShape::RecipientQuantity,
        _ => EntryPointShape::Unknown,
    }
}
