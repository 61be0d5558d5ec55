//! Error types for the mint pipeline.
//!
//! [`MintError`] is the attempt-level taxonomy carried inside dispatch results.
//! It is never raised across the batch boundary. [`DispatchError`] covers
//! sequencing mistakes by the caller and [`SynthesisError`] covers operator
//! overrides that cannot be turned into a call.

use thiserror::Error;

/// Maximum length of an unclassified error message kept for display.
pub const UNCLASSIFIED_MAX_LEN: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Execution reverted: {0}")]
    ExecutionReverted(String),

    #[error("Max supply reached")]
    MaxSupplyReached,

    #[error("Max per wallet reached")]
    MaxPerWalletReached,

    #[error("Mint not active (paused or not started)")]
    MintNotActive,

    #[error("Whitelist or proof invalid")]
    WhitelistOrProofInvalid,

    #[error("Signature invalid")]
    SignatureInvalid,

    #[error("Nonce conflict")]
    NonceConflict,

    #[error("Gas insufficient")]
    GasInsufficient,

    #[error("Confirmation timeout")]
    ConfirmationTimeout,

    #[error("Account not eligible: {0}")]
    Ineligible(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Unclassified(String),
}

impl MintError {
    /// Maps a node/provider error message onto the taxonomy.
    ///
    /// Order matters: "insufficient funds for gas * price + value" must not land
    /// in the gas bucket, and revert reasons are inspected before the generic
    /// nonce/gas/timeout checks.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("insufficient funds") || msg.contains("insufficient balance") {
            return MintError::InsufficientFunds;
        }

        if msg.contains("execution reverted") || msg.contains("revert") {
            return Self::classify_revert(&msg, message);
        }

        if msg.contains("nonce") || msg.contains("already known") {
            return MintError::NonceConflict;
        }

        if msg.contains("gas") {
            return MintError::GasInsufficient;
        }

        if msg.contains("timeout") || msg.contains("timed out") {
            return MintError::ConfirmationTimeout;
        }

        MintError::Unclassified(truncate(message, UNCLASSIFIED_MAX_LEN))
    }

    fn classify_revert(lower: &str, original: &str) -> Self {
        if lower.contains("max supply") || lower.contains("sold out") || lower.contains("exceeds supply")
        {
            MintError::MaxSupplyReached
        } else if lower.contains("max per wallet")
            || lower.contains("max per address")
            || lower.contains("wallet limit")
        {
            MintError::MaxPerWalletReached
        } else if lower.contains("not started")
            || lower.contains("paused")
            || lower.contains("not active")
            || lower.contains("not live")
        {
            MintError::MintNotActive
        } else if lower.contains("whitelist") || lower.contains("allowlist") || lower.contains("proof")
        {
            MintError::WhitelistOrProofInvalid
        } else if lower.contains("signature") {
            MintError::SignatureInvalid
        } else {
            MintError::ExecutionReverted(revert_reason(original))
        }
    }

    /// Whether another attempt could plausibly change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            MintError::InsufficientFunds
                | MintError::MaxSupplyReached
                | MintError::MaxPerWalletReached
                | MintError::Ineligible(_)
                | MintError::InvalidPayload(_)
        )
    }
}

/// Text after "execution reverted", bounded for display.
fn revert_reason(message: &str) -> String {
    let lower = message.to_lowercase();
    let reason = match lower.find("execution reverted") {
        Some(idx) => message
            .get(idx + "execution reverted".len()..)
            .unwrap_or_default()
            .trim_start_matches(':')
            .trim(),
        None => message.trim(),
    };
    if reason.is_empty() {
        "no reason given".to_string()
    } else {
        truncate(reason, UNCLASSIFIED_MAX_LEN)
    }
}

fn truncate(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}

/// Sequencing errors raised synchronously to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No mint pattern established. Run analyze() or install a pattern first")]
    PatternNotEstablished,

    #[error("Quantity must be between 1 and {max}, got {got}")]
    InvalidQuantity { got: u64, max: u64 },
}

/// Operator overrides that cannot be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Invalid price override '{value}': {reason}")]
    InvalidPrice { value: String, reason: String },

    #[error("Invalid function signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidOverride { field: String, reason: String },

    #[error("Failed to encode call to {signature}: {reason}")]
    Encoding { signature: String, reason: String },
}
