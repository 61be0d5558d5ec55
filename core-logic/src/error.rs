//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown network preset: '{name}'")]
    UnknownNetwork { name: String },
}

/// Wallet key loading errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("No private keys found in {source_name}")]
    Empty { source_name: String },

    #[error("Invalid private key format on entry {index}: expected hex string")]
    InvalidKeyFormat { index: usize },

    #[error("Private key on entry {index} has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { index: usize, length: usize },
}

/// Network and RPC-related errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Chain id mismatch on {endpoint}: expected {expected}, got {actual}")]
    ChainIdMismatch {
        endpoint: String,
        expected: u64,
        actual: u64,
    },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },
}
