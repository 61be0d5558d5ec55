//! # Core Logic - Shared Utilities for the Mint Sniper
//!
//! This crate provides shared utilities used by the chain crates.
//! It includes configuration presets, typed errors, logging, retry and gas helpers.
//!
//! ## Modules
//!
//! - [`config`] - Network presets and wallet source configuration
//! - [`error`] - Typed error handling with thiserror
//! - `utils` - Logger setup, retry helpers, gas configuration

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{ChainConfig, WalletSource};
pub use error::{ConfigError, NetworkError, WalletError};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    gwei_to_wei, setup_logger, wei_to_gwei, GasConfig, GasConfigToml, MintGasLimits, RESULT_TARGET,
};

// Retry utilities
pub use utils::retry::{is_transient_error, with_retry, with_retry_when, Retried, RetryConfig};
