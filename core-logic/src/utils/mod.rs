//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod gas;
pub(crate) mod logger;
pub(crate) mod retry;

pub use gas::{gwei_to_wei, wei_to_gwei, GasConfig, GasConfigToml, MintGasLimits};
pub use logger::{setup_logger, RESULT_TARGET};
