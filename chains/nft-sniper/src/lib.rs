//! # NFT Sniper
//!
//! Adaptive multi-account NFT minting on EVM chains.
//!
//! The pipeline has four stages:
//!
//! - [`analyzer`] - infers the mint entry point and price from recent mint transactions
//! - [`payload`] - synthesizes a correctly shaped call for the inferred entry point
//! - [`dispatcher`] - sends it from many accounts with bounded retries
//! - [`scheduler`] - releases a batch at a wall-clock instant or block height
//!
//! Everything talks to the chain through the [`ChainClient`] trait;
//! [`RpcChainClient`] is the Alloy implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nft_sniper::{Account, DispatchSettings, MintDispatcher, MintOverrides, RpcChainClient};
//! use nft_sniper::client::ClientSettings;
//! use core_logic::GasConfig;
//! use std::sync::Arc;
//!
//! # async fn run(token: alloy::primitives::Address, accounts: Vec<Account>) -> anyhow::Result<()> {
//! let client = Arc::new(
//!     RpcChainClient::connect("https://rpc.monad.xyz", None, vec![], ClientSettings::default())
//!         .await?,
//! );
//! let mut dispatcher =
//!     MintDispatcher::new(client, token, GasConfig::default(), DispatchSettings::default());
//! if dispatcher.analyze(50).await {
//!     let batch = dispatcher
//!         .dispatch_batch(&accounts, 1, &MintOverrides::default())
//!         .await?;
//!     batch.log_summary(None);
//! }
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod analyzer;
pub mod client;
pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod errors;
pub mod overrides;
pub mod pattern;
pub mod payload;
pub mod scheduler;
pub mod shape;
pub mod utils;

pub use accounts::Account;
pub use analyzer::{Eligibility, PatternAnalyzer};
pub use client::{ChainClient, RpcChainClient};
pub use config::SniperConfig;
pub use detector::ManualDetector;
pub use dispatcher::{BatchResult, DispatchResult, DispatchSettings, MintDispatcher};
pub use errors::{DispatchError, MintError, SynthesisError};
pub use overrides::MintOverrides;
pub use pattern::{MintEvent, MintPattern};
pub use payload::{Payload, PayloadBuilder};
pub use scheduler::MintScheduler;
pub use shape::{EntryPoint, EntryPointShape};
