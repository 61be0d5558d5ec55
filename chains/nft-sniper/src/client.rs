//! Chain client - the boundary between the mint pipeline and the node
//!
//! The pipeline only talks to the chain through the [`ChainClient`] trait so the
//! analyzer, dispatcher and scheduler can run against an in-memory client in
//! tests. [`RpcChainClient`] is the production implementation built on an
//! Alloy HTTP provider.
//!
//! # Retry Logic
//!
//! Every RPC request goes through Alloy's `RetryBackoffLayer`:
//! - Max retries: 5
//! - Initial backoff: 100ms
//! - Max backoff: 2000ms
//!
//! Receipt polling additionally tolerates transient errors so that a flaky
//! endpoint does not turn an in-flight mint into a resubmission.

use alloy::network::{EthereumWallet, TransactionResponse};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::ClientBuilder;
use alloy::rpc::types::{Filter, Log, TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::Http;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{NetworkError, RetryConfig, is_transient_error, with_retry};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Log query over a block range for one event signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub event_signature: B256,
    /// Optional match on the first indexed topic (e.g. `from` of a transfer).
    pub topic1: Option<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub transaction_hash: Option<B256>,
    pub block_number: Option<u64>,
}

/// The parts of a transaction body the analyzer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub hash: B256,
    pub block_number: Option<u64>,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

/// A fully priced state-changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Operations the mint pipeline needs from a node.
///
/// Implementations sign with the key registered for `from` and keep each
/// account's nonce sequence on their own; nothing above this trait shares
/// nonce state between accounts.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_block_height(&self) -> Result<u64>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    async fn get_transaction(&self, hash: B256) -> Result<Option<TxBody>>;

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;

    /// Read-only `eth_call` against `contract` with pre-encoded calldata.
    async fn call(&self, contract: Address, data: Bytes) -> Result<Bytes>;

    /// Signs and broadcasts; returns the transaction hash once accepted by the node.
    async fn submit(&self, from: Address, request: &CallRequest) -> Result<B256>;

    /// Resolves once the transaction is included. Callers bound it with a timeout.
    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt>;

    /// Stream of new block heights. Dropping the stream unsubscribes.
    async fn subscribe_new_blocks(&self) -> Result<BoxStream<'static, u64>>;

    async fn fee_estimate(&self) -> Result<FeeEstimate>;
}

/// Polling and timeout knobs for [`RpcChainClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub receipt_poll: Duration,
    pub block_poll: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            receipt_poll: Duration::from_millis(500),
            block_poll: Duration::from_millis(400),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Alloy-backed [`ChainClient`].
///
/// All loaded signers are registered in one [`EthereumWallet`]; the provider's
/// wallet filler picks the key matching the request's `from` field, and the
/// default nonce filler tracks each account independently.
#[derive(Clone)]
pub struct RpcChainClient {
    /// Alloy provider for blockchain interactions
    pub provider: Arc<dyn Provider + Send + Sync>,
    /// Chain ID reported by the endpoint
    pub chain_id: u64,
    rpc_url: String,
    accounts: Vec<Address>,
    settings: ClientSettings,
}

impl RpcChainClient {
    /// Connects to `rpc_url` and registers `signers` for submission.
    ///
    /// Pass an empty signer list for read-only use (analysis, inspection).
    /// When `expected_chain_id` is given the endpoint must report the same id.
    pub async fn connect(
        rpc_url: &str,
        expected_chain_id: Option<u64>,
        signers: Vec<PrivateKeySigner>,
        settings: ClientSettings,
    ) -> Result<Self> {
        let reqwest_client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(16)
            .build()
            .context("Failed to build reqwest client")?;

        // Create a resilient RPC client with retry logic
        let http_transport = Http::with_client(
            reqwest_client,
            rpc_url.parse::<Url>().context("Invalid RPC URL")?,
        );

        let client = ClientBuilder::default()
            .layer(alloy::transports::layers::RetryBackoffLayer::new(
                5, 100, 2000,
            ))
            .transport(http_transport, true);

        let accounts: Vec<Address> = signers.iter().map(|s| s.address()).collect();

        let mut signers = signers.into_iter();
        let provider: Arc<dyn Provider + Send + Sync> = match signers.next() {
            Some(first) => {
                let mut wallet = EthereumWallet::new(first);
                for signer in signers {
                    wallet.register_signer(signer);
                }
                Arc::new(ProviderBuilder::new().wallet(wallet).connect_client(client))
            }
            None => Arc::new(ProviderBuilder::new().connect_client(client)),
        };

        let chain_id = Self::verify_provider_ready(&provider, rpc_url).await?;
        if let Some(expected) = expected_chain_id {
            if expected != chain_id {
                return Err(NetworkError::ChainIdMismatch {
                    endpoint: rpc_url.to_string(),
                    expected,
                    actual: chain_id,
                }
                .into());
            }
        }

        Ok(Self {
            provider,
            chain_id,
            rpc_url: rpc_url.to_string(),
            accounts,
            settings,
        })
    }

    /// Addresses whose keys are registered for submission.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Simple `eth_chainId` round-trip so the first real request does not pay
    /// for connection setup.
    async fn verify_provider_ready(
        provider: &Arc<dyn Provider + Send + Sync>,
        rpc_url: &str,
    ) -> Result<u64> {
        let chain_id = with_retry(RetryConfig::new(2, 500), "eth_chainId", || async {
            provider
                .get_chain_id()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))
        })
        .await
        .map_err(|e| NetworkError::ConnectionRefused {
            endpoint: rpc_url.to_string(),
            reason: format!("{:#}", e),
        })?;

        debug!("Provider ready - chain ID verified: {}", chain_id);
        Ok(chain_id)
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}

fn log_entry(log: &Log) -> LogEntry {
    LogEntry {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        transaction_hash: log.transaction_hash,
        block_number: log.block_number,
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn latest_block_height(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get block number: {}", e))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let mut query = Filter::new()
            .address(filter.address)
            .event_signature(filter.event_signature)
            .from_block(filter.from_block)
            .to_block(filter.to_block);
        if let Some(topic1) = filter.topic1 {
            query = query.topic1(topic1);
        }

        let logs = self
            .provider
            .get_logs(&query)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to query logs: {}", e))?;

        Ok(logs.iter().map(log_entry).collect())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TxBody>> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get transaction {:?}: {}", hash, e))?;

        Ok(tx.map(|tx| TxBody {
            hash,
            block_number: TransactionResponse::block_number(&tx),
            from: TransactionResponse::from(&tx),
            to: alloy::consensus::Transaction::to(&tx),
            value: alloy::consensus::Transaction::value(&tx),
            input: alloy::consensus::Transaction::input(&tx).clone(),
        }))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get receipt {:?}: {}", hash, e))?;

        Ok(receipt.map(|receipt| TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            status: receipt.inner.status(),
            gas_used: receipt.gas_used,
            logs: receipt.inner.logs().iter().map(log_entry).collect(),
        }))
    }

    async fn call(&self, contract: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .to(contract)
            .input(TransactionInput::from(data));

        self.provider
            .call(tx)
            .await
            .map_err(|e| anyhow::anyhow!("eth_call to {:?} failed: {}", contract, e))
    }

    async fn submit(&self, from: Address, request: &CallRequest) -> Result<B256> {
        let tx = TransactionRequest::default()
            .from(from)
            .to(request.to)
            .input(TransactionInput::from(request.data.clone()))
            .value(request.value)
            .gas_limit(request.gas_limit)
            .max_fee_per_gas(request.max_fee_per_gas)
            .max_priority_fee_per_gas(request.max_priority_fee_per_gas);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt> {
        loop {
            match self.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) if is_transient_error(&e) => {
                    debug!("Transient error polling receipt {:?}: {}", hash, e);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.settings.receipt_poll).await;
        }
    }

    async fn subscribe_new_blocks(&self) -> Result<BoxStream<'static, u64>> {
        let provider = self.provider.clone();
        let interval = self.settings.block_poll;

        // First item is the current height, then every strictly higher height seen.
        let heights = stream::unfold(
            (provider, None::<u64>),
            move |(provider, last)| async move {
                loop {
                    if last.is_some() {
                        tokio::time::sleep(interval).await;
                    }
                    match provider.get_block_number().await {
                        Ok(height) if last.is_none_or(|seen| height > seen) => {
                            return Some((height, (provider, Some(height))));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Block poll failed: {}", e);
                            if last.is_none() {
                                tokio::time::sleep(interval).await;
                            }
                        }
                    }
                }
            },
        );

        Ok(heights.boxed())
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate> {
        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| anyhow::anyhow!("Fee estimation failed: {}", e))?;

        Ok(FeeEstimate {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }
}
