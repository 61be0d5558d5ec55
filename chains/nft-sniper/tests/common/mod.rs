#![allow(dead_code)]

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use nft_sniper::analyzer::TRANSFER_EVENT_SIGNATURE;
use nft_sniper::client::{
    CallRequest, ChainClient, FeeEstimate, LogEntry, LogFilter, TxBody, TxReceipt,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

pub const GWEI: u128 = 1_000_000_000;

/// What happens to the next submission from an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Included with this many creation transfers.
    Mint(u64),
    /// Included with status 0.
    Revert,
    /// Rejected by the node with this message.
    Reject(String),
    /// Accepted but never included.
    Hang,
}

impl SubmitOutcome {
    pub fn reject(message: &str) -> Self {
        SubmitOutcome::Reject(message.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub from: Address,
    pub request: CallRequest,
    pub at: Instant,
}

#[derive(Default)]
struct MockState {
    latest_block: u64,
    logs: Vec<LogEntry>,
    logs_error: Option<String>,
    txs: HashMap<B256, TxBody>,
    receipts: HashMap<B256, TxReceipt>,
    views: HashMap<(Address, Bytes), Bytes>,
    scripts: HashMap<Address, VecDeque<SubmitOutcome>>,
    submissions: Vec<Submission>,
    pending: HashMap<B256, (Address, SubmitOutcome)>,
    fee_error: bool,
    blocks: Vec<u64>,
}

/// In-memory chain with scripted submission outcomes.
pub struct MockChainClient {
    pub token: Address,
    pub fees: FeeEstimate,
    state: Mutex<MockState>,
    submit_count: AtomicU32,
    subscriptions: AtomicU32,
}

impl MockChainClient {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            fees: FeeEstimate {
                max_fee_per_gas: 30 * GWEI,
                max_priority_fee_per_gas: GWEI,
            },
            state: Mutex::new(MockState {
                latest_block: 1_000,
                ..Default::default()
            }),
            submit_count: AtomicU32::new(0),
            subscriptions: AtomicU32::new(0),
        }
    }

    pub fn set_latest_block(&self, height: u64) {
        self.state.lock().unwrap().latest_block = height;
    }

    /// Records a successful mint transaction sent to the token contract.
    pub fn add_mint(&self, tag: u8, calldata: Bytes, value: U256, quantity: u64, block: u64) -> B256 {
        self.add_mint_via(tag, self.token, calldata, value, quantity, block)
    }

    /// Same as [`add_mint`](Self::add_mint) but sent to `target`, e.g. a marketplace.
    pub fn add_mint_via(
        &self,
        tag: u8,
        target: Address,
        calldata: Bytes,
        value: U256,
        quantity: u64,
        block: u64,
    ) -> B256 {
        let hash = B256::repeat_byte(tag);
        let from = Address::repeat_byte(tag);
        let logs: Vec<LogEntry> = (0..quantity)
            .map(|i| creation_transfer(self.token, from, tag as u64 * 100 + i, Some(hash), block))
            .collect();

        let mut state = self.state.lock().unwrap();
        state.logs.extend(logs.clone());
        state.txs.insert(
            hash,
            TxBody {
                hash,
                block_number: Some(block),
                from,
                to: Some(target),
                value,
                input: calldata,
            },
        );
        state.receipts.insert(
            hash,
            TxReceipt {
                transaction_hash: hash,
                block_number: Some(block),
                status: true,
                gas_used: 95_000,
                logs,
            },
        );
        hash
    }

    pub fn drop_transaction(&self, hash: B256) {
        self.state.lock().unwrap().txs.remove(&hash);
    }

    pub fn fail_logs(&self, message: &str) {
        self.state.lock().unwrap().logs_error = Some(message.to_string());
    }

    pub fn set_view(&self, contract: Address, calldata: Bytes, ret: Bytes) {
        self.state
            .lock()
            .unwrap()
            .views
            .insert((contract, calldata), ret);
    }

    /// Answers `signature(args)` on the token contract with a uint.
    pub fn set_uint(&self, signature: &str, args: &[DynSolValue], value: U256) {
        self.set_view(
            self.token,
            calldata(signature, args),
            DynSolValue::Uint(value, 256).abi_encode().into(),
        );
    }

    pub fn set_bool(&self, signature: &str, value: bool) {
        self.set_view(
            self.token,
            calldata(signature, &[]),
            DynSolValue::Bool(value).abi_encode().into(),
        );
    }

    /// Outcomes for successive submissions from `account`. Once exhausted,
    /// submissions mint one unit.
    pub fn script(&self, account: Address, outcomes: Vec<SubmitOutcome>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(account, outcomes.into());
    }

    pub fn fail_fee_estimate(&self) {
        self.state.lock().unwrap().fee_error = true;
    }

    /// Heights the next block subscription yields before ending.
    pub fn set_blocks(&self, heights: Vec<u64>) {
        self.state.lock().unwrap().blocks = heights;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submissions_from(&self, account: Address) -> Vec<Submission> {
        self.submissions()
            .into_iter()
            .filter(|s| s.from == account)
            .collect()
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn subscription_count(&self) -> u32 {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn latest_block_height(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().latest_block)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.logs_error {
            return Err(anyhow!("{}", message));
        }
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| log.topics.first() == Some(&filter.event_signature))
            .filter(|log| filter.topic1.is_none_or(|t| log.topics.get(1) == Some(&t)))
            .filter(|log| {
                log.block_number
                    .is_some_and(|b| (filter.from_block..=filter.to_block).contains(&b))
            })
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<TxBody>> {
        Ok(self.state.lock().unwrap().txs.get(&hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }

    async fn call(&self, contract: Address, data: Bytes) -> Result<Bytes> {
        self.state
            .lock()
            .unwrap()
            .views
            .get(&(contract, data))
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn submit(&self, from: Address, request: &CallRequest) -> Result<B256> {
        let n = self.submit_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.submissions.push(Submission {
            from,
            request: request.clone(),
            at: Instant::now(),
        });

        let outcome = state
            .scripts
            .get_mut(&from)
            .and_then(|script| script.pop_front())
            .unwrap_or(SubmitOutcome::Mint(1));
        if let SubmitOutcome::Reject(message) = outcome {
            return Err(anyhow!("{}", message));
        }

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&n.to_be_bytes());
        let hash = keccak256(&preimage);
        state.pending.insert(hash, (from, outcome));
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt> {
        let (from, outcome) = self
            .state
            .lock()
            .unwrap()
            .pending
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transaction {:?}", hash))?;

        let (status, units) = match outcome {
            SubmitOutcome::Mint(units) => (true, units),
            SubmitOutcome::Revert => (false, 0),
            SubmitOutcome::Hang => return std::future::pending().await,
            SubmitOutcome::Reject(message) => return Err(anyhow!("{}", message)),
        };

        let block = self.state.lock().unwrap().latest_block + 1;
        Ok(TxReceipt {
            transaction_hash: hash,
            block_number: Some(block),
            status,
            gas_used: 120_000,
            logs: (0..units)
                .map(|i| creation_transfer(self.token, from, 10_000 + i, Some(hash), block))
                .collect(),
        })
    }

    async fn subscribe_new_blocks(&self) -> Result<BoxStream<'static, u64>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let heights = self.state.lock().unwrap().blocks.clone();
        Ok(stream::iter(heights).boxed())
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate> {
        if self.state.lock().unwrap().fee_error {
            return Err(anyhow!("eth_feeHistory not supported"));
        }
        Ok(self.fees)
    }
}

/// `Transfer(0x0, to, token_id)` emitted by `token`.
pub fn creation_transfer(
    token: Address,
    to: Address,
    token_id: u64,
    tx_hash: Option<B256>,
    block: u64,
) -> LogEntry {
    LogEntry {
        address: token,
        topics: vec![
            TRANSFER_EVENT_SIGNATURE,
            B256::ZERO,
            to.into_word(),
            B256::from(U256::from(token_id).to_be_bytes::<32>()),
        ],
        data: Bytes::new(),
        transaction_hash: tx_hash,
        block_number: Some(block),
    }
}

/// Selector of `signature` followed by the encoded `args`.
pub fn calldata(signature: &str, args: &[DynSolValue]) -> Bytes {
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
    data.into()
}

pub fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}

pub fn ether(units: &str) -> U256 {
    alloy::primitives::utils::parse_ether(units).unwrap()
}
