//! Dispatcher
//!
//! Sends the synthesized mint call from one or many accounts. Every account
//! is handled by its own task with its own bounded retry loop; the batch
//! waits for all of them and never short-circuits on a failure.
//!
//! Attempt-level failures are classified into [`MintError`] and reported in
//! the [`DispatchResult`]. Only sequencing mistakes (no pattern yet, invalid
//! quantity) are returned as errors.

use crate::accounts::Account;
use crate::analyzer::{PatternAnalyzer, is_creation_transfer};
use crate::client::{CallRequest, ChainClient, FeeEstimate, TxReceipt};
use crate::errors::{DispatchError, MintError, SynthesisError};
use crate::overrides::MintOverrides;
use crate::pattern::MintPattern;
use crate::shape::EntryPoint;
use crate::payload::{PayloadBuilder, validate};
use crate::utils::validate_mint_quantity;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, B256, U256};
use core_logic::{ChainConfig, GasConfig, RESULT_TARGET, RetryConfig, with_retry_when};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Total submission attempts per account.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Start offset between consecutive accounts in a batch.
    pub stagger: Duration,
    /// Hard bound on each inclusion wait.
    pub confirmation_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            stagger: Duration::from_millis(100),
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of one account's mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub account: Address,
    pub label: String,
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub error: Option<MintError>,
    /// Creation transfers found in the receipt, not the requested quantity.
    pub units_minted: u64,
    /// Submissions made. Zero when the account was rejected before sending.
    pub attempts: u32,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

impl DispatchResult {
    fn failure(account: &Account, error: MintError, attempts: u32) -> Self {
        Self {
            account: account.address,
            label: account.label.clone(),
            success: false,
            tx_hash: None,
            error: Some(error),
            units_minted: 0,
            attempts,
            block_number: None,
            gas_used: None,
        }
    }
}

/// Aggregate over a batch, in account order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub successful: usize,
    pub failed: usize,
    pub total_units_minted: u64,
    pub results: Vec<DispatchResult>,
    pub duration: Duration,
    /// Unit price the batch was sent with.
    pub unit_price: U256,
}

impl BatchResult {
    pub fn from_results(results: Vec<DispatchResult>, duration: Duration, unit_price: U256) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            successful,
            failed: results.len() - successful,
            total_units_minted: results.iter().map(|r| r.units_minted).sum(),
            results,
            duration,
            unit_price,
        }
    }

    /// Unit price times units actually minted.
    pub fn total_cost(&self) -> U256 {
        self.unit_price
            .saturating_mul(U256::from(self.total_units_minted))
    }

    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.successful as f64 * 100.0 / self.results.len() as f64
        }
    }

    pub fn log_summary(&self, chain: Option<&ChainConfig>) {
        let symbol = chain.map(|c| c.native_symbol.as_str()).unwrap_or("ETH");

        info!(target: RESULT_TARGET, "========== BATCH SUMMARY ==========");
        for r in &self.results {
            match (&r.tx_hash, &r.error) {
                (Some(hash), None) => {
                    let link = chain
                        .and_then(|c| c.tx_url(&format!("{:?}", hash)))
                        .unwrap_or_else(|| format!("{:?}", hash));
                    info!(
                        target: RESULT_TARGET,
                        "SUCCESS {} minted {} unit(s) in {} attempt(s): {}",
                        r.label, r.units_minted, r.attempts, link
                    );
                }
                (_, Some(error)) => info!(
                    target: RESULT_TARGET,
                    "FAILED {} after {} attempt(s): {}",
                    r.label, r.attempts, error
                ),
                (None, None) => info!(target: RESULT_TARGET, "FAILED {}: no outcome", r.label),
            }
        }
        info!(
            target: RESULT_TARGET,
            "Successful: {}/{} ({:.1}%), failed: {}",
            self.successful,
            self.results.len(),
            self.success_rate(),
            self.failed
        );
        info!(
            target: RESULT_TARGET,
            "Units minted: {}, total cost: {} {}",
            self.total_units_minted,
            format_ether(self.total_cost()),
            symbol
        );
        info!(target: RESULT_TARGET, "Elapsed: {:.2}s", self.duration.as_secs_f64());
    }
}

pub struct MintDispatcher<C: ChainClient> {
    client: Arc<C>,
    analyzer: PatternAnalyzer<C>,
    builder: PayloadBuilder,
    token: Address,
    /// Pattern as analyzed or installed, before overrides.
    base_pattern: Option<MintPattern>,
    /// Pattern with overrides applied; shared read-only by a batch.
    pattern: Option<Arc<MintPattern>>,
    overrides: MintOverrides,
    settings: DispatchSettings,
}

impl<C: ChainClient> MintDispatcher<C> {
    pub fn new(client: Arc<C>, token: Address, gas: GasConfig, settings: DispatchSettings) -> Self {
        Self {
            analyzer: PatternAnalyzer::new(client.clone()),
            builder: PayloadBuilder::new(token, gas),
            client,
            token,
            base_pattern: None,
            pattern: None,
            overrides: MintOverrides::default(),
            settings,
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn analyzer(&self) -> &PatternAnalyzer<C> {
        &self.analyzer
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs the analyzer and installs the result. Returns whether a pattern was found.
    pub async fn analyze(&mut self, block_window: u64) -> bool {
        match self.analyzer.analyze(self.token, block_window).await {
            Some(pattern) => match self.use_pattern(pattern) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Pattern found but overrides could not be applied: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Installs an externally built pattern, e.g. from the manual detector.
    pub fn use_pattern(&mut self, pattern: MintPattern) -> Result<(), SynthesisError> {
        let effective = pattern.with_overrides(&self.overrides)?;
        self.base_pattern = Some(pattern);
        self.pattern = Some(Arc::new(effective));
        Ok(())
    }

    /// Current pattern with overrides applied.
    pub fn pattern(&self) -> Option<&MintPattern> {
        self.pattern.as_deref()
    }

    pub fn overrides(&self) -> &MintOverrides {
        &self.overrides
    }

    /// Merges `partial` over the current overrides and re-applies them to
    /// the pattern. On error nothing changes.
    pub fn set_overrides(&mut self, partial: MintOverrides) -> Result<(), SynthesisError> {
        let merged = partial.merged_over(&self.overrides);
        if let Some(base) = &self.base_pattern {
            self.pattern = Some(Arc::new(base.with_overrides(&merged)?));
        } else {
            merged.unit_price()?;
            if let Some(signature) = merged.function.as_deref() {
                EntryPoint::from_signature(signature)?;
            }
        }
        self.overrides = merged;
        Ok(())
    }

    fn established(&self) -> Result<Arc<MintPattern>, DispatchError> {
        self.pattern.clone().ok_or(DispatchError::PatternNotEstablished)
    }

    /// Mints from one account.
    pub async fn dispatch_one(
        &self,
        account: &Account,
        quantity: u64,
        extras: &MintOverrides,
    ) -> Result<DispatchResult, DispatchError> {
        let pattern = self.established()?;
        let quantity = validate_mint_quantity(quantity)?;
        Ok(self.run_account(pattern, account, quantity, extras).await)
    }

    /// Mints from every account concurrently, starts staggered by list position.
    /// Results keep the order of `accounts`.
    pub async fn dispatch_batch(
        &self,
        accounts: &[Account],
        quantity_per_account: u64,
        extras: &MintOverrides,
    ) -> Result<BatchResult, DispatchError> {
        let pattern = self.established()?;
        let quantity = validate_mint_quantity(quantity_per_account)?;
        let unit_price = extras
            .unit_price()
            .ok()
            .flatten()
            .unwrap_or(pattern.mean_unit_price);

        info!(
            target: RESULT_TARGET,
            "Dispatching {} ({} unit(s) each) from {} account(s)",
            pattern.signature(),
            quantity,
            accounts.len()
        );

        let started = Instant::now();
        let tasks = accounts.iter().enumerate().map(|(idx, account)| {
            let pattern = pattern.clone();
            let offset = self.settings.stagger * idx as u32;
            async move {
                if !offset.is_zero() {
                    tokio::time::sleep(offset).await;
                }
                self.run_account(pattern, account, quantity, extras).await
            }
            .instrument(info_span!("account", label = %account.label))
        });
        let results = join_all(tasks).await;

        Ok(BatchResult::from_results(
            results,
            started.elapsed(),
            unit_price,
        ))
    }

    async fn run_account(
        &self,
        pattern: Arc<MintPattern>,
        account: &Account,
        quantity: u64,
        extras: &MintOverrides,
    ) -> DispatchResult {
        let eligibility = self
            .analyzer
            .can_account_mint(self.token, account.address)
            .await;
        if !eligibility.can_mint {
            let reason = eligibility
                .reason
                .unwrap_or_else(|| "per-wallet limit reached".to_string());
            info!(target: RESULT_TARGET, "FAILED {} skipped: {}", account.label, reason);
            return DispatchResult::failure(account, MintError::Ineligible(reason), 0);
        }
        if let Some(reason) = &eligibility.reason {
            debug!("Eligibility of {}: {}", account.label, reason);
        }

        let fees = match self.client.fee_estimate().await {
            Ok(fees) => fees,
            Err(e) => {
                let gas = self.builder.gas();
                warn!("Fee estimation failed, using fallback fees: {}", e);
                FeeEstimate {
                    max_fee_per_gas: gas.fallback_max_fee_wei,
                    max_priority_fee_per_gas: gas.priority_fee_wei,
                }
            }
        };

        // caller extras, then pattern-level overrides, then computed fees
        let mut merged = extras.merged_over(&self.overrides);
        merged.max_fee_per_gas = merged.max_fee_per_gas.or(Some(fees.max_fee_per_gas));

        let pattern = if extras.function.is_some() {
            match pattern.with_overrides(extras) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    return DispatchResult::failure(
                        account,
                        MintError::InvalidPayload(e.to_string()),
                        0,
                    );
                }
            }
        } else {
            pattern
        };

        let payload = match self
            .builder
            .build(&pattern, quantity, account.address, &merged)
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not build payload for {}: {}", account.label, e);
                return DispatchResult::failure(account, MintError::InvalidPayload(e.to_string()), 0);
            }
        };
        validate(&payload, &pattern);

        let request = payload.call_request(fees.max_fee_per_gas);
        let retry = RetryConfig::fixed(
            merged
                .max_retries
                .unwrap_or(self.settings.max_attempts)
                .max(1),
            merged
                .retry_delay_ms
                .unwrap_or(self.settings.retry_delay.as_millis() as u64),
        );

        let outcome = with_retry_when(
            retry,
            &format!("mint from {}", account.label),
            |attempt| self.submit_and_confirm(account, &request, attempt),
            MintError::is_retryable,
        )
        .await;

        match outcome.result {
            Ok(receipt) => {
                let units = receipt
                    .logs
                    .iter()
                    .filter(|log| is_creation_transfer(log, self.token))
                    .count() as u64;
                if units == 0 {
                    warn!(
                        "{}: transaction {:?} succeeded but no creation transfers were found",
                        account.label, receipt.transaction_hash
                    );
                }
                info!(
                    target: RESULT_TARGET,
                    "SUCCESS {} minted {} unit(s), tx {:?} (attempt {})",
                    account.label,
                    units,
                    receipt.transaction_hash,
                    outcome.attempts
                );
                DispatchResult {
                    account: account.address,
                    label: account.label.clone(),
                    success: true,
                    tx_hash: Some(receipt.transaction_hash),
                    error: None,
                    units_minted: units,
                    attempts: outcome.attempts,
                    block_number: receipt.block_number,
                    gas_used: Some(receipt.gas_used),
                }
            }
            Err(error) => {
                info!(
                    target: RESULT_TARGET,
                    "FAILED {} after {} attempt(s): {}",
                    account.label,
                    outcome.attempts,
                    error
                );
                DispatchResult::failure(account, error, outcome.attempts)
            }
        }
    }

    /// One submission plus a bounded inclusion wait.
    async fn submit_and_confirm(
        &self,
        account: &Account,
        request: &CallRequest,
        attempt: u32,
    ) -> Result<TxReceipt, MintError> {
        let hash = self
            .client
            .submit(account.address, request)
            .await
            .map_err(|e| MintError::classify(&format!("{:#}", e)))?;
        debug!("{} attempt {}: submitted {:?}", account.label, attempt, hash);

        let receipt = tokio::time::timeout(
            self.settings.confirmation_timeout,
            self.client.wait_for_receipt(hash),
        )
        .await
        .map_err(|_| MintError::ConfirmationTimeout)?
        .map_err(|e| MintError::classify(&format!("{:#}", e)))?;

        if receipt.status {
            Ok(receipt)
        } else {
            Err(MintError::ExecutionReverted(format!(
                "transaction {:?} reverted in block {}",
                hash,
                receipt
                    .block_number
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "?".to_string())
            )))
        }
    }
}
