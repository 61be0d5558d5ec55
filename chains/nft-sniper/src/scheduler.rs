//! Release timing for a prepared batch.
//!
//! Time-gated release sleeps until shortly before the target and busy-polls
//! the monotonic clock for the last `spin_window`. Block-gated release
//! follows the client's block stream and fires once the target height is
//! observed.

use crate::client::ChainClient;
use crate::utils::format_hms;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use futures::StreamExt;
use std::future::Future;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_SPIN_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintScheduler {
    spin_window: Duration,
    countdown: bool,
}

impl Default for MintScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SPIN_WINDOW)
    }
}

fn unix_millis_now() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

impl MintScheduler {
    pub fn new(spin_window: Duration) -> Self {
        Self {
            spin_window,
            countdown: true,
        }
    }

    /// Toggles the once-per-second terminal countdown.
    pub fn with_countdown(mut self, countdown: bool) -> Self {
        self.countdown = countdown;
        self
    }

    pub fn spin_window(&self) -> Duration {
        self.spin_window
    }

    /// Runs `release` at `target_secs` (UNIX seconds). A target in the past is
    /// rejected: `release` is not called and `None` is returned.
    pub async fn schedule_at_timestamp<F, Fut, T>(&self, target_secs: u64, release: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.schedule_at_unix_millis(target_secs.saturating_mul(1000), release)
            .await
    }

    pub async fn schedule_at_unix_millis<F, Fut, T>(&self, target_ms: u64, release: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let now = unix_millis_now();
        if target_ms <= now {
            warn!(
                "Release time {} is {} ms in the past, not dispatching",
                target_ms,
                now - target_ms
            );
            return None;
        }

        let release_at = Instant::now() + Duration::from_millis(target_ms - now);
        info!(
            "Release scheduled in {}",
            format_hms((target_ms - now).div_ceil(1000))
        );
        self.wait_until(release_at).await;
        debug!(
            "Released {:?} after target",
            Instant::now().saturating_duration_since(release_at)
        );
        Some(release().await)
    }

    /// Relative form of [`schedule_at_unix_millis`](Self::schedule_at_unix_millis).
    pub async fn schedule_after<F, Fut, T>(&self, secs: u64, release: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let target = unix_millis_now().saturating_add(secs.saturating_mul(1000));
        self.schedule_at_unix_millis(target, release).await
    }

    /// Runs `release` once the chain reaches `target_block`. The block
    /// subscription is dropped before `release` starts.
    pub async fn schedule_at_block<C, F, Fut, T>(
        &self,
        client: &C,
        target_block: u64,
        release: F,
    ) -> Result<T>
    where
        C: ChainClient + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut blocks = client
            .subscribe_new_blocks()
            .await
            .context("Failed to subscribe to new blocks")?;

        loop {
            match blocks.next().await {
                Some(height) if height >= target_block => {
                    if self.countdown {
                        println!();
                    }
                    info!("Block {} reached (target {})", height, target_block);
                    break;
                }
                Some(height) => {
                    if self.countdown {
                        print!(
                            "\rBlock {} / {} ({} to go)   ",
                            height,
                            target_block,
                            target_block - height
                        );
                        std::io::stdout().flush().ok();
                    }
                }
                None => bail!("Block stream ended before block {}", target_block),
            }
        }
        drop(blocks);

        Ok(release().await)
    }

    async fn wait_until(&self, release_at: Instant) {
        let now = Instant::now();
        let coarse = release_at
            .checked_sub(self.spin_window)
            .filter(|t| *t > now)
            .unwrap_or(now);

        if self.countdown {
            let sleep = tokio::time::sleep_until(coarse.into());
            tokio::pin!(sleep);
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    _ = ticker.tick() => {
                        let left = release_at.saturating_duration_since(Instant::now());
                        print!("\rReleasing in {}   ", format_hms(left.as_secs()));
                        std::io::stdout().flush().ok();
                    }
                }
            }
            println!();
        } else {
            tokio::time::sleep_until(coarse.into()).await;
        }

        while Instant::now() < release_at {
            std::hint::spin_loop();
        }
    }
}
