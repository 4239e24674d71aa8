//! Mining worker for shared chains
//!
//! Takes a snapshot of the tip under a read lock, runs the nonce search on a
//! blocking worker thread without holding any lock, then re-checks the tip
//! under the write lock before appending.

use crate::core::{Block, BlockView, BlockchainError, Chain, Transaction};
use crate::mining::pow::{CancelToken, MineOutcome};
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// A chain shared between tasks; the write lock is the single-writer guard
pub type SharedChain = Arc<RwLock<Chain>>;

/// Mining worker errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Mining cancelled after {0} attempts")]
    Cancelled(u64),
    #[error("Mining timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Mining worker failed: {0}")]
    Worker(String),
    #[error("Chain error: {0}")]
    Chain(#[from] BlockchainError),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    fn new(hash_attempts: u64, elapsed: Duration) -> Self {
        let time_ms = elapsed.as_millis();
        let hash_rate = if time_ms > 0 {
            (hash_attempts as f64) / (time_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };
        Self {
            hash_attempts,
            time_ms,
            hash_rate,
        }
    }
}

/// Miner for appending blocks to a shared chain
#[derive(Debug, Clone, Default)]
pub struct Miner {
    /// Give up on a block after this long
    pub timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Miner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops any search this miner is running
    ///
    /// A cancelled miner stays cancelled; build a new one to mine again.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Mine one block on a worker thread and append it to the chain
    pub async fn mine_block(
        &self,
        chain: &SharedChain,
        transactions: Vec<Transaction>,
    ) -> Result<(BlockView, MiningStats), MiningError> {
        let start = Instant::now();

        let (block, pow) = {
            let guard = chain.read().await;
            (guard.next_block(transactions), guard.pow())
        };

        info!(
            "Mining block {} with difficulty {}...",
            block.index,
            pow.difficulty()
        );

        let token = self.cancel.clone();
        let mut worker = tokio::task::spawn_blocking(move || {
            let mut block: Block = block;
            let outcome = block.mine_cancellable(&pow, &token);
            (block, outcome)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Mining timed out after {:?}, cancelling worker", limit);
                    self.cancel.cancel();
                    // Let the worker observe the flag and exit
                    if let Err(e) = worker.await {
                        warn!("Mining worker failed after cancellation: {}", e);
                    }
                    return Err(MiningError::TimedOut(limit));
                }
            },
            None => worker.await,
        };

        let (block, outcome) = joined.map_err(|e| MiningError::Worker(e.to_string()))?;
        let attempts = match outcome {
            MineOutcome::Found { attempts, .. } => attempts,
            MineOutcome::Cancelled { attempts } => return Err(MiningError::Cancelled(attempts)),
        };

        let stats = MiningStats::new(attempts, start.elapsed());
        let view = {
            let mut guard = chain.write().await;
            guard.append_mined(block)?.view()
        };

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            view.index, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        Ok((view, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainConfig;

    fn shared(difficulty: usize) -> SharedChain {
        Arc::new(RwLock::new(Chain::with_difficulty(difficulty).unwrap()))
    }

    #[tokio::test]
    async fn test_mine_block_appends() {
        let chain = shared(1);
        let miner = Miner::new(None);

        let (view, stats) = miner
            .mine_block(&chain, vec![Transaction::create("ASSET1", "Alice", "")])
            .await
            .unwrap();

        assert_eq!(view.index, 1);
        assert!(view.hash.starts_with('0'));
        assert!(stats.hash_attempts > 0);

        let guard = chain.read().await;
        assert_eq!(guard.len(), 2);
        assert!(guard.is_valid());
    }

    #[tokio::test]
    async fn test_mine_sequential_blocks() {
        let chain = shared(1);
        let miner = Miner::new(Some(Duration::from_secs(30)));

        for i in 0..3 {
            miner
                .mine_block(&chain, vec![Transaction::create(format!("A{}", i), "Alice", "")])
                .await
                .unwrap();
        }

        let guard = chain.read().await;
        assert_eq!(guard.len(), 4);
        assert!(guard.is_valid());
    }

    #[tokio::test]
    async fn test_timeout_cancels_search() {
        let config = ChainConfig {
            difficulty: 64,
            ..ChainConfig::default()
        };
        let chain: SharedChain = Arc::new(RwLock::new(Chain::new(config).unwrap()));
        let miner = Miner::new(Some(Duration::from_millis(50)));

        let err = miner.mine_block(&chain, vec![]).await.unwrap_err();
        assert!(matches!(err, MiningError::TimedOut(_)));
        assert!(miner.cancel_token().is_cancelled());
        assert_eq!(chain.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_external_cancel() {
        let chain = shared(64);
        let miner = Miner::new(None);
        miner.cancel_token().cancel();

        let err = miner.mine_block(&chain, vec![]).await.unwrap_err();
        assert!(matches!(err, MiningError::Cancelled(0)));
    }
}
