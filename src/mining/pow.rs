//! Proof-of-work search
//!
//! A block is sealed by finding a nonce such that
//! `sha256_hex(data ‖ prev_hash ‖ nonce)` starts with `difficulty` ASCII
//! zeros. The search is a plain sequential scan from `cursor + 1` with no
//! upper bound, so expected work grows as 16^difficulty.

use crate::crypto::{meets_difficulty, sha256_hex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How many nonces are tried between two cancellation checks
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Largest supported difficulty (a hex digest has 64 characters)
pub const MAX_DIFFICULTY: usize = 64;

/// Cooperative cancellation flag shared between a miner and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every search holding this token to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of a cancellable search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    Found {
        nonce: u64,
        hash: String,
        attempts: u64,
    },
    Cancelled {
        attempts: u64,
    },
}

/// Leading-zero proof-of-work at a fixed difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Digest of the sealing material for one nonce
    pub fn hash(data: &str, prev_hash: &str, nonce: u64) -> String {
        let input = format!("{}{}{}", data, prev_hash, nonce);
        sha256_hex(input.as_bytes())
    }

    /// Search for a nonce, blocking until one is found
    pub fn mine(&self, nonce_cursor: u64, data: &str, prev_hash: &str) -> (u64, String) {
        let mut nonce = nonce_cursor;
        loop {
            nonce = nonce.wrapping_add(1);
            let hash = Self::hash(data, prev_hash, nonce);
            if meets_difficulty(&hash, self.difficulty) {
                return (nonce, hash);
            }
        }
    }

    /// Search for a nonce, stopping early once `cancel` fires
    pub fn mine_cancellable(
        &self,
        nonce_cursor: u64,
        data: &str,
        prev_hash: &str,
        cancel: &CancelToken,
    ) -> MineOutcome {
        let mut nonce = nonce_cursor;
        let mut attempts = 0u64;
        loop {
            if attempts % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                log::warn!("Mining cancelled after {} attempts", attempts);
                return MineOutcome::Cancelled { attempts };
            }

            nonce = nonce.wrapping_add(1);
            attempts += 1;
            let hash = Self::hash(data, prev_hash, nonce);
            if meets_difficulty(&hash, self.difficulty) {
                return MineOutcome::Found {
                    nonce,
                    hash,
                    attempts,
                };
            }
        }
    }

    /// Check a claimed nonce and hash against this difficulty
    pub fn verify(&self, data: &str, prev_hash: &str, nonce: u64, hash: &str) -> bool {
        meets_difficulty(hash, self.difficulty) && Self::hash(data, prev_hash, nonce) == hash
    }
}
