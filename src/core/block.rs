//! Block implementation for the ledger
//!
//! A block binds a previous-block reference, a merkle root over its
//! transactions' proof digests, a timestamp and a nonce. It is built unsealed
//! and sealed exactly once by proof-of-work.

use crate::core::transaction::Transaction;
use crate::crypto::{calculate_merkle_root, is_hex_digest, meets_difficulty};
use crate::mining::{CancelToken, MineOutcome, ProofOfWork};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Block Constants
// =============================================================================

/// Current block format version
pub const BLOCK_VERSION: u32 = 1;

/// Previous-hash sentinel for the first block of a chain
pub const GENESIS_PREVIOUS_HASH: &str = "0";

// =============================================================================
// Block Errors
// =============================================================================

/// Block validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid merkle root")]
    InvalidMerkleRoot,
    #[error("Invalid block hash")]
    InvalidBlockHash,
    #[error("Transaction {0} has a missing or wrong proof digest")]
    InvalidTransactionProof(usize),
}

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain
    pub index: u64,
    /// Effective hash of the previous block, or [`GENESIS_PREVIOUS_HASH`]
    pub previous_hash: String,
    /// Merkle root of the transaction proofs, empty for an empty block
    pub merkle_root: String,
    /// Mined hash, `None` until sealed
    pub hash: Option<String>,
    pub nonce: u64,
    /// Milliseconds since the Unix epoch, captured at construction
    pub timestamp: i64,
    pub version: u32,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new unsealed block, assigning every transaction its proof
    pub fn new(
        index: u64,
        mut transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        version: u32,
    ) -> Self {
        for tx in transactions.iter_mut() {
            tx.proof = Some(tx.calculate_proof());
        }
        let merkle_root = Self::calculate_merkle_root(&transactions);

        Self {
            index,
            previous_hash: previous_hash.into(),
            merkle_root,
            hash: None,
            nonce: 0,
            timestamp: Utc::now().timestamp_millis(),
            version,
            transactions,
        }
    }

    /// Create the empty genesis block; it is never mined
    pub fn genesis(version: u32) -> Self {
        Self::new(0, Vec::new(), GENESIS_PREVIOUS_HASH, version)
    }

    /// Calculate the merkle root from transaction proofs
    fn calculate_merkle_root(transactions: &[Transaction]) -> String {
        let proofs: Vec<String> = transactions.iter().map(|tx| tx.calculate_proof()).collect();
        calculate_merkle_root(&proofs)
    }

    /// Sealing material without the nonce
    pub fn data(&self) -> String {
        format!(
            "{}{}{}{}",
            self.previous_hash, self.merkle_root, self.version, self.timestamp
        )
    }

    /// Recompute the hash for the current nonce
    ///
    /// Uses the same `data ‖ previous_hash ‖ nonce` input as mining, so a
    /// stored hash always matches its recomputation.
    pub fn calculate_hash(&self) -> String {
        ProofOfWork::hash(&self.data(), &self.previous_hash, self.nonce)
    }

    /// The stored hash, or a recomputation if the block was never sealed
    ///
    /// The recomputation includes `previous_hash` after `data`, matching the
    /// mined hash rather than a bare `data ‖ nonce` digest.
    pub fn effective_hash(&self) -> String {
        self.hash.clone().unwrap_or_else(|| self.calculate_hash())
    }

    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    /// Mine and seal the block, returning the number of attempts
    pub fn mine(&mut self, pow: &ProofOfWork) -> u64 {
        let (nonce, hash) = pow.mine(0, &self.data(), &self.previous_hash);
        self.nonce = nonce;
        self.hash = Some(hash);
        nonce
    }

    /// Mine with a cancellation token; the block stays unsealed if cancelled
    pub fn mine_cancellable(&mut self, pow: &ProofOfWork, cancel: &CancelToken) -> MineOutcome {
        let outcome = pow.mine_cancellable(0, &self.data(), &self.previous_hash, cancel);
        if let MineOutcome::Found { nonce, hash, .. } = &outcome {
            self.nonce = *nonce;
            self.hash = Some(hash.clone());
        }
        outcome
    }

    /// Check if the stored hash meets the difficulty
    pub fn is_valid_pow(&self, difficulty: usize) -> bool {
        self.hash
            .as_deref()
            .map(|h| meets_difficulty(h, difficulty))
            .unwrap_or(false)
    }

    /// Verify the block's merkle root against its transactions
    pub fn verify_merkle_root(&self) -> bool {
        Self::calculate_merkle_root(&self.transactions) == self.merkle_root
    }

    /// Verify the stored hash matches a recomputation
    pub fn verify_hash(&self) -> bool {
        match &self.hash {
            Some(hash) => is_hex_digest(hash) && *hash == self.calculate_hash(),
            None => true,
        }
    }

    /// Full validation: transaction proofs, merkle root and, once sealed,
    /// hash and proof of work
    pub fn validate(&self, difficulty: usize) -> Result<(), BlockError> {
        for (i, tx) in self.transactions.iter().enumerate() {
            if tx.proof.as_deref() != Some(tx.calculate_proof().as_str()) {
                return Err(BlockError::InvalidTransactionProof(i));
            }
        }

        if !self.verify_merkle_root() {
            return Err(BlockError::InvalidMerkleRoot);
        }

        if self.is_sealed() {
            if !self.verify_hash() {
                return Err(BlockError::InvalidBlockHash);
            }
            if !self.is_valid_pow(difficulty) {
                return Err(BlockError::InvalidProofOfWork);
            }
        }

        Ok(())
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Read-only summary of the block
    pub fn view(&self) -> BlockView {
        BlockView {
            index: self.index,
            nonce: self.nonce,
            previous_hash: self.previous_hash.clone(),
            hash: self.effective_hash(),
            merkle_root: self.merkle_root.clone(),
            timestamp: self.timestamp,
            transactions: self.transactions.iter().map(|tx| tx.to_string()).collect(),
        }
    }
}

/// Exported view of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockView {
    pub index: u64,
    pub nonce: u64,
    pub previous_hash: String,
    pub hash: String,
    pub merkle_root: String,
    pub timestamp: i64,
    pub transactions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::create("ASSET1", "Alice", ""),
            Transaction::transfer("ASSET1", "Alice", "Bob", "dock 4"),
        ]
    }

    #[test]
    fn test_new_block_assigns_proofs_and_root() {
        let block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);

        for tx in &block.transactions {
            assert_eq!(tx.proof.as_deref(), Some(tx.calculate_proof().as_str()));
        }
        let proofs: Vec<String> = block
            .transactions
            .iter()
            .filter_map(|tx| tx.proof.clone())
            .collect();
        assert_eq!(block.merkle_root, calculate_merkle_root(&proofs));
        assert!(block.hash.is_none());
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(BLOCK_VERSION);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.merkle_root, "");
        assert!(!genesis.is_sealed());
        assert_eq!(genesis.effective_hash(), genesis.calculate_hash());
        assert!(genesis.validate(4).is_ok());
    }

    #[test]
    fn test_data_layout() {
        let block = Block::new(1, vec![], "abc", 7);
        assert_eq!(block.data(), format!("abc7{}", block.timestamp));
    }

    #[test]
    fn test_block_mining() {
        let mut block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);
        let pow = ProofOfWork::new(2);

        block.mine(&pow);

        assert!(block.is_valid_pow(2));
        assert!(block.verify_merkle_root());
        assert!(block.verify_hash());
        assert!(block.validate(2).is_ok());
        assert!(block.hash.as_deref().unwrap().starts_with("00"));
    }

    #[test]
    fn test_merkle_root_verification() {
        let mut block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);
        block.mine(&ProofOfWork::new(1));

        block.transactions[1].to = "Mallory".to_string();
        assert!(!block.verify_merkle_root());
        assert_eq!(block.validate(1), Err(BlockError::InvalidTransactionProof(1)));
    }

    #[test]
    fn test_block_hash_verification() {
        let mut block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);
        block.mine(&ProofOfWork::new(1));
        assert!(block.verify_hash());

        block.nonce += 1;
        assert!(!block.verify_hash());
        assert_eq!(block.validate(1), Err(BlockError::InvalidBlockHash));
    }

    #[test]
    fn test_malformed_stored_hash_rejected() {
        let mut block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);
        block.mine(&ProofOfWork::new(1));

        let upper = block.hash.as_deref().unwrap().to_uppercase();
        block.hash = Some(upper);
        assert!(!block.verify_hash());

        block.hash = Some("0".to_string());
        assert_eq!(block.validate(1), Err(BlockError::InvalidBlockHash));
    }

    #[test]
    fn test_unsealed_hash_includes_previous_hash() {
        let block = Block::new(1, vec![], "abc", BLOCK_VERSION);
        assert_eq!(
            block.effective_hash(),
            ProofOfWork::hash(&block.data(), "abc", block.nonce)
        );
    }

    #[test]
    fn test_cancelled_mining_leaves_block_unsealed() {
        let mut block = Block::new(1, sample_txs(), GENESIS_PREVIOUS_HASH, BLOCK_VERSION);
        let token = CancelToken::new();
        token.cancel();

        let outcome = block.mine_cancellable(&ProofOfWork::new(64), &token);
        assert!(matches!(outcome, MineOutcome::Cancelled { .. }));
        assert!(!block.is_sealed());
    }

    #[test]
    fn test_view() {
        let mut block = Block::new(3, sample_txs(), "prev", BLOCK_VERSION);
        block.mine(&ProofOfWork::new(1));
        let view = block.view();

        assert_eq!(view.index, 3);
        assert_eq!(view.nonce, block.nonce);
        assert_eq!(view.hash, block.hash.clone().unwrap());
        assert_eq!(
            view.transactions,
            vec![
                "[CREATE] ASSET1 GENESIS -> Alice".to_string(),
                "[TRANSFER] ASSET1 Alice -> Bob | dock 4".to_string(),
            ]
        );
    }
}
