//! Chain implementation
//!
//! The append-only sequence of sealed blocks. All mutation goes through
//! `&mut Chain`, so a single writer is enforced by the borrow checker; code
//! that shares a chain across tasks wraps it in [`crate::mining::SharedChain`].

use crate::core::block::{Block, BlockError, BlockView, BLOCK_VERSION, GENESIS_PREVIOUS_HASH};
use crate::core::transaction::{ParseError, Transaction};
use crate::mining::{CancelToken, MineOutcome, ProofOfWork, MAX_DIFFICULTY};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Default mining difficulty (number of leading zero hex digits)
pub const DEFAULT_DIFFICULTY: usize = 3;

/// Chain-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("Invalid difficulty {0}: must be between 1 and {}", MAX_DIFFICULTY)]
    InvalidDifficulty(usize),
    #[error("Invalid block {index}: {source}")]
    InvalidBlock {
        index: u64,
        #[source]
        source: BlockError,
    },
    #[error("Block at position {position} has index {index}")]
    IndexMismatch { position: usize, index: u64 },
    #[error("Broken link at block {0}: previous hash does not match")]
    BrokenLink(u64),
    #[error("Stale tip: block was mined on {expected} but the tip is {actual}")]
    StaleTip { expected: String, actual: String },
    #[error("Mining cancelled after {0} attempts")]
    MiningCancelled(u64),
    #[error("Failed to parse serialized chain ({} bad line(s))", .0.len())]
    Parse(Vec<ParseError>),
}

/// Chain construction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading zero hex digits required in every mined hash
    pub difficulty: usize,
    /// Start the chain with an explicit, unmined, empty genesis block
    pub include_genesis_block: bool,
    /// Format version written into every new block
    pub block_version: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            include_genesis_block: true,
            block_version: BLOCK_VERSION,
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<(), BlockchainError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::InvalidDifficulty(self.difficulty));
        }
        Ok(())
    }
}

/// The ledger chain
#[derive(Debug, Clone, Serialize)]
pub struct Chain {
    blocks: Vec<Block>,
    config: ChainConfig,
}

impl Chain {
    /// Create a chain, adding the genesis block if the config asks for one
    pub fn new(config: ChainConfig) -> Result<Self, BlockchainError> {
        config.validate()?;
        let mut blocks = Vec::new();
        if config.include_genesis_block {
            blocks.push(Block::genesis(config.block_version));
        }
        Ok(Self { blocks, config })
    }

    /// Create a chain with default settings and a custom difficulty
    pub fn with_difficulty(difficulty: usize) -> Result<Self, BlockchainError> {
        Self::new(ChainConfig {
            difficulty,
            ..ChainConfig::default()
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    pub fn pow(&self) -> ProofOfWork {
        ProofOfWork::new(self.config.difficulty)
    }

    /// Read-only view of every block
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get the latest block
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Get a block by index
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Hash the next block must reference
    pub fn tip_hash(&self) -> String {
        self.latest_block()
            .map(|b| b.effective_hash())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Build the unsealed block that would follow the current tip
    pub fn next_block(&self, transactions: Vec<Transaction>) -> Block {
        Block::new(
            self.blocks.len() as u64,
            transactions,
            self.tip_hash(),
            self.config.block_version,
        )
    }

    /// Create, mine and append a block; blocks until a nonce is found
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> &Block {
        let start = Instant::now();
        let mut block = self.next_block(transactions);
        let attempts = block.mine(&self.pow());

        info!(
            "Block {} mined in {}ms ({} attempts, {} txs)",
            block.index,
            start.elapsed().as_millis(),
            attempts,
            block.tx_count()
        );

        self.push(block)
    }

    /// Like [`Chain::add_block`], but gives up when `cancel` fires
    pub fn add_block_cancellable(
        &mut self,
        transactions: Vec<Transaction>,
        cancel: &CancelToken,
    ) -> Result<&Block, BlockchainError> {
        let mut block = self.next_block(transactions);
        match block.mine_cancellable(&self.pow(), cancel) {
            MineOutcome::Found { attempts, .. } => {
                info!("Block {} mined ({} attempts)", block.index, attempts);
                Ok(self.push(block))
            }
            MineOutcome::Cancelled { attempts } => Err(BlockchainError::MiningCancelled(attempts)),
        }
    }

    /// Append a block mined elsewhere, re-checking it against the current tip
    pub fn append_mined(&mut self, block: Block) -> Result<&Block, BlockchainError> {
        let tip = self.tip_hash();
        if block.previous_hash != tip {
            return Err(BlockchainError::StaleTip {
                expected: block.previous_hash,
                actual: tip,
            });
        }
        if block.index != self.blocks.len() as u64 {
            return Err(BlockchainError::IndexMismatch {
                position: self.blocks.len(),
                index: block.index,
            });
        }
        if !block.is_sealed() {
            return Err(BlockchainError::InvalidBlock {
                index: block.index,
                source: BlockError::InvalidProofOfWork,
            });
        }
        block
            .validate(self.config.difficulty)
            .map_err(|source| BlockchainError::InvalidBlock {
                index: block.index,
                source,
            })?;

        Ok(self.push(block))
    }

    fn push(&mut self, block: Block) -> &Block {
        let position = self.blocks.len();
        self.blocks.push(block);
        &self.blocks[position]
    }

    /// Summaries of every block, in order
    pub fn views(&self) -> Vec<BlockView> {
        self.blocks.iter().map(Block::view).collect()
    }

    /// Transaction lines of every block, the input format of [`Chain::load_chain`]
    pub fn export_transactions(&self) -> Vec<Vec<String>> {
        self.blocks
            .iter()
            .map(|b| b.transactions.iter().map(|tx| tx.to_string()).collect())
            .collect()
    }

    /// Parse serialized blocks, collecting every malformed line
    pub fn parse_serialized(
        serialized: &[Vec<String>],
    ) -> Result<Vec<Vec<Transaction>>, BlockchainError> {
        let mut errors = Vec::new();
        let mut parsed = Vec::with_capacity(serialized.len());

        for (block, lines) in serialized.iter().enumerate() {
            let mut txs = Vec::with_capacity(lines.len());
            for (line, text) in lines.iter().enumerate() {
                match text.parse::<Transaction>() {
                    Ok(tx) => txs.push(tx),
                    Err(e) => errors.push(e.at(block, line)),
                }
            }
            parsed.push(txs);
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(BlockchainError::Parse(errors))
        }
    }

    /// Replace this chain with one rebuilt from serialized blocks
    ///
    /// Every block is mined again at the current difficulty; stored hashes
    /// and nonces are not part of the input. With a genesis block configured,
    /// an empty first entry stands for that genesis block. Nothing changes if
    /// any line fails to parse.
    pub fn load_chain(&mut self, serialized: &[Vec<String>]) -> Result<(), BlockchainError> {
        let parsed = Self::parse_serialized(serialized)?;
        let mut rebuilt = Chain::new(self.config.clone())?;

        for (i, transactions) in parsed.into_iter().enumerate() {
            if i == 0 && self.config.include_genesis_block && transactions.is_empty() {
                continue;
            }
            rebuilt.add_block(transactions);
        }

        info!(
            "Loaded chain of {} blocks (re-mined at difficulty {})",
            rebuilt.len(),
            rebuilt.difficulty()
        );
        *self = rebuilt;
        Ok(())
    }

    /// Validate linkage, merkle roots, hashes and proof of work of every block
    pub fn validate(&self) -> Result<(), BlockchainError> {
        let mut expected_previous = GENESIS_PREVIOUS_HASH.to_string();

        for (position, block) in self.blocks.iter().enumerate() {
            if block.index != position as u64 {
                return Err(BlockchainError::IndexMismatch {
                    position,
                    index: block.index,
                });
            }

            if block.previous_hash != expected_previous {
                return Err(BlockchainError::BrokenLink(block.index));
            }

            let unmined_genesis =
                position == 0 && self.config.include_genesis_block && block.transactions.is_empty();
            if !block.is_sealed() && !unmined_genesis {
                return Err(BlockchainError::InvalidBlock {
                    index: block.index,
                    source: BlockError::InvalidProofOfWork,
                });
            }

            block
                .validate(self.config.difficulty)
                .map_err(|source| BlockchainError::InvalidBlock {
                    index: block.index,
                    source,
                })?;

            expected_previous = block.effective_hash();
        }

        Ok(())
    }

    /// Validate the entire chain
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            total_blocks: self.blocks.len() as u64,
            total_transactions: self.blocks.iter().map(|b| b.tx_count() as u64).sum(),
            difficulty: self.config.difficulty,
            latest_hash: self.tip_hash(),
        }
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

/// Chain statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub difficulty: usize,
    pub latest_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_genesis(difficulty: usize) -> ChainConfig {
        ChainConfig {
            difficulty,
            include_genesis_block: false,
            ..ChainConfig::default()
        }
    }

    #[test]
    fn test_new_chain_with_genesis() {
        let chain = Chain::with_difficulty(2).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(!chain.blocks()[0].is_sealed());
        assert!(chain.is_valid());
    }

    #[test]
    fn test_new_chain_without_genesis() {
        let mut chain = Chain::new(no_genesis(1)).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.tip_hash(), GENESIS_PREVIOUS_HASH);

        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        assert_eq!(chain.blocks()[0].previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(chain.blocks()[0].index, 0);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_invalid_difficulty() {
        assert_eq!(
            Chain::with_difficulty(0).unwrap_err(),
            BlockchainError::InvalidDifficulty(0)
        );
        assert!(Chain::with_difficulty(MAX_DIFFICULTY + 1).is_err());
    }

    #[test]
    fn test_single_create_scenario() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        let block = chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);

        assert_eq!(block.index, 1);
        assert!(block.hash.as_deref().unwrap().starts_with('0'));
        assert_eq!(
            block.transactions[0].to_string(),
            "[CREATE] ASSET1 GENESIS -> Alice"
        );
    }

    #[test]
    fn test_chain_linkage() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        for i in 0..3 {
            chain.add_block(vec![Transaction::create(format!("A{}", i), "Alice", "")]);
        }

        let blocks = chain.blocks();
        assert_eq!(blocks.len(), 4);
        // Genesis is unsealed, so its successor links to the recomputed hash
        assert_eq!(blocks[1].previous_hash, blocks[0].calculate_hash());
        for i in 2..blocks.len() {
            assert_eq!(
                blocks[i].previous_hash,
                blocks[i - 1].hash.clone().unwrap()
            );
            assert_eq!(blocks[i].previous_hash, blocks[i - 1].calculate_hash());
        }
        assert!(chain.is_valid());
    }

    #[test]
    fn test_tampering_breaks_validation() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        chain.add_block(vec![Transaction::transfer("ASSET1", "Alice", "Bob", "")]);
        assert!(chain.is_valid());

        chain.blocks_mut()[1].transactions[0].to = "Mallory".to_string();
        assert!(matches!(
            chain.validate(),
            Err(BlockchainError::InvalidBlock { index: 1, .. })
        ));
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        chain.add_block(vec![Transaction::create("ASSET2", "Bob", "")]);

        chain.blocks_mut()[2].previous_hash = "f".repeat(64);
        assert_eq!(chain.validate(), Err(BlockchainError::BrokenLink(2)));
    }

    #[test]
    fn test_export_and_load_round_trip() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        chain.add_block(vec![
            Transaction::transfer("ASSET1", "Alice", "Bob", "truck 9"),
            Transaction::create("ASSET2", "Carol", ""),
        ]);
        let exported = chain.export_transactions();

        let mut loaded = Chain::with_difficulty(1).unwrap();
        loaded.load_chain(&exported).unwrap();

        assert_eq!(loaded.len(), chain.len());
        assert_eq!(loaded.export_transactions(), exported);
        for block in loaded.blocks().iter().skip(1) {
            assert!(block.hash.as_deref().unwrap().starts_with('0'));
        }
        assert!(loaded.is_valid());
    }

    #[test]
    fn test_load_without_genesis() {
        let mut chain = Chain::new(no_genesis(1)).unwrap();
        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        chain.add_block(vec![]);
        let exported = chain.export_transactions();

        let mut loaded = Chain::new(no_genesis(1)).unwrap();
        loaded.load_chain(&exported).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.is_valid());
    }

    #[test]
    fn test_load_reports_every_bad_line() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        chain.add_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        let before = chain.export_transactions();

        let serialized = vec![
            vec![],
            vec!["[CREATE] A GENESIS -> B".to_string(), "garbage".to_string()],
            vec!["[TRANSFER] A B C".to_string()],
        ];
        let err = chain.load_chain(&serialized).unwrap_err();

        match err {
            BlockchainError::Parse(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!((errors[0].block, errors[0].line), (1, 1));
                assert_eq!(errors[0].content, "garbage");
                assert_eq!((errors[1].block, errors[1].line), (2, 0));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(chain.export_transactions(), before);
    }

    #[test]
    fn test_add_block_cancellable() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        let block = chain
            .add_block_cancellable(vec![], &CancelToken::new())
            .unwrap();
        assert!(block.is_sealed());

        let token = CancelToken::new();
        token.cancel();
        let err = chain.add_block_cancellable(vec![], &token).unwrap_err();
        assert_eq!(err, BlockchainError::MiningCancelled(0));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_append_mined_rejects_stale_tip() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        let mut stale = chain.next_block(vec![Transaction::create("ASSET1", "Alice", "")]);
        stale.mine(&chain.pow());

        chain.add_block(vec![Transaction::create("ASSET2", "Bob", "")]);
        assert!(matches!(
            chain.append_mined(stale),
            Err(BlockchainError::StaleTip { .. })
        ));

        let mut fresh = chain.next_block(vec![]);
        fresh.mine(&chain.pow());
        assert!(chain.append_mined(fresh).is_ok());

        let unsealed = chain.next_block(vec![]);
        assert!(matches!(
            chain.append_mined(unsealed),
            Err(BlockchainError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let mut chain = Chain::with_difficulty(1).unwrap();
        chain.add_block(vec![
            Transaction::create("ASSET1", "Alice", ""),
            Transaction::create("ASSET2", "Bob", ""),
        ]);
        let stats = chain.stats();
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.latest_hash, chain.blocks()[1].hash.clone().unwrap());
    }
}
