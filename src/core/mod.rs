//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (CREATE / TRANSFER asset events with proofs and signatures)
//! - Blocks (Merkle commitment and proof of work)
//! - Chain (append, export, reload and validation)
//! - World state (current owner of every asset)
//! - Asset ledger (chain and state kept in step)

pub mod block;
pub mod blockchain;
pub mod ledger;
pub mod state;
pub mod transaction;

pub use block::{Block, BlockError, BlockView, BLOCK_VERSION, GENESIS_PREVIOUS_HASH};
pub use blockchain::{BlockchainError, Chain, ChainConfig, ChainStats, DEFAULT_DIFFICULTY};
pub use ledger::{AssetLedger, LedgerError};
pub use state::{StateError, WorldState};
pub use transaction::{
    EventKind, ParseError, ParseErrorKind, Transaction, TransactionError, GENESIS_PARTY,
};
