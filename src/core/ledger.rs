//! Asset ledger: a chain plus its ownership state
//!
//! Locally submitted events are checked against the current owners before
//! they are mined; events relayed by peers are appended as received and the
//! state is rebuilt afterwards.

use crate::core::block::Block;
use crate::core::blockchain::{BlockchainError, Chain, ChainConfig};
use crate::core::state::{StateError, WorldState};
use crate::core::transaction::{Transaction, TransactionError};
use log::info;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Rejected: {0}")]
    State(#[from] StateError),
    #[error("Chain error: {0}")]
    Chain(#[from] BlockchainError),
    #[error("Invalid transaction: {0}")]
    Transaction(#[from] TransactionError),
}

/// Chain and ownership state kept in step
#[derive(Debug, Clone)]
pub struct AssetLedger {
    chain: Chain,
    state: WorldState,
}

impl AssetLedger {
    pub fn new(config: ChainConfig) -> Result<Self, LedgerError> {
        Ok(Self::from_chain(Chain::new(config)?))
    }

    /// Wrap an existing chain, deriving its state
    pub fn from_chain(chain: Chain) -> Self {
        let state = WorldState::from_chain(&chain);
        Self { chain, state }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn owner_of(&self, asset_id: &str) -> Option<&str> {
        self.state.owner_of(asset_id)
    }

    /// Create an asset in its own block
    pub fn create_asset(
        &mut self,
        asset_id: &str,
        owner: &str,
        meta: &str,
    ) -> Result<&Block, LedgerError> {
        self.submit(Transaction::create(asset_id, owner, meta))
    }

    /// Transfer an asset in its own block; `from` must be the current owner
    pub fn transfer_asset(
        &mut self,
        asset_id: &str,
        from: &str,
        to: &str,
        meta: &str,
    ) -> Result<&Block, LedgerError> {
        self.submit(Transaction::transfer(asset_id, from, to, meta))
    }

    /// Check a transaction against the state, then mine it in its own block
    pub fn submit(&mut self, tx: Transaction) -> Result<&Block, LedgerError> {
        tx.check_fields()?;
        self.state.apply(&tx)?;
        info!("Accepted {}", tx);
        Ok(self.chain.add_block(vec![tx]))
    }

    /// Append a transaction relayed by a peer without ownership checks
    pub fn accept_from_peer(&mut self, tx: Transaction) -> Result<&Block, LedgerError> {
        tx.check_fields()?;
        let index = self.chain.add_block(vec![tx]).index;
        self.state.rebuild(&self.chain);
        Ok(&self.chain.blocks()[index as usize])
    }

    /// Replace the chain from serialized blocks and rebuild the state
    pub fn load(&mut self, serialized: &[Vec<String>]) -> Result<(), LedgerError> {
        self.chain.load_chain(serialized)?;
        self.state.rebuild(&self.chain);
        Ok(())
    }
}
