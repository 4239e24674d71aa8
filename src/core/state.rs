//! Asset ownership state
//!
//! Projection of the chain onto "asset id -> current owner". It is derived
//! data: it can always be rebuilt by replaying every block in order.

use crate::core::blockchain::Chain;
use crate::core::transaction::Transaction;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Ownership rule violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Asset already exists: {0}")]
    AssetExists(String),
    #[error("Asset not found: {0}")]
    UnknownAsset(String),
    #[error("Asset {asset} is owned by {owner}, not {claimed}")]
    NotOwner {
        asset: String,
        owner: String,
        claimed: String,
    },
}

/// Current owner of every known asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorldState {
    owners: BTreeMap<String, String>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a chain; later events overwrite earlier ones
    pub fn from_chain(chain: &Chain) -> Self {
        let mut state = Self::new();
        state.rebuild(chain);
        state
    }

    /// Rebuild the state from scratch
    pub fn rebuild(&mut self, chain: &Chain) {
        self.owners.clear();
        for block in chain.blocks() {
            for tx in &block.transactions {
                self.apply_unchecked(tx);
            }
        }
    }

    /// Check a transaction against the ownership rules
    pub fn check(&self, tx: &Transaction) -> Result<(), StateError> {
        if tx.is_create() {
            if self.owners.contains_key(&tx.asset_id) {
                return Err(StateError::AssetExists(tx.asset_id.clone()));
            }
            return Ok(());
        }

        let owner = self
            .owners
            .get(&tx.asset_id)
            .ok_or_else(|| StateError::UnknownAsset(tx.asset_id.clone()))?;
        if *owner != tx.from {
            return Err(StateError::NotOwner {
                asset: tx.asset_id.clone(),
                owner: owner.clone(),
                claimed: tx.from.clone(),
            });
        }
        Ok(())
    }

    /// Check and apply a transaction
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), StateError> {
        self.check(tx)?;
        self.apply_unchecked(tx);
        Ok(())
    }

    /// Apply a transaction without checking it
    pub fn apply_unchecked(&mut self, tx: &Transaction) {
        self.owners.insert(tx.asset_id.clone(), tx.to.clone());
    }

    pub fn owner_of(&self, asset_id: &str) -> Option<&str> {
        self.owners.get(asset_id).map(String::as_str)
    }

    /// All assets with their owners, sorted by asset id
    pub fn assets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.owners.iter().map(|(a, o)| (a.as_str(), o.as_str()))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
