//! Asset-Ledger: a proof-of-work asset ledger with bloom-filtered gossip
//!
//! This crate provides:
//! - CREATE / TRANSFER asset events with SHA-256 proofs and ECDSA signatures
//! - Merkle commitments over each block's events
//! - Proof of work over hex digests with cancellable mining
//! - Chain export and reload (every block is mined again)
//! - Ownership state derived from the chain
//! - In-process gossip of transaction ids with per-node bloom filters
//!
//! # Example
//!
//! ```rust
//! use asset_ledger::core::{AssetLedger, ChainConfig};
//! use asset_ledger::network::{GossipConfig, GossipNetwork};
//!
//! // Create a ledger with an easy difficulty
//! let config = ChainConfig { difficulty: 1, ..ChainConfig::default() };
//! let mut ledger = AssetLedger::new(config).unwrap();
//!
//! // Record an asset and hand it over
//! ledger.create_asset("ASSET1", "Alice", "").unwrap();
//! let block = ledger.transfer_asset("ASSET1", "Alice", "Bob", "").unwrap();
//! let proof = block.transactions[0].proof.clone().unwrap();
//! assert_eq!(ledger.owner_of("ASSET1"), Some("Bob"));
//!
//! // Gossip the transfer between two nodes
//! let mut network = GossipNetwork::new(GossipConfig::default());
//! let a = network.add_node();
//! let b = network.add_node();
//! network.add_peer(a, b).unwrap();
//! network.receive(a, &proof).unwrap();
//! assert!(network.has_seen(b, &proof));
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, LedgerConfig};
pub use core::{AssetLedger, Block, Chain, ChainConfig, Transaction, WorldState, DEFAULT_DIFFICULTY};
pub use crypto::KeyPair;
pub use mining::{Miner, ProofOfWork};
pub use network::{BloomFilter, GossipNetwork, NodeId};
