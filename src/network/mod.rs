//! Gossip networking module
//!
//! Simulated, in-process peer graph that floods transaction ids and uses a
//! per-node bloom filter to stop re-propagation.
//!
//! # Features
//! - Bloom filter with configurable size and probe count
//! - Node registry with directed or bidirectional peer links
//! - Breadth-first flooding with isolated per-peer failures

pub mod bloom;
pub mod gossip;

pub use bloom::{BloomFilter, DEFAULT_BLOOM_SIZE, DEFAULT_HASH_COUNT, MAX_BLOOM_SIZE};
pub use gossip::{
    DeliveryFailure, GossipConfig, GossipError, GossipNetwork, GossipNode, NodeId,
    PropagationReport,
};
