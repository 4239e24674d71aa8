//! In-process gossip of transaction ids
//!
//! Nodes live in a [`GossipNetwork`] registry and refer to their peers by
//! [`NodeId`]. A node that receives an id it has not seen marks it in its
//! bloom filter and then forwards it to every peer; a node that has seen it
//! does nothing. Propagation runs as a breadth-first work queue with a
//! per-delivery visited set, so cyclic peer graphs cannot recurse.

use crate::network::bloom::{BloomFilter, DEFAULT_BLOOM_SIZE, DEFAULT_HASH_COUNT};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

/// Gossip errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GossipError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} is offline")]
    NodeOffline(NodeId),
    #[error("Node {0} cannot peer with itself")]
    SelfPeer(NodeId),
}

/// Per-node filter parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Bloom filter size in bits
    pub bloom_size: usize,
    /// Bloom filter probes per item
    pub bloom_hash_count: u32,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            bloom_size: DEFAULT_BLOOM_SIZE,
            bloom_hash_count: DEFAULT_HASH_COUNT,
        }
    }
}

/// Handle of a node inside a [`GossipNetwork`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// A gossip participant
#[derive(Debug, Clone)]
pub struct GossipNode {
    pub id: NodeId,
    filter: BloomFilter,
    /// Outgoing peers, in attachment order
    peers: Vec<NodeId>,
    online: bool,
}

impl GossipNode {
    fn new(id: NodeId, filter: BloomFilter) -> Self {
        Self {
            id,
            filter,
            peers: Vec::new(),
            online: true,
        }
    }

    pub fn peers(&self) -> &[NodeId] {
        &self.peers
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Check if this node has (probably) seen a transaction id
    pub fn has_seen(&self, tx_id: &str) -> bool {
        self.filter.check(tx_id)
    }
}

/// A delivery that could not be made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Node that tried to forward
    pub from: NodeId,
    /// Intended recipient
    pub to: NodeId,
    pub error: GossipError,
}

/// Outcome of one `receive` call across the whole network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Nodes that saw the id for the first time, in delivery order
    pub accepted: Vec<NodeId>,
    /// Nodes whose filter already contained the id
    pub already_seen: Vec<NodeId>,
    /// Forwarding attempts that failed; siblings were still delivered
    pub failures: Vec<DeliveryFailure>,
    /// Forwarded messages, including those dropped by the visited set
    pub messages: usize,
}

impl PropagationReport {
    /// True if the id reached somebody new
    pub fn propagated(&self) -> bool {
        !self.accepted.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of gossip nodes and their peer links
#[derive(Debug, Clone, Default)]
pub struct GossipNetwork {
    nodes: Vec<GossipNode>,
    config: GossipConfig,
}

impl GossipNetwork {
    pub fn new(config: GossipConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
        }
    }

    /// Add a node with a filter built from the network config
    pub fn add_node(&mut self) -> NodeId {
        let filter = BloomFilter::new(self.config.bloom_size, self.config.bloom_hash_count);
        self.add_node_with_filter(filter)
    }

    /// Add a node that uses the given filter
    pub fn add_node_with_filter(&mut self, filter: BloomFilter) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GossipNode::new(id, filter));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&GossipNode> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut GossipNode, GossipError> {
        self.nodes.get_mut(id.0).ok_or(GossipError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Make `peer` a forwarding target of `node` (one direction only)
    ///
    /// `peer` does not have to exist yet; forwarding to a missing node is
    /// reported as a delivery failure.
    pub fn add_peer(&mut self, node: NodeId, peer: NodeId) -> Result<(), GossipError> {
        if node == peer {
            return Err(GossipError::SelfPeer(node));
        }
        let entry = self.node_mut(node)?;
        if !entry.peers.contains(&peer) {
            entry.peers.push(peer);
        }
        Ok(())
    }

    /// Link two nodes in both directions
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<(), GossipError> {
        if self.node(b).is_none() {
            return Err(GossipError::UnknownNode(b));
        }
        self.add_peer(a, b)?;
        self.add_peer(b, a)
    }

    /// Take a node off the network or bring it back
    pub fn set_online(&mut self, id: NodeId, online: bool) -> Result<(), GossipError> {
        self.node_mut(id)?.online = online;
        Ok(())
    }

    /// Check if a node has (probably) seen a transaction id
    pub fn has_seen(&self, id: NodeId, tx_id: &str) -> bool {
        self.node(id).map(|n| n.has_seen(tx_id)).unwrap_or(false)
    }

    /// Deliver a transaction id to `entry` and flood it through the graph
    pub fn receive(&mut self, entry: NodeId, tx_id: &str) -> Result<PropagationReport, GossipError> {
        let first = self.node(entry).ok_or(GossipError::UnknownNode(entry))?;
        if !first.online {
            return Err(GossipError::NodeOffline(entry));
        }

        let mut report = PropagationReport::default();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(entry);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }

            let node = &mut self.nodes[current.0];
            if node.filter.check(tx_id) {
                debug!("{} already saw {}", current, tx_id);
                report.already_seen.push(current);
                continue;
            }

            // Mark before forwarding so a cycle back here is a no-op
            node.filter.add(tx_id);
            report.accepted.push(current);
            let peers = node.peers.clone();
            debug!("{} accepted {}, forwarding to {} peer(s)", current, tx_id, peers.len());

            for peer in peers {
                report.messages += 1;
                match self.nodes.get(peer.0) {
                    None => {
                        warn!("{} could not forward {} to {}: unknown node", current, tx_id, peer);
                        report.failures.push(DeliveryFailure {
                            from: current,
                            to: peer,
                            error: GossipError::UnknownNode(peer),
                        });
                    }
                    Some(target) if !target.online => {
                        warn!("{} could not forward {} to {}: offline", current, tx_id, peer);
                        report.failures.push(DeliveryFailure {
                            from: current,
                            to: peer,
                            error: GossipError::NodeOffline(peer),
                        });
                    }
                    Some(_) => queue.push_back(peer),
                }
            }
        }

        Ok(report)
    }
}
