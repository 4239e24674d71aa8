//! CLI commands for the asset ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::config::LedgerConfig;
use crate::core::{AssetLedger, BlockView, Chain};
use crate::crypto::KeyPair;
use crate::mining::{Miner, SharedChain};
use crate::network::{GossipNetwork, NodeId, PropagationReport};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Walk through a small supply-chain scenario and gossip its last event
pub fn cmd_demo(config: &LedgerConfig, json: bool) -> CliResult<()> {
    let mut ledger = AssetLedger::new(config.chain.clone())?;

    ledger.create_asset("ASSET1", "Alice", "pallet of coffee")?;
    ledger.transfer_asset("ASSET1", "Alice", "Bob", "shipped")?;
    let last = ledger.transfer_asset("ASSET1", "Bob", "Carol", "delivered")?;
    let proof = last.transactions[0].proof.clone().unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&ledger.chain().views())?);
    } else {
        print_blocks(&ledger.chain().views());
        println!("\n📦 Owners:");
        for (asset, owner) in ledger.state().assets() {
            println!("   {} -> {}", asset, owner);
        }
    }

    let mut network = GossipNetwork::new(config.gossip.clone());
    let a = network.add_node();
    let b = network.add_node();
    let c = network.add_node();
    network.add_peer(a, b)?;
    network.add_peer(a, c)?;

    let report = network.receive(a, &proof)?;
    if !json {
        println!("\n📡 Gossip of {}...", short(&proof));
        print_report(&report);
    }

    Ok(())
}

/// Generate a key pair, printing it or writing PEM files to a directory
pub fn cmd_keygen(out_dir: Option<&Path>) -> CliResult<()> {
    let keys = KeyPair::generate();
    let private_pem = keys.private_key_pem()?;
    let public_pem = keys.public_key_pem()?;

    match out_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            fs::write(dir.join("private.pem"), &private_pem)?;
            fs::write(dir.join("public.pem"), &public_pem)?;
            println!("🔐 Key pair written to {:?}", dir);
            println!("   🔑 Public key: {}...", short(&keys.public_key_hex()));
            println!("\n   ⚠️  Keep private.pem secret!");
        }
        None => {
            print!("{}", public_pem);
            print!("{}", private_pem);
        }
    }

    Ok(())
}

/// Mine one block holding the given transaction lines
pub fn cmd_mine(
    config: &LedgerConfig,
    lines: &[String],
    key: Option<&Path>,
    json: bool,
) -> CliResult<()> {
    let serialized = vec![lines.to_vec()];
    let mut transactions = Chain::parse_serialized(&serialized)?
        .into_iter()
        .next()
        .unwrap_or_default();

    if let Some(path) = key {
        let pem = fs::read_to_string(path)?;
        for tx in &mut transactions {
            tx.sign(&pem)?;
        }
    }

    let signatures: Vec<Option<String>> =
        transactions.iter().map(|tx| tx.signature_hex()).collect();

    let chain: SharedChain = Arc::new(RwLock::new(Chain::new(config.chain.clone())?));
    let miner = Miner::new(config.mining_timeout());

    if !json {
        println!(
            "⛏️  Mining {} transaction(s) at difficulty {}",
            transactions.len(),
            config.chain.difficulty
        );
    }

    let rt = tokio::runtime::Runtime::new()?;
    let (view, stats) = rt.block_on(miner.mine_block(&chain, transactions))?;

    if json {
        let output = serde_json::json!({ "block": view, "signatures": signatures });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("\n   Block {} mined!", view.index);
        println!("   ├─ Hash: {}", view.hash);
        println!("   ├─ Nonce: {}", view.nonce);
        println!("   ├─ Transactions: {}", view.transactions.len());
        println!("   ├─ Time: {}ms", stats.time_ms);
        println!("   ├─ Attempts: {}", stats.hash_attempts);
        println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);
        for (line, signature) in view.transactions.iter().zip(&signatures) {
            if let Some(signature) = signature {
                println!("      {} signed {}...", line, short(signature));
            }
        }
    }

    Ok(())
}

/// Rebuild a chain from an exported JSON file and validate it
pub fn cmd_replay(config: &LedgerConfig, path: &Path, json: bool) -> CliResult<()> {
    let contents = fs::read_to_string(path)?;
    let serialized: Vec<Vec<String>> = serde_json::from_str(&contents)?;

    let mut ledger = AssetLedger::new(config.chain.clone())?;
    ledger.load(&serialized)?;
    ledger.chain().validate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ledger.chain().views())?);
        return Ok(());
    }

    let stats = ledger.chain().stats();
    println!("📥 Replayed {:?}", path);
    println!("   ├─ Total blocks: {}", stats.total_blocks);
    println!("   ├─ Total transactions: {}", stats.total_transactions);
    println!("   ├─ Difficulty: {}", stats.difficulty);
    println!("   └─ Latest hash: {}", stats.latest_hash);

    if !ledger.state().is_empty() {
        println!("\n📦 Owners:");
        for (asset, owner) in ledger.state().assets() {
            println!("   {} -> {}", asset, owner);
        }
    }

    Ok(())
}

/// Flood transaction ids around a ring of simulated nodes
pub fn cmd_gossip(
    config: &LedgerConfig,
    nodes: usize,
    tx_ids: &[String],
    offline: &[usize],
) -> CliResult<()> {
    let mut network = GossipNetwork::new(config.gossip.clone());
    let ids: Vec<NodeId> = (0..nodes.max(1)).map(|_| network.add_node()).collect();
    if ids.len() > 1 {
        for i in 0..ids.len() {
            network.connect(ids[i], ids[(i + 1) % ids.len()])?;
        }
    }
    for &index in offline {
        network.set_online(NodeId(index), false)?;
    }

    println!("🌐 Ring of {} node(s), {} offline", ids.len(), offline.len());
    for tx_id in tx_ids {
        let report = network.receive(ids[0], tx_id)?;
        println!("\n📡 {}", tx_id);
        print_report(&report);
    }

    Ok(())
}

fn print_blocks(views: &[BlockView]) {
    println!("🧱 Blocks:");
    for view in views {
        println!(
            "   #{} {} (nonce {}, {} tx)",
            view.index,
            short(&view.hash),
            view.nonce,
            view.transactions.len()
        );
        for line in &view.transactions {
            println!("      {}", line);
        }
    }
}

fn print_report(report: &PropagationReport) {
    println!("   ├─ Accepted by: {}", report.accepted.len());
    println!("   ├─ Already seen: {}", report.already_seen.len());
    println!("   ├─ Messages: {}", report.messages);
    println!("   └─ Failures: {}", report.failures.len());
    for failure in &report.failures {
        println!("      {} -> {}: {}", failure.from, failure.to, failure.error);
    }
}

fn short(value: &str) -> &str {
    value.get(..16).unwrap_or(value)
}
