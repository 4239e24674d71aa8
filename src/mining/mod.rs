//! Mining module: proof-of-work search and the shared-chain mining worker

pub mod miner;
pub mod pow;

pub use miner::{Miner, MiningError, MiningStats, SharedChain};
pub use pow::{CancelToken, MineOutcome, ProofOfWork, CANCEL_CHECK_INTERVAL, MAX_DIFFICULTY};
