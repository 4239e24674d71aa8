//! Cryptographic hashing utilities for the ledger
//!
//! Every digest in the ledger (transaction proofs, merkle nodes, block hashes)
//! is a lowercase hex SHA-256 string.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded digest
const DIGEST_HEX_LEN: usize = 64;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex digest meets the difficulty target
/// The digest must start with `difficulty` ASCII '0' characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Returns true if the string looks like a hex digest produced by [`sha256_hex`]
pub fn is_hex_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
