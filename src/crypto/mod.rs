//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hex digests
//! - ECDSA signing and verification with PEM keys (secp256k1)
//! - Merkle root calculation

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{is_hex_digest, meets_difficulty, sha256, sha256_hex};
pub use keys::{sign_message, verify_signature, KeyError, KeyPair};
pub use merkle::calculate_merkle_root;
