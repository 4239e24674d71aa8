//! ECDSA signing for ledger transactions
//!
//! Keys travel as PEM text and are parsed on every call; nothing is cached.
//! Signatures are ECDSA over secp256k1 with SHA-256 as the message digest,
//! stored as the 64-byte fixed-width encoding.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use thiserror::Error;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Signing error: {0}")]
    SigningError(String),
}

/// A freshly generated signing key with PEM export helpers
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair([REDACTED])")
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Load a key pair from a private key PEM block
    pub fn from_private_key_pem(pem: &str) -> Result<Self, KeyError> {
        Ok(Self {
            signing_key: parse_private_key(pem)?,
        })
    }

    /// Private key as a PKCS#8 PEM block
    pub fn private_key_pem(&self) -> Result<String, KeyError> {
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::SigningError(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }

    /// Public key as an SPKI PEM block
    pub fn public_key_pem(&self) -> Result<String, KeyError> {
        self.signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::SigningError(e.to_string()))
    }

    /// Public key as a compressed SEC1 hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_sec1_bytes())
    }
}

/// Sign a message with a PEM-encoded private key
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and SEC1 (`BEGIN EC PRIVATE KEY`) blocks.
pub fn sign_message(message: &[u8], private_key_pem: &str) -> Result<Vec<u8>, KeyError> {
    let signing_key = parse_private_key(private_key_pem)?;
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| KeyError::SigningError(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify a signature against a PEM-encoded public key
///
/// Only an unparseable key is an error. A malformed signature, a signature
/// from another key or a modified message all report `Ok(false)`.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key_pem: &str,
) -> Result<bool, KeyError> {
    let verifying_key = VerifyingKey::from_public_key_pem(public_key_pem)
        .map_err(|e| KeyError::InvalidKey(format!("public key: {}", e)))?;

    let sig = match Signature::from_slice(signature) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };

    Ok(verifying_key.verify(message, &sig).is_ok())
}

fn parse_private_key(pem: &str) -> Result<SigningKey, KeyError> {
    if let Ok(key) = SigningKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    k256::SecretKey::from_sec1_pem(pem)
        .map(SigningKey::from)
        .map_err(|e| KeyError::InvalidKey(format!("private key: {}", e)))
}
