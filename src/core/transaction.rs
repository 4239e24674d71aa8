//! Asset transactions
//!
//! A transaction records either the creation of an asset or its transfer
//! between two parties. Two encodings exist:
//! - the canonical, length-prefixed byte encoding used for signing and for
//!   the proof digest
//! - the human-readable line form `"[EVENT] asset from -> to | meta"` used to
//!   export and reload a chain

use crate::crypto::{sha256_hex, sign_message, verify_signature, KeyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Origin party recorded on every `CREATE` transaction
pub const GENESIS_PARTY: &str = "GENESIS";

const META_SEPARATOR: &str = " | ";
const ARROW: &str = " -> ";

// =============================================================================
// Error Types
// =============================================================================

/// What went wrong while parsing a transaction line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected '[' at start of line")]
    MissingOpenBracket,
    #[error("missing ']' after event tag")]
    MissingCloseBracket,
    #[error("unknown event tag '{0}'")]
    UnknownEvent(String),
    #[error("missing asset id")]
    MissingAsset,
    #[error("missing '->' between parties")]
    MissingArrow,
    #[error("missing party")]
    MissingParty,
    #[error("CREATE must originate from GENESIS, found '{0}'")]
    InvalidCreateOrigin(String),
    #[error("{0}")]
    InvalidField(TransactionError),
}

/// A field value the line form cannot carry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{field} {value:?} cannot be written as a transaction line")]
    Unrepresentable { field: &'static str, value: String },
}

/// A malformed serialized transaction line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("block {block}, line {line}, column {column}: {kind} in {content:?}")]
pub struct ParseError {
    /// Index of the serialized block the line belongs to
    pub block: usize,
    /// Index of the line inside its block
    pub line: usize,
    /// Byte offset inside the line where parsing stopped
    pub column: usize,
    /// The offending line
    pub content: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn new(content: &str, column: usize, kind: ParseErrorKind) -> Self {
        Self {
            block: 0,
            line: 0,
            column,
            content: content.to_string(),
            kind,
        }
    }

    /// Attach the position of the line inside a serialized chain
    pub fn at(mut self, block: usize, line: usize) -> Self {
        self.block = block;
        self.line = line;
        self
    }
}

// =============================================================================
// Event Kind
// =============================================================================

/// Kind of ledger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Transfer,
}

impl EventKind {
    /// Tag used in both encodings
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Create => "CREATE",
            EventKind::Transfer => "TRANSFER",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CREATE" => Some(EventKind::Create),
            "TRANSFER" => Some(EventKind::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A single asset event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub event: EventKind,
    pub asset_id: String,
    /// Origin party, always [`GENESIS_PARTY`] for `CREATE`
    pub from: String,
    pub to: String,
    /// Free-form metadata, empty when absent
    #[serde(default)]
    pub meta: String,
    /// ECDSA signature over [`Transaction::canonical_bytes`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    /// Proof digest, assigned when the transaction is sealed into a block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
}

impl Transaction {
    /// Record the creation of an asset owned by `owner`
    pub fn create(
        asset_id: impl Into<String>,
        owner: impl Into<String>,
        meta: impl Into<String>,
    ) -> Self {
        Self {
            event: EventKind::Create,
            asset_id: asset_id.into(),
            from: GENESIS_PARTY.to_string(),
            to: owner.into(),
            meta: meta.into(),
            signature: None,
            proof: None,
        }
    }

    /// Record the transfer of an asset between two parties
    pub fn transfer(
        asset_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        meta: impl Into<String>,
    ) -> Self {
        Self {
            event: EventKind::Transfer,
            asset_id: asset_id.into(),
            from: from.into(),
            to: to.into(),
            meta: meta.into(),
            signature: None,
            proof: None,
        }
    }

    pub fn is_create(&self) -> bool {
        self.event == EventKind::Create
    }

    /// Check that every field survives the line form unchanged
    ///
    /// The asset id may not contain whitespace; parties may not contain `|`,
    /// `->` or control characters; meta may not contain control characters.
    pub fn check_fields(&self) -> Result<(), TransactionError> {
        let unrepresentable = |field: &'static str, value: &str| TransactionError::Unrepresentable {
            field,
            value: value.to_string(),
        };

        if self.asset_id.is_empty() {
            return Err(TransactionError::EmptyField("asset"));
        }
        if self.asset_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(unrepresentable("asset", &self.asset_id));
        }

        for (field, value) in [("from", &self.from), ("to", &self.to)] {
            if value.is_empty() {
                return Err(TransactionError::EmptyField(field));
            }
            if value.contains('|') || value.contains("->") || value.chars().any(char::is_control) {
                return Err(unrepresentable(field, value));
            }
        }

        if self.meta.chars().any(char::is_control) {
            return Err(unrepresentable("meta", &self.meta));
        }
        Ok(())
    }

    /// Canonical encoding: every field as a 4-byte big-endian length followed
    /// by its UTF-8 bytes, in the order tag, asset, from, to, meta.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let fields = [
            self.event.tag(),
            self.asset_id.as_str(),
            self.from.as_str(),
            self.to.as_str(),
            self.meta.as_str(),
        ];

        let capacity = fields.iter().map(|f| f.len() + 4).sum();
        let mut out = Vec::with_capacity(capacity);
        for field in fields {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field.as_bytes());
        }
        out
    }

    /// Digest of the canonical encoding
    pub fn calculate_proof(&self) -> String {
        sha256_hex(&self.canonical_bytes())
    }

    /// Sign the canonical encoding with a PEM private key
    pub fn sign(&mut self, private_key_pem: &str) -> Result<(), KeyError> {
        let signature = sign_message(&self.canonical_bytes(), private_key_pem)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Verify the attached signature with a PEM public key
    ///
    /// An unsigned transaction verifies as `false`.
    pub fn verify(&self, public_key_pem: &str) -> Result<bool, KeyError> {
        match &self.signature {
            Some(signature) => verify_signature(&self.canonical_bytes(), signature, public_key_pem),
            None => {
                // Key problems still surface as errors
                verify_signature(&self.canonical_bytes(), &[], public_key_pem)
            }
        }
    }

    /// Hex form of the signature, if any
    pub fn signature_hex(&self) -> Option<String> {
        self.signature.as_ref().map(hex::encode)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}{}{}",
            self.event, self.asset_id, self.from, ARROW, self.to
        )?;
        if !self.meta.is_empty() {
            write!(f, "{}{}", META_SEPARATOR, self.meta)?;
        }
        Ok(())
    }
}

impl FromStr for Transaction {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fail = |column: usize, kind: ParseErrorKind| ParseError::new(line, column, kind);

        if !line.starts_with('[') {
            return Err(fail(0, ParseErrorKind::MissingOpenBracket));
        }
        let close = line
            .find(']')
            .ok_or_else(|| fail(line.len(), ParseErrorKind::MissingCloseBracket))?;

        let tag = &line[1..close];
        let event = EventKind::from_tag(tag)
            .ok_or_else(|| fail(1, ParseErrorKind::UnknownEvent(tag.to_string())))?;

        let body_start = close + 2;
        let rest = line[close + 1..]
            .strip_prefix(' ')
            .ok_or_else(|| fail(close + 1, ParseErrorKind::MissingAsset))?;

        let (body, meta) = match rest.find(META_SEPARATOR) {
            Some(idx) => (&rest[..idx], &rest[idx + META_SEPARATOR.len()..]),
            None => (rest, ""),
        };

        let arrow = body
            .find(ARROW)
            .ok_or_else(|| fail(body_start + body.len(), ParseErrorKind::MissingArrow))?;
        let head = &body[..arrow];
        let to = &body[arrow + ARROW.len()..];

        let (asset_id, from) = head
            .split_once(' ')
            .ok_or_else(|| fail(body_start, ParseErrorKind::MissingParty))?;
        if asset_id.is_empty() {
            return Err(fail(body_start, ParseErrorKind::MissingAsset));
        }
        if from.is_empty() {
            return Err(fail(body_start + asset_id.len() + 1, ParseErrorKind::MissingParty));
        }
        if to.is_empty() {
            return Err(fail(body_start + arrow + ARROW.len(), ParseErrorKind::MissingParty));
        }

        let tx = match event {
            EventKind::Create => {
                if from != GENESIS_PARTY {
                    return Err(fail(
                        body_start + asset_id.len() + 1,
                        ParseErrorKind::InvalidCreateOrigin(from.to_string()),
                    ));
                }
                Transaction::create(asset_id, to, meta)
            }
            EventKind::Transfer => Transaction::transfer(asset_id, from, to, meta),
        };

        tx.check_fields()
            .map_err(|e| fail(body_start, ParseErrorKind::InvalidField(e)))?;
        Ok(tx)
    }
}
