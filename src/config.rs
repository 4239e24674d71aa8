//! Ledger configuration
//!
//! Read from a JSON file; every field is optional and falls back to its
//! default. Command-line flags are applied on top by the binary.

use crate::core::{BlockchainError, ChainConfig};
use crate::network::GossipConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] BlockchainError),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub chain: ChainConfig,
    pub gossip: GossipConfig,
    /// Give up on a single block after this many seconds
    pub mining_timeout_secs: Option<u64>,
}

impl LedgerConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        Ok(())
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = write_config(r#"{ "chain": { "difficulty": 2 } }"#);
        let config = LedgerConfig::load(file.path()).unwrap();

        assert_eq!(config.chain.difficulty, 2);
        assert!(config.chain.include_genesis_block);
        assert_eq!(config.gossip, GossipConfig::default());
        assert_eq!(config.mining_timeout(), None);
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"{
                "chain": { "difficulty": 4, "include_genesis_block": false },
                "gossip": { "bloom_size": 1024, "bloom_hash_count": 3 },
                "mining_timeout_secs": 10
            }"#,
        );
        let config = LedgerConfig::load(file.path()).unwrap();

        assert!(!config.chain.include_genesis_block);
        assert_eq!(config.gossip.bloom_size, 1024);
        assert_eq!(config.mining_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_invalid_difficulty_rejected() {
        let file = write_config(r#"{ "chain": { "difficulty": 0 } }"#);
        assert!(matches!(
            LedgerConfig::load(file.path()),
            Err(ConfigError::Invalid(BlockchainError::InvalidDifficulty(0)))
        ));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LedgerConfig::load(&dir.path().join("absent.json")),
            Err(ConfigError::Io(_))
        ));

        let file = write_config("{ not json");
        assert!(matches!(
            LedgerConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
