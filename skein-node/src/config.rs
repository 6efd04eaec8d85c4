use serde::{Deserialize, Serialize};
use std::path::Path;

use skein_crypto::hash::blake3_hash;
use skein_engine::tokenomics::from_compact_fee_base;
use skein_types::config::ProtocolConfig;
use skein_types::constants::ONE_TOKEN;
use skein_types::primitives::*;

use crate::error::NodeError;

/// File name written by [`NodeConfig::init`].
pub const CONFIG_FILE_NAME: &str = "skein.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Canonical hash at height 0.
    #[serde(with = "skein_types::primitives::serde_hash_hex")]
    pub genesis_hash: Hash,
    /// Host timestamp of the bootstrap call.
    pub timestamp: Timestamp,
    /// Initial fee base in compact units.
    pub initial_fee_base_compact: u64,
    /// Accounts funded on the token ledger at genesis. The first one proposes
    /// in simulations.
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Hex-encoded 20-byte address.
    pub address: String,
    /// Whole tokens.
    pub tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_hash: blake3_hash(b"skein-genesis"),
            timestamp: 1_700_000_000,
            initial_fee_base_compact: 1_000_000,
            allocations: vec![Allocation {
                address: hex::encode([0x01u8; 20]),
                tokens: 1_000_000,
            }],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GenesisConfig {
    /// Initial fee base in full precision.
    pub fn initial_fee_base(&self) -> Amount {
        from_compact_fee_base(self.initial_fee_base_compact)
    }

    /// Decoded allocations as `(address, amount in base units)`.
    pub fn parsed_allocations(&self) -> Result<Vec<(Address, Amount)>, NodeError> {
        self.allocations
            .iter()
            .map(|a| {
                let address = parse_address_hex(&a.address).map_err(|e| {
                    NodeError::ConfigError {
                        reason: format!("allocation '{}': {}", a.address, e),
                    }
                })?;
                Ok((address, a.tokens as Amount * ONE_TOKEN))
            })
            .collect()
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        let config: NodeConfig = toml::from_str(&contents).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the protocol parameters and genesis section.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.protocol.validate()?;
        if self.genesis.initial_fee_base_compact == 0 {
            return Err(NodeError::ConfigError {
                reason: "genesis.initial_fee_base_compact must be non-zero".to_string(),
            });
        }
        self.genesis.parsed_allocations()?;
        Ok(())
    }

    /// Initialize a default configuration file in the given directory.
    pub fn init(dir: &str) -> Result<(), NodeError> {
        let dir_path = Path::new(dir);
        if !dir_path.exists() {
            std::fs::create_dir_all(dir_path)?;
        }

        let config = NodeConfig::default();
        let toml_str = toml::to_string_pretty(&config).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to serialize default config: {}", e),
        })?;

        let config_path = dir_path.join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, toml_str)?;

        Ok(())
    }
}
