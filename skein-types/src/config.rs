use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ProtocolError;

/// Deployment-wide protocol parameters. Immutable once the engine is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Rollup chain identifier.
    pub chain_id: u64,
    /// Capacity of the pending-block ring.
    pub max_pending_blocks: u64,
    /// Upper bound on a proposal's gas limit.
    pub max_block_gas_limit: u64,
    /// Upper bound on blocks processed by one verification call.
    pub max_verifications_per_batch: u64,
    /// Upper bound on the raw transaction list size in bytes.
    pub max_bytes_per_tx_list: usize,
    /// Capacity of the canonical-hash ring.
    pub canonical_hash_history: u64,

    /// When false, proposals are free and verification pays nothing.
    pub tokenomics_enabled: bool,
    pub fee_base_smoothing: u64,
    pub block_time_smoothing: u64,
    pub proof_time_smoothing: u64,
    /// Share of the block fee withheld as a refundable deposit (percent).
    pub proposer_deposit_pct: u64,
    /// Share of each proof reward that is burned (basis points).
    pub reward_burn_bps: u64,
    /// Share of the reward split randomly between co-provers (percent).
    pub prover_randomized_pct: u64,
    /// Grace period before latency penalties start, as a percent of the average time.
    pub fee_grace_period_pct: u64,
    /// Latency at which penalties saturate, as a percent of the average time.
    pub fee_max_period_pct: u64,
    /// Maximum reward multiplier at full latency (percent, >= 100).
    pub reward_multiplier_pct: u64,
    /// Cap applied to the average block time (seconds).
    pub block_time_cap: u64,
    /// Cap applied to the average proof time (seconds).
    pub proof_time_cap: u64,
    /// Smoothing term of the slot-occupancy fee curve.
    pub slot_smoothing: u64,
    /// Halving period of the bootstrap discount (seconds); 0 disables it.
    pub bootstrap_discount_halving_period: u64,

    /// Resolver name of the token ledger.
    pub token_name: String,
    /// Resolver name of the sole proposer. `None` admits any proposer.
    pub sole_proposer_name: Option<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            chain_id: 167,
            max_pending_blocks: DEFAULT_MAX_PENDING_BLOCKS,
            max_block_gas_limit: DEFAULT_MAX_BLOCK_GAS_LIMIT,
            max_verifications_per_batch: DEFAULT_MAX_VERIFICATIONS_PER_BATCH,
            max_bytes_per_tx_list: DEFAULT_MAX_BYTES_PER_TX_LIST,
            canonical_hash_history: DEFAULT_CANONICAL_HASH_HISTORY,
            tokenomics_enabled: true,
            fee_base_smoothing: 1_024,
            block_time_smoothing: 1_024,
            proof_time_smoothing: 1_024,
            proposer_deposit_pct: 25,
            reward_burn_bps: 100,
            prover_randomized_pct: 20,
            fee_grace_period_pct: 125,
            fee_max_period_pct: 375,
            reward_multiplier_pct: 400,
            block_time_cap: 48,
            proof_time_cap: 3_600,
            slot_smoothing: 16_789,
            bootstrap_discount_halving_period: 0,
            token_name: DEFAULT_TOKEN_NAME.to_string(),
            sole_proposer_name: None,
        }
    }
}

impl ProtocolConfig {
    /// Reject parameter combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let fail = |reason: &str| -> Result<(), ProtocolError> {
            Err(ProtocolError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.max_pending_blocks < 2 {
            return fail("max_pending_blocks must be at least 2");
        }
        if self.canonical_hash_history == 0 {
            return fail("canonical_hash_history must be non-zero");
        }
        if self.max_verifications_per_batch == 0 {
            return fail("max_verifications_per_batch must be non-zero");
        }
        if self.fee_base_smoothing == 0
            || self.block_time_smoothing == 0
            || self.proof_time_smoothing == 0
        {
            return fail("smoothing factors must be non-zero");
        }
        if self.slot_smoothing == 0 {
            return fail("slot_smoothing must be non-zero");
        }
        if self.reward_multiplier_pct < 100 {
            return fail("reward_multiplier_pct must be at least 100");
        }
        if self.reward_burn_bps > BPS_DENOMINATOR {
            return fail("reward_burn_bps must not exceed 10000");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ProtocolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_ring() {
        let config = ProtocolConfig {
            max_pending_blocks: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ProtocolError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_smoothing() {
        let config = ProtocolConfig {
            proof_time_smoothing: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_burn() {
        let config = ProtocolConfig {
            reward_burn_bps: 10_001,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ProtocolConfig =
            toml::from_str("max_pending_blocks = 8\ntokenomics_enabled = false\n").unwrap();
        assert_eq!(config.max_pending_blocks, 8);
        assert!(!config.tokenomics_enabled);
        assert_eq!(config.canonical_hash_history, DEFAULT_CANONICAL_HASH_HISTORY);
        assert_eq!(config.sole_proposer_name, None);
    }
}
