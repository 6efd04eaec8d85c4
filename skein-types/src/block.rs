use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::primitives::*;

/// Proposer-supplied fields of a new block.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockMetadataInput {
    /// Address receiving the block's L2 fees.
    pub beneficiary: Address,
    /// Hash of the raw transaction list.
    pub tx_list_hash: Hash,
    /// Gas limit requested for the block.
    pub gas_limit: u64,
}

/// Full metadata of an admitted block. Its commitment hash is what a
/// proposer receives and what verifiers recompute.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub id: BlockId,
    /// Host block number the proposal was built on.
    pub parent_height: u64,
    /// Host block hash the proposal was built on.
    pub parent_hash: Hash,
    pub beneficiary: Address,
    pub tx_list_hash: Hash,
    /// Per-block randomness, distinct for proposals admitted in the same host step.
    pub mix_seed: Hash,
    pub gas_limit: u64,
    pub timestamp: Timestamp,
}

/// A proposed block waiting for verification, stored in the pending ring.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct PendingBlock {
    pub metadata_hash: Hash,
    /// Collateral withheld from the proposer.
    pub deposit: Amount,
    pub proposer: Address,
    pub proposed_at: Timestamp,
}

/// A proof record asserting the resulting hash of a block built on a given parent.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ForkChoice {
    /// Resulting block hash; [`ZERO_HASH`] while unproven, [`DEAD_END_HASH`] for a dead end.
    pub block_hash: Hash,
    pub proven_at: Timestamp,
    /// Primary prover; [`ZERO_ADDRESS`] when unset.
    pub prover: Address,
    /// Additional provers in submission order, sharing the reward with `prover`.
    pub co_provers: Vec<Address>,
}

impl ForkChoice {
    /// Create a single-prover fork choice.
    pub fn new(block_hash: Hash, proven_at: Timestamp, prover: Address) -> Self {
        Self {
            block_hash,
            proven_at,
            prover,
            co_provers: Vec::new(),
        }
    }

    /// A fork choice can be consumed once it carries a hash and a prover.
    pub fn is_verifiable(&self) -> bool {
        self.block_hash != ZERO_HASH && self.prover != ZERO_ADDRESS
    }

    /// Whether this proof marks its block as a dead end.
    pub fn is_dead_end(&self) -> bool {
        self.block_hash == DEAD_END_HASH
    }

    /// All reward recipients, ordered by submission priority.
    pub fn provers(&self) -> Vec<Address> {
        let mut all = Vec::with_capacity(1 + self.co_provers.len());
        all.push(self.prover);
        all.extend(self.co_provers.iter().copied());
        all
    }
}

/// Composite key of a fork choice: the block it proves and the parent it claims.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct ForkChoiceKey {
    pub block_id: BlockId,
    pub parent_hash: Hash,
}

impl ForkChoiceKey {
    pub fn new(block_id: BlockId, parent_hash: Hash) -> Self {
        Self {
            block_id,
            parent_hash,
        }
    }
}
