use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use skein_types::block::{ForkChoice, ForkChoiceKey, PendingBlock};
use skein_types::config::ProtocolConfig;
use skein_types::error::ProtocolError;
use skein_types::primitives::*;

use crate::tokenomics;

/// Fixed-capacity ring of pending blocks, indexed by `id % capacity`.
#[derive(Debug, Clone)]
pub struct PendingRing {
    slots: Vec<PendingBlock>,
}

impl PendingRing {
    /// Create a ring with `capacity` empty slots.
    pub fn new(capacity: u64) -> Self {
        Self {
            slots: vec![PendingBlock::default(); capacity as usize],
        }
    }

    pub fn capacity(&self) -> u64 {
        self.slots.len() as u64
    }

    fn index(&self, id: BlockId) -> usize {
        (id % self.capacity()) as usize
    }

    /// Read the slot for `id`. Callers check that `id` is live.
    pub fn get(&self, id: BlockId) -> &PendingBlock {
        &self.slots[self.index(id)]
    }

    /// Write `block` into the slot of `id`.
    ///
    /// The slot may only be recycled when every block sharing it is verified,
    /// i.e. `latest_verified_id < id < latest_verified_id + capacity`.
    pub fn insert(
        &mut self,
        id: BlockId,
        latest_verified_id: BlockId,
        block: PendingBlock,
    ) -> Result<(), ProtocolError> {
        let pending = id.saturating_sub(latest_verified_id);
        if id <= latest_verified_id || pending >= self.capacity() {
            return Err(ProtocolError::TooManyPendingBlocks {
                pending,
                max: self.capacity(),
            });
        }
        let index = self.index(id);
        self.slots[index] = block;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CanonicalEntry {
    height: Height,
    hash: Hash,
}

/// Fixed-capacity ring of canonical hashes, indexed by `height % capacity`.
#[derive(Debug, Clone)]
pub struct CanonicalRing {
    slots: Vec<Option<CanonicalEntry>>,
}

impl CanonicalRing {
    pub fn new(capacity: u64) -> Self {
        Self {
            slots: vec![None; capacity as usize],
        }
    }

    pub fn capacity(&self) -> u64 {
        self.slots.len() as u64
    }

    /// Record `hash` for `height`, evicting whatever shared the slot.
    pub fn insert(&mut self, height: Height, hash: Hash) {
        let index = (height % self.capacity()) as usize;
        self.slots[index] = Some(CanonicalEntry { height, hash });
    }

    /// Hash recorded for exactly `height`, if still retained.
    pub fn get(&self, height: Height) -> Option<Hash> {
        let index = (height % self.capacity()) as usize;
        match self.slots[index] {
            Some(entry) if entry.height == height => Some(entry.hash),
            _ => None,
        }
    }
}

/// Proof records keyed by `(block id, claimed parent hash)`.
///
/// Competing proofs against parents that never become canonical are never
/// looked up again and simply stay here.
#[derive(Debug, Clone, Default)]
pub struct ForkChoiceStore {
    records: HashMap<ForkChoiceKey, ForkChoice>,
}

impl ForkChoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `key`.
    pub fn insert(&mut self, key: ForkChoiceKey, fork_choice: ForkChoice) {
        self.records.insert(key, fork_choice);
    }

    pub fn get(&self, key: &ForkChoiceKey) -> Option<&ForkChoice> {
        self.records.get(key)
    }

    /// Clear a consumed record so it cannot be replayed.
    pub fn remove(&mut self, key: &ForkChoiceKey) -> Option<ForkChoice> {
        self.records.remove(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Inputs of the fee formulas, copied out of [`State`] so a batch can evolve
/// them without touching the state until commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenomicsSnapshot {
    pub fee_base: Amount,
    /// Milliseconds.
    pub avg_block_time: u64,
    /// Milliseconds.
    pub avg_proof_time: u64,
    pub last_proposed_at: Timestamp,
    pub genesis_timestamp: Timestamp,
    pub next_block_id: BlockId,
    pub latest_verified_id: BlockId,
}

impl TokenomicsSnapshot {
    /// Number of admitted but unverified blocks.
    pub fn pending_count(&self) -> u64 {
        self.next_block_id - self.latest_verified_id - 1
    }
}

/// Read-only report of the protocol's scalar state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariables {
    /// Fee base in compact units.
    pub fee_base_compact: u64,
    pub fee_base: Amount,
    pub genesis_timestamp: Timestamp,
    pub next_block_id: BlockId,
    pub latest_verified_id: BlockId,
    pub latest_verified_height: Height,
    pub last_proposed_at: Timestamp,
    pub avg_block_time: u64,
    pub avg_proof_time: u64,
    pub halted: bool,
}

/// The protocol's complete mutable state. Every operation takes it by
/// exclusive reference; there is no other owner.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) initialized: bool,
    pub(crate) halted: bool,
    pub(crate) genesis_timestamp: Timestamp,
    pub(crate) next_block_id: BlockId,
    pub(crate) latest_verified_id: BlockId,
    pub(crate) latest_verified_height: Height,
    pub(crate) fee_base: Amount,
    pub(crate) avg_block_time: u64,
    pub(crate) avg_proof_time: u64,
    pub(crate) last_proposed_at: Timestamp,
    pub(crate) balances: BTreeMap<Address, Amount>,
    pub(crate) pending_blocks: PendingRing,
    pub(crate) fork_choices: ForkChoiceStore,
    pub(crate) canonical_hashes: CanonicalRing,
}

impl State {
    /// Allocate an uninitialized state sized for `config`.
    pub fn new(config: &ProtocolConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            initialized: false,
            halted: false,
            genesis_timestamp: 0,
            next_block_id: 1,
            latest_verified_id: 0,
            latest_verified_height: 0,
            fee_base: 0,
            avg_block_time: 0,
            avg_proof_time: 0,
            last_proposed_at: 0,
            balances: BTreeMap::new(),
            pending_blocks: PendingRing::new(config.max_pending_blocks),
            fork_choices: ForkChoiceStore::new(),
            canonical_hashes: CanonicalRing::new(config.canonical_hash_history),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn next_block_id(&self) -> BlockId {
        self.next_block_id
    }

    pub fn latest_verified_id(&self) -> BlockId {
        self.latest_verified_id
    }

    pub fn latest_verified_height(&self) -> Height {
        self.latest_verified_height
    }

    pub fn fee_base(&self) -> Amount {
        self.fee_base
    }

    pub fn avg_block_time(&self) -> u64 {
        self.avg_block_time
    }

    pub fn avg_proof_time(&self) -> u64 {
        self.avg_proof_time
    }

    pub fn last_proposed_at(&self) -> Timestamp {
        self.last_proposed_at
    }

    /// Internal (deposited) balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit genesis allocations. Not part of the metered flow.
    pub fn seed_balances(&mut self, allocations: impl IntoIterator<Item = (Address, Amount)>) {
        for (account, amount) in allocations {
            let entry = self.balances.entry(account).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Proof records written by the proving pipeline.
    pub fn fork_choices(&self) -> &ForkChoiceStore {
        &self.fork_choices
    }

    /// Mutable access for the proving pipeline that populates fork choices.
    pub fn fork_choices_mut(&mut self) -> &mut ForkChoiceStore {
        &mut self.fork_choices
    }

    /// Canonical hash at the latest verified height.
    pub fn canonical_tip(&self) -> Hash {
        self.canonical_hashes
            .get(self.latest_verified_height)
            .unwrap_or(ZERO_HASH)
    }

    pub fn tokenomics_snapshot(&self) -> TokenomicsSnapshot {
        TokenomicsSnapshot {
            fee_base: self.fee_base,
            avg_block_time: self.avg_block_time,
            avg_proof_time: self.avg_proof_time,
            last_proposed_at: self.last_proposed_at,
            genesis_timestamp: self.genesis_timestamp,
            next_block_id: self.next_block_id,
            latest_verified_id: self.latest_verified_id,
        }
    }

    pub fn state_variables(&self) -> StateVariables {
        StateVariables {
            fee_base_compact: tokenomics::to_compact_fee_base(self.fee_base),
            fee_base: self.fee_base,
            genesis_timestamp: self.genesis_timestamp,
            next_block_id: self.next_block_id,
            latest_verified_id: self.latest_verified_id,
            latest_verified_height: self.latest_verified_height,
            last_proposed_at: self.last_proposed_at,
            avg_block_time: self.avg_block_time,
            avg_proof_time: self.avg_proof_time,
            halted: self.halted,
        }
    }

    pub(crate) fn ensure_live(&self) -> Result<(), ProtocolError> {
        if !self.initialized {
            return Err(ProtocolError::NotInitialized);
        }
        if self.halted {
            return Err(ProtocolError::HaltedProtocol);
        }
        Ok(())
    }
}

/// Engage or release the emergency stop.
pub fn set_halted(state: &mut State, halted: bool) {
    if state.halted != halted {
        tracing::info!(halted, "protocol halt flag changed");
    }
    state.halted = halted;
}
