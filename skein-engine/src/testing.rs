//! Shared fixtures for the engine's unit tests.

use skein_crypto::hash::hash_tx_list;
use skein_types::block::{BlockMetadata, BlockMetadataInput, ForkChoice, ForkChoiceKey};
use skein_types::config::ProtocolConfig;
use skein_types::constants::DEFAULT_TOKEN_NAME;
use skein_types::error::ProtocolError;
use skein_types::event::ProtocolEvent;
use skein_types::primitives::*;

use crate::host::HostContext;
use crate::memory::{MemoryLedger, StaticResolver};
use crate::proposing::propose_block;
use crate::state::State;
use crate::verifying::{init, verify_blocks, VerificationSummary};

pub const PROPOSER: Address = [0xa1; 20];
pub const OTHER: Address = [0xa2; 20];
pub const PROVER: Address = [0xb1; 20];
pub const TOKEN: Address = [0x70; 20];
pub const GENESIS_HASH: Hash = [0x11; 32];
pub const GENESIS_TS: Timestamp = 1_000;
pub const FEE_BASE: Amount = 1_000_000_000;
pub const TX_LIST: &[u8] = b"rlp-txs";

pub fn free_config() -> ProtocolConfig {
    ProtocolConfig {
        tokenomics_enabled: false,
        max_pending_blocks: 8,
        canonical_hash_history: 16,
        ..Default::default()
    }
}

pub fn paid_config() -> ProtocolConfig {
    ProtocolConfig {
        tokenomics_enabled: true,
        ..free_config()
    }
}

pub fn resolver() -> StaticResolver {
    StaticResolver::new().with(DEFAULT_TOKEN_NAME, TOKEN)
}

pub fn context(caller: Address, timestamp: Timestamp) -> HostContext {
    HostContext {
        caller,
        timestamp,
        block_number: timestamp / 12,
        parent_hash: [0x22; 32],
        randomness: [0x33; 32],
    }
}

pub fn default_input() -> BlockMetadataInput {
    BlockMetadataInput {
        beneficiary: [0xbe; 20],
        tx_list_hash: hash_tx_list(TX_LIST),
        gas_limit: 1_000_000,
    }
}

/// Hash the prover claims for block `id`; block 0 is genesis.
pub fn block_hash(id: BlockId) -> Hash {
    if id == 0 {
        return GENESIS_HASH;
    }
    let mut hash = [0xcc; 32];
    hash[..8].copy_from_slice(&id.to_le_bytes());
    hash
}

/// Route engine logs through the test harness's captured output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An initialized engine with in-memory collaborators.
pub struct Harness {
    pub config: ProtocolConfig,
    pub state: State,
    pub resolver: StaticResolver,
    pub ledger: MemoryLedger,
    pub events: Vec<ProtocolEvent>,
    pub now: Timestamp,
}

impl Harness {
    pub fn new(config: ProtocolConfig) -> Self {
        init_tracing();
        let mut state = State::new(&config).unwrap();
        let mut events = Vec::new();
        init(
            &mut state,
            &context(PROPOSER, GENESIS_TS),
            GENESIS_HASH,
            FEE_BASE,
            &mut events,
        )
        .unwrap();
        Self {
            config,
            state,
            resolver: resolver(),
            ledger: MemoryLedger::new(),
            events,
            now: GENESIS_TS,
        }
    }

    pub fn propose(
        &mut self,
        caller: Address,
        timestamp: Timestamp,
    ) -> Result<BlockMetadata, ProtocolError> {
        self.propose_with(&context(caller, timestamp), default_input(), TX_LIST)
    }

    pub fn propose_with(
        &mut self,
        ctx: &HostContext,
        input: BlockMetadataInput,
        tx_list: &[u8],
    ) -> Result<BlockMetadata, ProtocolError> {
        self.now = self.now.max(ctx.timestamp);
        propose_block(
            &mut self.state,
            &self.config,
            ctx,
            &self.resolver,
            input,
            tx_list,
            &mut self.events,
        )
    }

    /// Prove block `id` on top of block `id - 1` by [`PROVER`].
    pub fn prove(&mut self, id: BlockId, proven_at: Timestamp) {
        let fork_choice = ForkChoice::new(block_hash(id), proven_at, PROVER);
        self.prove_with(id, block_hash(id - 1), fork_choice);
    }

    pub fn prove_with(&mut self, id: BlockId, parent_hash: Hash, fork_choice: ForkChoice) {
        self.now = self.now.max(fork_choice.proven_at);
        self.state
            .fork_choices_mut()
            .insert(ForkChoiceKey::new(id, parent_hash), fork_choice);
    }

    pub fn verify(&mut self, max_blocks: u64) -> Result<VerificationSummary, ProtocolError> {
        verify_blocks(
            &mut self.state,
            &self.config,
            &context(OTHER, self.now),
            &self.resolver,
            &mut self.ledger,
            max_blocks,
            &mut self.events,
        )
    }
}
