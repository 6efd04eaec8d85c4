//! Deterministic local simulation: propose, prove and verify blocks against
//! in-memory collaborators and report where the protocol ended up.

use serde::Serialize;

use skein_crypto::hash::{blake3_hash_domain, hash_tx_list};
use skein_engine::balances::deposit_balance;
use skein_engine::memory::{MemoryLedger, StaticResolver};
use skein_engine::proposing::propose_block;
use skein_engine::state::StateVariables;
use skein_engine::verifying::{init, verify_blocks};
use skein_engine::{EventSink, HostContext, State, TokenLedger};
use skein_types::block::{BlockMetadata, BlockMetadataInput, ForkChoice, ForkChoiceKey};
use skein_types::error::ProtocolError;
use skein_types::event::ProtocolEvent;
use skein_types::primitives::*;

use crate::config::NodeConfig;
use crate::error::NodeError;

const PROVER_DOMAIN: &str = "skein simulated prover";
const BLOCK_HASH_DOMAIN: &str = "skein simulated block";
const HOST_BLOCK_DOMAIN: &str = "skein simulated host block";
const LEDGER_DOMAIN: &str = "skein simulated ledger";
const RANDOMNESS_DOMAIN: &str = "skein simulated randomness";

/// Knobs of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationParams {
    /// Number of proposal attempts.
    pub blocks: u64,
    /// Prove and verify after every this many proposal attempts.
    pub prove_every: u64,
    /// Seconds between proposals.
    pub block_time: u64,
    /// Seconds between a proof batch and the proposals it covers.
    pub proof_delay: u64,
    /// Provers per fork choice (one primary plus co-provers).
    pub provers: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            blocks: 32,
            prove_every: 4,
            block_time: 12,
            proof_delay: 30,
            provers: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProverBalance {
    pub address: String,
    pub balance: Amount,
}

/// Summary printed by `skein simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub proposed: u64,
    /// Proposals refused because the pending ring was full.
    pub rejected: u64,
    pub verified: u64,
    pub verify_calls: u64,
    pub rewards_paid: Amount,
    pub refunds_paid: Amount,
    pub events: EventCounts,
    pub canonical_tip: String,
    pub proposer_balance: Amount,
    pub provers: Vec<ProverBalance>,
    pub state: StateVariables,
}

/// Sink that logs every notification and keeps per-kind counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub proposed: u64,
    pub verified: u64,
    pub synced: u64,
}

impl EventSink for EventCounts {
    fn emit(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::BlockProposed { id, meta } => {
                self.proposed += 1;
                tracing::debug!(id, gas_limit = meta.gas_limit, "event: block proposed");
            }
            ProtocolEvent::BlockVerified { id, block_hash } => {
                self.verified += 1;
                tracing::debug!(id, block_hash = %hex::encode(block_hash), "event: block verified");
            }
            ProtocolEvent::HeaderSynced { height, hash } => {
                self.synced += 1;
                tracing::info!(height, hash = %hex::encode(hash), "event: header synced");
            }
        }
    }
}

fn derived_address(domain: &str, index: u64) -> Address {
    let hash = blake3_hash_domain(domain, &index.to_le_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[..20]);
    address
}

struct Simulation {
    config: NodeConfig,
    params: SimulationParams,
    state: State,
    resolver: StaticResolver,
    ledger: MemoryLedger,
    events: EventCounts,
    token: Address,
    proposer: Address,
    provers: Vec<Address>,
    now: Timestamp,
    host_block: u64,
    /// Proposed blocks not yet covered by a fork choice.
    unproven: Vec<BlockMetadata>,
    /// Hash the next fork choice builds on.
    parent: Hash,
    report: SimulationReport,
}

impl Simulation {
    fn new(config: NodeConfig, params: SimulationParams) -> Result<Self, NodeError> {
        config.validate()?;
        if params.prove_every == 0 || params.provers == 0 {
            return Err(NodeError::ConfigError {
                reason: "prove_every and provers must be non-zero".to_string(),
            });
        }

        let allocations = config.genesis.parsed_allocations()?;
        let proposer = allocations
            .first()
            .map(|(address, _)| *address)
            .ok_or_else(|| NodeError::ConfigError {
                reason: "genesis needs at least one allocation to propose with".to_string(),
            })?;
        let provers: Vec<Address> = (0..params.provers as u64)
            .map(|i| derived_address(PROVER_DOMAIN, i))
            .collect();

        let token = derived_address(LEDGER_DOMAIN, config.protocol.chain_id);
        let mut resolver = StaticResolver::new().with(&config.protocol.token_name, token);
        if let Some(name) = &config.protocol.sole_proposer_name {
            resolver.register(name, proposer);
        }

        let mut ledger = MemoryLedger::new();
        for (address, amount) in &allocations {
            ledger.mint(&token, address, *amount);
        }

        let state = State::new(&config.protocol)?;
        let now = config.genesis.timestamp;
        let parent = config.genesis.genesis_hash;
        let report = SimulationReport {
            proposed: 0,
            rejected: 0,
            verified: 0,
            verify_calls: 0,
            rewards_paid: 0,
            refunds_paid: 0,
            events: EventCounts::default(),
            canonical_tip: String::new(),
            proposer_balance: 0,
            provers: Vec::new(),
            state: state.state_variables(),
        };

        Ok(Self {
            config,
            params,
            state,
            resolver,
            ledger,
            events: EventCounts::default(),
            token,
            proposer,
            provers,
            now,
            host_block: 1,
            unproven: Vec::new(),
            parent,
            report,
        })
    }

    fn context(&mut self, caller: Address) -> HostContext {
        self.host_block += 1;
        HostContext {
            caller,
            timestamp: self.now,
            block_number: self.host_block,
            parent_hash: blake3_hash_domain(HOST_BLOCK_DOMAIN, &(self.host_block - 1).to_le_bytes()),
            randomness: blake3_hash_domain(RANDOMNESS_DOMAIN, &self.host_block.to_le_bytes()),
        }
    }

    fn bootstrap(&mut self) -> Result<(), NodeError> {
        let ctx = self.context(self.proposer);
        init(
            &mut self.state,
            &ctx,
            self.config.genesis.genesis_hash,
            self.config.genesis.initial_fee_base(),
            &mut self.events,
        )?;

        if self.config.protocol.tokenomics_enabled {
            let funds = self.ledger.balance_of(&self.token, &self.proposer);
            deposit_balance(
                &mut self.state,
                &self.config.protocol,
                &ctx,
                &self.resolver,
                &mut self.ledger,
                funds,
            )?;
        }
        Ok(())
    }

    fn propose(&mut self, index: u64) -> Result<(), NodeError> {
        self.now += self.params.block_time;
        let ctx = self.context(self.proposer);
        let tx_list = format!("simulated-txs-{index}").into_bytes();
        let input = BlockMetadataInput {
            beneficiary: self.proposer,
            tx_list_hash: hash_tx_list(&tx_list),
            gas_limit: self.config.protocol.max_block_gas_limit,
        };
        match propose_block(
            &mut self.state,
            &self.config.protocol,
            &ctx,
            &self.resolver,
            input,
            &tx_list,
            &mut self.events,
        ) {
            Ok(meta) => {
                self.report.proposed += 1;
                self.unproven.push(meta);
                Ok(())
            }
            Err(ProtocolError::TooManyPendingBlocks { pending, max }) => {
                tracing::warn!(pending, max, "pending ring full, proposal rejected");
                self.report.rejected += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Submit fork choices for every unproven block, then drain verification.
    fn prove_and_verify(&mut self) -> Result<(), NodeError> {
        self.now += self.params.proof_delay;
        for meta in std::mem::take(&mut self.unproven) {
            let block_hash = blake3_hash_domain(BLOCK_HASH_DOMAIN, &meta.mix_seed);
            let rotation = meta.id as usize % self.provers.len();
            let mut fork_choice = ForkChoice::new(block_hash, self.now, self.provers[rotation]);
            fork_choice.co_provers = self
                .provers
                .iter()
                .cycle()
                .skip(rotation + 1)
                .take(self.provers.len() - 1)
                .copied()
                .collect();
            self.state
                .fork_choices_mut()
                .insert(ForkChoiceKey::new(meta.id, self.parent), fork_choice);
            self.parent = block_hash;
        }

        loop {
            let ctx = self.context(self.provers[0]);
            let summary = verify_blocks(
                &mut self.state,
                &self.config.protocol,
                &ctx,
                &self.resolver,
                &mut self.ledger,
                u64::MAX,
                &mut self.events,
            )?;
            self.report.verify_calls += 1;
            self.report.verified += summary.verified;
            self.report.rewards_paid += summary.rewards_paid;
            self.report.refunds_paid += summary.refunds_paid;
            let drained = self.state.latest_verified_id() + 1 == self.state.next_block_id();
            if summary.verified == 0 || drained {
                return Ok(());
            }
        }
    }

    fn finish(mut self) -> SimulationReport {
        self.report.events = self.events;
        self.report.canonical_tip = hex::encode(self.state.canonical_tip());
        self.report.proposer_balance = self.state.balance_of(&self.proposer);
        self.report.provers = self
            .provers
            .iter()
            .map(|prover| ProverBalance {
                address: hex::encode(prover),
                balance: self.ledger.balance_of(&self.token, prover),
            })
            .collect();
        self.report.state = self.state.state_variables();
        self.report
    }
}

/// Run a full simulation and return its report.
pub fn run(config: NodeConfig, params: SimulationParams) -> Result<SimulationReport, NodeError> {
    let mut sim = Simulation::new(config, params)?;
    sim.bootstrap()?;

    for index in 0..params.blocks {
        sim.propose(index)?;
        if (index + 1) % params.prove_every == 0 {
            sim.prove_and_verify()?;
        }
    }
    if !sim.unproven.is_empty() {
        sim.prove_and_verify()?;
    }

    let report = sim.finish();
    tracing::info!(
        proposed = report.proposed,
        rejected = report.rejected,
        verified = report.verified,
        "simulation finished"
    );
    Ok(report)
}
