//! Bootstrap and sequential verification of proposed blocks.
//!
//! Verification walks pending blocks in id order, consuming the fork choice
//! whose claimed parent is the running canonical hash. The first block without
//! a verifiable proof ends the batch; everything before it commits together.

use std::collections::BTreeMap;

use skein_types::block::{ForkChoice, ForkChoiceKey};
use skein_types::config::ProtocolConfig;
use skein_types::constants::{MIN_PAYOUT, TIME_PRECISION};
use skein_types::error::ProtocolError;
use skein_types::event::ProtocolEvent;
use skein_types::primitives::*;

use crate::commitment::reward_seed;
use crate::host::{AddressResolver, EventSink, HostContext, TokenLedger};
use crate::rewards::{prover_reward_weights, split_reward};
use crate::state::{State, TokenomicsSnapshot};
use crate::tokenomics;

/// Outcome of one [`verify_blocks`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationSummary {
    /// Number of blocks verified by this call.
    pub verified: u64,
    pub latest_verified_id: BlockId,
    pub latest_verified_height: Height,
    /// Total minted to provers, including one-unit payouts.
    pub rewards_paid: Amount,
    /// Total credited back to proposers' internal balances.
    pub refunds_paid: Amount,
}

/// Changes accumulated while walking a batch. Nothing reaches [`State`] or the
/// ledger until [`commit_verification`].
#[derive(Debug)]
struct VerificationBatch {
    snapshot: TokenomicsSnapshot,
    processed: u64,
    height: Height,
    hash: Hash,
    balances: BTreeMap<Address, Amount>,
    mints: Vec<(Address, Amount)>,
    minted: BTreeMap<Address, Amount>,
    consumed: Vec<ForkChoiceKey>,
    events: Vec<ProtocolEvent>,
    rewards_paid: Amount,
    refunds_paid: Amount,
}

impl VerificationBatch {
    fn new(state: &State) -> Self {
        Self {
            snapshot: state.tokenomics_snapshot(),
            processed: 0,
            height: state.latest_verified_height,
            hash: state.canonical_tip(),
            balances: BTreeMap::new(),
            mints: Vec::new(),
            minted: BTreeMap::new(),
            consumed: Vec::new(),
            events: Vec::new(),
            rewards_paid: 0,
            refunds_paid: 0,
        }
    }

    /// Internal balance of `account` with this batch's refunds applied.
    fn balance_of(&self, state: &State, account: &Address) -> Amount {
        self.balances
            .get(account)
            .copied()
            .unwrap_or_else(|| state.balance_of(account))
    }

    fn mint(&mut self, account: Address, amount: Amount) {
        let entry = self.minted.entry(account).or_insert(0);
        *entry = entry.saturating_add(amount);
        self.rewards_paid = self.rewards_paid.saturating_add(amount);
        self.mints.push((account, amount));
    }
}

/// One-time bootstrap. Seeds the canonical ring with `genesis_hash` at height 0.
pub fn init<S>(
    state: &mut State,
    ctx: &HostContext,
    genesis_hash: Hash,
    initial_fee_base: Amount,
    sink: &mut S,
) -> Result<(), ProtocolError>
where
    S: EventSink + ?Sized,
{
    if state.initialized {
        return Err(ProtocolError::AlreadyInitialized);
    }
    if initial_fee_base == 0 {
        return Err(ProtocolError::ZeroFeeBase);
    }

    state.initialized = true;
    state.fee_base = initial_fee_base;
    state.genesis_timestamp = ctx.timestamp;
    state.last_proposed_at = ctx.timestamp;
    state.next_block_id = 1;
    state.latest_verified_id = 0;
    state.latest_verified_height = 0;
    state.canonical_hashes.insert(0, genesis_hash);

    tracing::info!(
        fee_base = initial_fee_base,
        genesis_timestamp = ctx.timestamp,
        "protocol initialized"
    );
    sink.emit(ProtocolEvent::BlockVerified {
        id: 0,
        block_hash: genesis_hash,
    });
    sink.emit(ProtocolEvent::HeaderSynced {
        height: 0,
        hash: genesis_hash,
    });
    Ok(())
}

/// Verify up to `max_blocks` pending blocks (further capped by
/// `max_verifications_per_batch`), paying provers through `ledger`.
///
/// Stopping early at an unproven block is a normal outcome, reported through
/// [`VerificationSummary::verified`].
pub fn verify_blocks<R, L, S>(
    state: &mut State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    resolver: &R,
    ledger: &mut L,
    max_blocks: u64,
    sink: &mut S,
) -> Result<VerificationSummary, ProtocolError>
where
    R: AddressResolver + ?Sized,
    L: TokenLedger + ?Sized,
    S: EventSink + ?Sized,
{
    state.ensure_live()?;
    let token = if config.tokenomics_enabled {
        resolver.resolve(&config.token_name, false)?
    } else {
        ZERO_ADDRESS
    };

    let limit = max_blocks.min(config.max_verifications_per_batch);
    let batch = stage_verification(state, config, ctx, &token, &*ledger, limit);
    let summary = commit_verification(state, &token, ledger, batch, sink);
    Ok(summary)
}

fn stage_verification<L>(
    state: &State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    token: &Address,
    ledger: &L,
    limit: u64,
) -> VerificationBatch
where
    L: TokenLedger + ?Sized,
{
    let mut batch = VerificationBatch::new(state);
    let mut id = state.latest_verified_id + 1;

    while id < state.next_block_id && batch.processed < limit {
        let key = ForkChoiceKey::new(id, batch.hash);
        let fork_choice = match state.fork_choices.get(&key) {
            Some(fc) if fc.is_verifiable() => fc,
            _ => {
                tracing::debug!(id, parent = ?batch.hash, "no verifiable proof, batch ends");
                break;
            }
        };

        verify_block(state, config, ctx, token, ledger, &mut batch, id, fork_choice);
        batch.consumed.push(key);
        batch.processed += 1;
        id += 1;
    }
    batch
}

#[allow(clippy::too_many_arguments)]
fn verify_block<L>(
    state: &State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    token: &Address,
    ledger: &L,
    batch: &mut VerificationBatch,
    id: BlockId,
    fork_choice: &ForkChoice,
) where
    L: TokenLedger + ?Sized,
{
    let pending = state.pending_blocks.get(id);

    if config.tokenomics_enabled {
        let (new_fee_base, reward, latency_bps) = tokenomics::proof_reward(
            config,
            &batch.snapshot,
            fork_choice.proven_at,
            pending.proposed_at,
        );

        let provers = fork_choice.provers();
        let seed = reward_seed(&ctx.randomness, &pending.metadata_hash);
        let weights = prover_reward_weights(config, provers.len(), &seed);
        for (prover, share) in provers.iter().zip(split_reward(reward, &weights)) {
            let held = ledger
                .balance_of(token, prover)
                .saturating_add(batch.minted.get(prover).copied().unwrap_or(0));
            if share == 0 && held > 0 {
                continue;
            }
            let payout = if held == 0 {
                tracing::warn!(id, prover = ?prover, share, "prover holds no tokens, paying one unit");
                MIN_PAYOUT
            } else {
                share
            };
            batch.mint(*prover, payout);
        }

        let refund = tokenomics::deposit_refund(pending.deposit, latency_bps);
        if refund > 0 {
            let balance = batch.balance_of(state, &pending.proposer);
            if balance == 0 {
                tracing::debug!(id, proposer = ?pending.proposer, "refund skipped, empty balance");
            } else {
                batch
                    .balances
                    .insert(pending.proposer, balance.saturating_add(refund));
                batch.refunds_paid = batch.refunds_paid.saturating_add(refund);
            }
        }

        batch.snapshot.fee_base = tokenomics::moving_average(
            batch.snapshot.fee_base,
            new_fee_base,
            config.fee_base_smoothing,
        )
        .max(1);
    }

    let proof_time = fork_choice
        .proven_at
        .saturating_sub(pending.proposed_at)
        .saturating_mul(TIME_PRECISION);
    batch.snapshot.avg_proof_time = tokenomics::moving_average_time(
        batch.snapshot.avg_proof_time,
        proof_time,
        config.proof_time_smoothing,
    );

    if !fork_choice.is_dead_end() {
        batch.height += 1;
        batch.hash = fork_choice.block_hash;
    }

    tracing::debug!(id, block_hash = ?fork_choice.block_hash, "block verified");
    batch.events.push(ProtocolEvent::BlockVerified {
        id,
        block_hash: fork_choice.block_hash,
    });
}

fn commit_verification<L, S>(
    state: &mut State,
    token: &Address,
    ledger: &mut L,
    batch: VerificationBatch,
    sink: &mut S,
) -> VerificationSummary
where
    L: TokenLedger + ?Sized,
    S: EventSink + ?Sized,
{
    let VerificationBatch {
        snapshot,
        processed,
        height,
        hash,
        balances,
        mints,
        consumed,
        mut events,
        rewards_paid,
        refunds_paid,
        ..
    } = batch;

    if processed > 0 {
        state.fee_base = snapshot.fee_base;
        state.avg_proof_time = snapshot.avg_proof_time;
        state.balances.extend(balances);
        for key in &consumed {
            state.fork_choices.remove(key);
        }
        state.latest_verified_id += processed;

        if height > state.latest_verified_height {
            state.canonical_hashes.insert(height, hash);
            state.latest_verified_height = height;
            tracing::info!(height, hash = ?hash, "header synced");
            events.push(ProtocolEvent::HeaderSynced { height, hash });
        }

        for (account, amount) in &mints {
            ledger.mint(token, account, *amount);
        }

        tracing::info!(
            verified = processed,
            latest_verified_id = state.latest_verified_id,
            rewards_paid,
            refunds_paid,
            "verification batch committed"
        );
        for event in events {
            sink.emit(event);
        }
    }

    VerificationSummary {
        verified: processed,
        latest_verified_id: state.latest_verified_id,
        latest_verified_height: state.latest_verified_height,
        rewards_paid,
        refunds_paid,
    }
}

/// `(new_fee_base, reward, latency_bps)` for a proof of a block proposed at
/// `proposed_at` and proven at `proven_at`, priced against the current state.
pub fn get_proof_reward(
    state: &State,
    config: &ProtocolConfig,
    proven_at: Timestamp,
    proposed_at: Timestamp,
) -> (Amount, Amount, u64) {
    tokenomics::proof_reward(config, &state.tokenomics_snapshot(), proven_at, proposed_at)
}

/// The proof submitted for block `id` against `parent_hash`, if any.
pub fn get_fork_choice(state: &State, id: BlockId, parent_hash: Hash) -> Option<&ForkChoice> {
    state.fork_choices.get(&ForkChoiceKey::new(id, parent_hash))
}

/// Canonical hash at `height`, while it is retained in the history ring.
pub fn get_canonical_hash(state: &State, height: Height) -> Result<Hash, ProtocolError> {
    if !state.initialized || height > state.latest_verified_height {
        return Err(ProtocolError::InvalidBlockId { id: height });
    }
    state
        .canonical_hashes
        .get(height)
        .ok_or(ProtocolError::InvalidBlockId { id: height })
}
