//! Admission of block proposals.

use skein_crypto::hash::{hash_tx_list, mix_seed};
use skein_types::block::{BlockMetadata, BlockMetadataInput, PendingBlock};
use skein_types::config::ProtocolConfig;
use skein_types::constants::TIME_PRECISION;
use skein_types::error::ProtocolError;
use skein_types::event::ProtocolEvent;
use skein_types::primitives::*;

use crate::commitment::metadata_hash;
use crate::host::{AddressResolver, EventSink, HostContext};
use crate::state::State;
use crate::tokenomics;

/// Balance and fee-base changes of a priced proposal.
#[derive(Debug, Clone, Copy)]
struct Charge {
    remaining_balance: Amount,
    fee_base: Amount,
    fee: Amount,
}

/// Every write a proposal will make, computed before any of them happens.
#[derive(Debug, Clone)]
struct StagedProposal {
    meta: BlockMetadata,
    pending: PendingBlock,
    charge: Option<Charge>,
    avg_block_time: u64,
}

/// Admit a new block proposed by `ctx.caller`.
///
/// On success the block occupies ring slot `id % max_pending_blocks`, the
/// caller has paid `fee + deposit` (with tokenomics enabled), and a
/// [`ProtocolEvent::BlockProposed`] has been emitted. On error nothing changed.
pub fn propose_block<R, S>(
    state: &mut State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    resolver: &R,
    input: BlockMetadataInput,
    tx_list: &[u8],
    sink: &mut S,
) -> Result<BlockMetadata, ProtocolError>
where
    R: AddressResolver + ?Sized,
    S: EventSink + ?Sized,
{
    let staged = stage_proposal(state, config, ctx, resolver, input, tx_list)?;
    let meta = commit_proposal(state, ctx, staged)?;
    sink.emit(ProtocolEvent::BlockProposed {
        id: meta.id,
        meta: meta.clone(),
    });
    Ok(meta)
}

/// Look up a block that is proposed but not yet verified.
pub fn get_proposed_block(state: &State, id: BlockId) -> Result<&PendingBlock, ProtocolError> {
    if id <= state.latest_verified_id || id >= state.next_block_id {
        return Err(ProtocolError::InvalidBlockId { id });
    }
    Ok(state.pending_blocks.get(id))
}

/// The `(new_fee_base, fee, deposit)` a proposal made at `now` would pay.
pub fn get_block_fee(
    state: &State,
    config: &ProtocolConfig,
    now: Timestamp,
) -> (Amount, Amount, Amount) {
    tokenomics::block_fee(config, &state.tokenomics_snapshot(), now)
}

fn validate_input(
    config: &ProtocolConfig,
    input: &BlockMetadataInput,
    tx_list: &[u8],
) -> Result<(), ProtocolError> {
    let invalid = |reason: String| ProtocolError::InvalidMetadata { reason };
    if input.beneficiary == ZERO_ADDRESS {
        return Err(invalid("beneficiary must be set".to_string()));
    }
    if input.gas_limit > config.max_block_gas_limit {
        return Err(invalid(format!(
            "gas limit {} exceeds max {}",
            input.gas_limit, config.max_block_gas_limit
        )));
    }
    if tx_list.len() > config.max_bytes_per_tx_list {
        return Err(invalid(format!(
            "tx list of {} bytes exceeds max {}",
            tx_list.len(),
            config.max_bytes_per_tx_list
        )));
    }
    if input.tx_list_hash != hash_tx_list(tx_list) {
        return Err(invalid("tx list hash mismatch".to_string()));
    }
    Ok(())
}

fn stage_proposal<R>(
    state: &State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    resolver: &R,
    input: BlockMetadataInput,
    tx_list: &[u8],
) -> Result<StagedProposal, ProtocolError>
where
    R: AddressResolver + ?Sized,
{
    state.ensure_live()?;

    if let Some(name) = &config.sole_proposer_name {
        let sole_proposer = resolver.resolve(name, true)?;
        if sole_proposer != ZERO_ADDRESS && sole_proposer != ctx.caller {
            return Err(ProtocolError::NotAuthorizedProposer);
        }
    }

    validate_input(config, &input, tx_list)?;

    let id = state.next_block_id;
    let pending = id - state.latest_verified_id;
    if pending >= config.max_pending_blocks {
        return Err(ProtocolError::TooManyPendingBlocks {
            pending,
            max: config.max_pending_blocks,
        });
    }

    let meta = BlockMetadata {
        id,
        parent_height: ctx.parent_height(),
        parent_hash: ctx.parent_hash,
        beneficiary: input.beneficiary,
        tx_list_hash: input.tx_list_hash,
        mix_seed: mix_seed(&ctx.randomness, id),
        gas_limit: input.gas_limit,
        timestamp: ctx.timestamp,
    };

    let (deposit, charge) = if config.tokenomics_enabled {
        let (new_fee_base, fee, deposit) = get_block_fee(state, config, ctx.timestamp);
        let required = fee.checked_add(deposit).ok_or(ProtocolError::Overflow)?;
        let available = state.balance_of(&ctx.caller);
        if available <= required {
            return Err(ProtocolError::InsufficientBalance {
                available,
                required,
            });
        }
        let fee_base =
            tokenomics::moving_average(state.fee_base, new_fee_base, config.fee_base_smoothing)
                .max(1);
        let charge = Charge {
            remaining_balance: available - required,
            fee_base,
            fee,
        };
        (deposit, Some(charge))
    } else {
        (0, None)
    };

    let block_time = ctx
        .timestamp
        .saturating_sub(state.last_proposed_at)
        .saturating_mul(TIME_PRECISION);
    let avg_block_time = tokenomics::moving_average_time(
        state.avg_block_time,
        block_time,
        config.block_time_smoothing,
    );

    let pending = PendingBlock {
        metadata_hash: metadata_hash(&meta),
        deposit,
        proposer: ctx.caller,
        proposed_at: meta.timestamp,
    };

    Ok(StagedProposal {
        meta,
        pending,
        charge,
        avg_block_time,
    })
}

fn commit_proposal(
    state: &mut State,
    ctx: &HostContext,
    staged: StagedProposal,
) -> Result<BlockMetadata, ProtocolError> {
    let StagedProposal {
        meta,
        pending,
        charge,
        avg_block_time,
    } = staged;

    // First write: the ring re-checks that the slot holds no live block.
    let deposit = pending.deposit;
    state
        .pending_blocks
        .insert(meta.id, state.latest_verified_id, pending)?;

    if let Some(charge) = charge {
        state.balances.insert(ctx.caller, charge.remaining_balance);
        state.fee_base = charge.fee_base;
        tracing::debug!(
            id = meta.id,
            fee = charge.fee,
            deposit,
            fee_base = charge.fee_base,
            "proposal charged"
        );
    }
    state.avg_block_time = avg_block_time;
    state.last_proposed_at = meta.timestamp;
    state.next_block_id += 1;

    tracing::debug!(
        id = meta.id,
        proposer = ?ctx.caller,
        gas_limit = meta.gas_limit,
        "block proposed"
    );
    Ok(meta)
}
