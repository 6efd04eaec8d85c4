use thiserror::Error;

use crate::primitives::{Amount, BlockId};

/// Errors surfaced by protocol operations. Every error means the call had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // ─── Proposal Errors ─────────────────────────────────────────────────────
    #[error("invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("too many pending blocks: {pending} >= {max}")]
    TooManyPendingBlocks { pending: u64, max: u64 },

    #[error("caller is not the authorized proposer")]
    NotAuthorizedProposer,

    #[error("insufficient balance: have {available}, need more than {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("insufficient tokens: have {available}, requested {requested}")]
    InsufficientTokens { available: Amount, requested: Amount },

    // ─── Query Errors ────────────────────────────────────────────────────────
    #[error("invalid block id: {id}")]
    InvalidBlockId { id: BlockId },

    // ─── Lifecycle Errors ────────────────────────────────────────────────────
    #[error("initial fee base must be non-zero")]
    ZeroFeeBase,

    #[error("protocol is halted")]
    HaltedProtocol,

    #[error("protocol already initialized")]
    AlreadyInitialized,

    #[error("protocol not initialized")]
    NotInitialized,

    // ─── Collaborator Errors ─────────────────────────────────────────────────
    #[error("failed to resolve name: {name}")]
    ResolveFailed { name: String },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    // ─── Arithmetic Errors ───────────────────────────────────────────────────
    #[error("arithmetic overflow")]
    Overflow,
}
