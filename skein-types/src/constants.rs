use crate::primitives::Amount;

// ─── Arithmetic ──────────────────────────────────────────────────────────────

/// Basis-point denominator: 10000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Block and proof time averages are kept in milliseconds.
pub const TIME_PRECISION: u64 = 1_000;

/// Scale used by the slot-occupancy fee curve.
pub const SLOT_SCALE: u64 = 1_000;

/// Full scale of the bootstrap discount factor.
pub const BOOTSTRAP_DISCOUNT_SCALE: u128 = 1_024;

// ─── Token Parameters ────────────────────────────────────────────────────────

/// Number of decimal places of the protocol token.
pub const TOKEN_DECIMALS: u32 = 18;

/// One full token in base units.
pub const ONE_TOKEN: Amount = (10 as Amount).pow(TOKEN_DECIMALS);

/// One compact fee-base unit in base units (10^12).
pub const FEE_BASE_COMPACT_UNIT: Amount = 1_000_000_000_000;

/// Smallest payout credited to an account whose ledger balance is empty.
pub const MIN_PAYOUT: Amount = 1;

// ─── Protocol Defaults ───────────────────────────────────────────────────────

/// Default pending-block ring capacity.
pub const DEFAULT_MAX_PENDING_BLOCKS: u64 = 2_048;

/// Default canonical-hash ring capacity.
pub const DEFAULT_CANONICAL_HASH_HISTORY: u64 = 256;

/// Default per-call verification cap.
pub const DEFAULT_MAX_VERIFICATIONS_PER_BATCH: u64 = 20;

/// Default block gas limit ceiling.
pub const DEFAULT_MAX_BLOCK_GAS_LIMIT: u64 = 6_000_000;

/// Default ceiling on the raw transaction list size in bytes.
pub const DEFAULT_MAX_BYTES_PER_TX_LIST: usize = 120_000;

/// Resolver name of the token ledger.
pub const DEFAULT_TOKEN_NAME: &str = "skein_token";
