//! Fee and reward pricing.
//!
//! Every function here is pure: inputs come from a [`TokenomicsSnapshot`] and
//! the protocol config, so proposal and verification paths can price against
//! staged values. The fee base is a full-precision [`Amount`] everywhere; the
//! compact unit only appears at the edges (config input, reporting).

use skein_types::config::ProtocolConfig;
use skein_types::constants::*;
use skein_types::primitives::*;

use crate::state::TokenomicsSnapshot;

/// Exponential moving average: `current + (new_value - current) / smoothing`.
///
/// A zero `current` means "no history" and adopts `new_value` directly.
/// `smoothing` is clamped to at least 1.
pub fn moving_average(current: u128, new_value: u128, smoothing: u64) -> u128 {
    if current == 0 {
        return new_value;
    }
    let smoothing = smoothing.max(1) as u128;
    if new_value >= current {
        current + (new_value - current) / smoothing
    } else {
        current - (current - new_value) / smoothing
    }
}

/// [`moving_average`] for millisecond time averages.
pub fn moving_average_time(current: u64, new_value: u64, smoothing: u64) -> u64 {
    // the result lies between the two inputs, so it fits in u64
    moving_average(current as u128, new_value as u128, smoothing) as u64
}

/// Convert a full-precision fee base into compact units (saturating).
pub fn to_compact_fee_base(fee_base: Amount) -> u64 {
    u64::try_from(fee_base / FEE_BASE_COMPACT_UNIT).unwrap_or(u64::MAX)
}

/// Convert a compact fee base into full precision.
pub fn from_compact_fee_base(compact: u64) -> Amount {
    (compact as Amount).saturating_mul(FEE_BASE_COMPACT_UNIT)
}

/// Scale `fee_base` by how the elapsed time `now - last` compares to the
/// average `avg_ms`, returning `(adjusted, latency_bps)`.
///
/// Latency is measured past a grace period and saturates at 10000 bps.
/// Proposals get cheaper the longer the chain has been idle; proof rewards
/// grow with latency (the proposer's deposit refund shrinks by the same bps).
pub fn time_adjusted_fee(
    config: &ProtocolConfig,
    fee_base: Amount,
    is_proposal: bool,
    now: Timestamp,
    last: Timestamp,
    avg_ms: u64,
    cap_secs: u64,
) -> (Amount, u64) {
    if avg_ms == 0 {
        return (fee_base, 0);
    }

    let t_avg = avg_ms.min(cap_secs.saturating_mul(TIME_PRECISION)) as u128;
    let grace = config.fee_grace_period_pct as u128 * t_avg / 100;
    let max = config.fee_max_period_pct as u128 * t_avg / 100;

    let now_ms = now as u128 * TIME_PRECISION as u128;
    let start_ms = last as u128 * TIME_PRECISION as u128 + grace;
    let elapsed = now_ms.saturating_sub(start_ms);

    let latency_bps = if max == 0 {
        if elapsed > 0 {
            BPS_DENOMINATOR
        } else {
            0
        }
    } else {
        (elapsed.min(max) * BPS_DENOMINATOR as u128 / max) as u64
    };

    let alpha = BPS_DENOMINATOR as u128
        + (config.reward_multiplier_pct.saturating_sub(100) as u128) * latency_bps as u128 / 100;

    let adjusted = if is_proposal {
        fee_base.saturating_mul(BPS_DENOMINATOR as u128) / alpha
    } else {
        fee_base.saturating_mul(alpha) / BPS_DENOMINATOR as u128
    };
    (adjusted, latency_bps)
}

/// Scale `fee_base` up as the pending ring fills.
///
/// With `m = 1000 (capacity - 1) + slot_smoothing` and `n = 1000 pending`,
/// the fee is `fee_base (m - 1000) m / (m - n) / k` where `k` is
/// `m - n - 1000` for proposals and `m - n + 1000` for proofs.
pub fn slots_adjusted_fee(
    config: &ProtocolConfig,
    snapshot: &TokenomicsSnapshot,
    is_proposal: bool,
    fee_base: Amount,
) -> Amount {
    let scale = SLOT_SCALE as u128;
    let m = scale * (config.max_pending_blocks as u128 - 1) + config.slot_smoothing as u128;
    let n = scale * snapshot.pending_count() as u128;
    let free = m.saturating_sub(n).max(1);
    let k = if is_proposal {
        free.saturating_sub(scale)
    } else {
        free + scale
    }
    .max(1);

    fee_base.saturating_mul(m - scale).saturating_mul(m) / free / k
}

/// Apply the bootstrap discount, which halves every
/// `bootstrap_discount_halving_period` seconds after genesis.
pub fn bootstrap_discounted_fee(
    config: &ProtocolConfig,
    snapshot: &TokenomicsSnapshot,
    now: Timestamp,
    fee: Amount,
) -> Amount {
    let period = config.bootstrap_discount_halving_period;
    if period == 0 {
        return fee;
    }
    let halves = now.saturating_sub(snapshot.genesis_timestamp) / period;
    let remaining = if halves >= 11 {
        0
    } else {
        BOOTSTRAP_DISCOUNT_SCALE >> halves
    };
    fee.saturating_mul(BOOTSTRAP_DISCOUNT_SCALE - remaining) / BOOTSTRAP_DISCOUNT_SCALE
}

/// Price a proposal made at `now`: `(new_fee_base, fee, deposit)`.
pub fn block_fee(
    config: &ProtocolConfig,
    snapshot: &TokenomicsSnapshot,
    now: Timestamp,
) -> (Amount, Amount, Amount) {
    let (new_fee_base, _) = time_adjusted_fee(
        config,
        snapshot.fee_base,
        true,
        now,
        snapshot.last_proposed_at,
        snapshot.avg_block_time,
        config.block_time_cap,
    );
    let fee = slots_adjusted_fee(config, snapshot, true, new_fee_base);
    let fee = bootstrap_discounted_fee(config, snapshot, now, fee);
    let deposit = fee.saturating_mul(config.proposer_deposit_pct as u128) / 100;
    (new_fee_base, fee, deposit)
}

/// Price a proof: `(new_fee_base, reward, latency_bps)`, with the configured
/// burn already taken out of `reward`.
pub fn proof_reward(
    config: &ProtocolConfig,
    snapshot: &TokenomicsSnapshot,
    proven_at: Timestamp,
    proposed_at: Timestamp,
) -> (Amount, Amount, u64) {
    let (new_fee_base, latency_bps) = time_adjusted_fee(
        config,
        snapshot.fee_base,
        false,
        proven_at,
        proposed_at,
        snapshot.avg_proof_time,
        config.proof_time_cap,
    );
    let reward = slots_adjusted_fee(config, snapshot, false, new_fee_base);
    let burn_bps = config.reward_burn_bps.min(BPS_DENOMINATOR) as u128;
    let reward = reward * (BPS_DENOMINATOR as u128 - burn_bps) / BPS_DENOMINATOR as u128;
    (new_fee_base, reward, latency_bps)
}

/// Portion of `deposit` returned to a proposer whose block was proven with
/// `latency_bps` of latency.
pub fn deposit_refund(deposit: Amount, latency_bps: u64) -> Amount {
    let kept = BPS_DENOMINATOR.saturating_sub(latency_bps) as u128;
    deposit.saturating_mul(kept) / BPS_DENOMINATOR as u128
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(fee_base: Amount) -> TokenomicsSnapshot {
        TokenomicsSnapshot {
            fee_base,
            avg_block_time: 0,
            avg_proof_time: 0,
            last_proposed_at: 1_000,
            genesis_timestamp: 1_000,
            next_block_id: 1,
            latest_verified_id: 0,
        }
    }

    fn config() -> ProtocolConfig {
        ProtocolConfig {
            max_pending_blocks: 10,
            slot_smoothing: 4_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_moving_average_basic() {
        assert_eq!(moving_average(0, 500, 8), 500);
        assert_eq!(moving_average(100, 500, 1), 500);
        // 100 + 400 / 4
        assert_eq!(moving_average(100, 500, 4), 200);
        // 500 - 400 / 4
        assert_eq!(moving_average(500, 100, 4), 400);
    }

    #[test]
    fn test_moving_average_zero_smoothing_is_clamped() {
        assert_eq!(moving_average(100, 500, 0), 500);
    }

    #[test]
    fn test_compact_fee_base_conversion() {
        assert_eq!(from_compact_fee_base(3), 3 * FEE_BASE_COMPACT_UNIT);
        assert_eq!(to_compact_fee_base(3 * FEE_BASE_COMPACT_UNIT + 7), 3);
        assert_eq!(to_compact_fee_base(Amount::MAX), u64::MAX);
    }

    #[test]
    fn test_time_adjusted_fee_without_history() {
        let cfg = config();
        assert_eq!(
            time_adjusted_fee(&cfg, 1_000, true, 5_000, 1_000, 0, 60),
            (1_000, 0)
        );
    }

    #[test]
    fn test_time_adjusted_fee_within_grace() {
        let cfg = config();
        // avg 10s, grace 12.5s: a proposal 10s after the last one pays the base fee
        let (fee, latency) = time_adjusted_fee(&cfg, 1_000_000, true, 1_010, 1_000, 10_000, 60);
        assert_eq!(latency, 0);
        assert_eq!(fee, 1_000_000);
    }

    #[test]
    fn test_time_adjusted_fee_saturates() {
        let cfg = config();
        // avg 10s: grace 12.5s, max 37.5s; 100s elapsed is past both
        let (fee, latency) = time_adjusted_fee(&cfg, 1_000_000, true, 1_100, 1_000, 10_000, 60);
        assert_eq!(latency, 10_000);
        // alpha = 10000 + 300 * 100 = 40000
        assert_eq!(fee, 250_000);

        let (reward, latency) =
            time_adjusted_fee(&cfg, 1_000_000, false, 1_100, 1_000, 10_000, 60);
        assert_eq!(latency, 10_000);
        assert_eq!(reward, 4_000_000);
    }

    #[test]
    fn test_time_adjusted_fee_respects_cap() {
        let cfg = config();
        // avg 1000s capped to 10s behaves like avg 10s
        let capped = time_adjusted_fee(&cfg, 1_000_000, true, 1_100, 1_000, 1_000_000, 10);
        let plain = time_adjusted_fee(&cfg, 1_000_000, true, 1_100, 1_000, 10_000, 60);
        assert_eq!(capped, plain);
    }

    #[test]
    fn test_slots_adjusted_fee_grows_with_occupancy() {
        let cfg = config();
        let mut snap = snapshot(1_000_000);
        let empty = slots_adjusted_fee(&cfg, &snap, true, 1_000_000);
        snap.next_block_id = 6;
        let busy = slots_adjusted_fee(&cfg, &snap, true, 1_000_000);
        assert!(busy > empty);
    }

    #[test]
    fn test_slots_adjusted_fee_empty_ring() {
        let cfg = config();
        let snap = snapshot(1_000_000);
        // m = 9000 + 4000 = 13000, n = 0:
        // proposal: 1e6 * 12000 * 13000 / 13000 / 12000 = 1e6
        assert_eq!(slots_adjusted_fee(&cfg, &snap, true, 1_000_000), 1_000_000);
        // proof: 1e6 * 12000 * 13000 / 13000 / 14000
        assert_eq!(
            slots_adjusted_fee(&cfg, &snap, false, 1_000_000),
            1_000_000u128 * 12_000 / 14_000
        );
    }

    #[test]
    fn test_slots_adjusted_fee_full_ring_does_not_divide_by_zero() {
        let cfg = ProtocolConfig {
            max_pending_blocks: 4,
            slot_smoothing: 1,
            ..Default::default()
        };
        let mut snap = snapshot(1_000);
        snap.next_block_id = 4;
        assert!(slots_adjusted_fee(&cfg, &snap, true, 1_000) > 0);
    }

    #[test]
    fn test_bootstrap_discount_fades() {
        let cfg = ProtocolConfig {
            bootstrap_discount_halving_period: 100,
            ..config()
        };
        let snap = snapshot(0);
        assert_eq!(bootstrap_discounted_fee(&cfg, &snap, 1_000, 1_024), 0);
        assert_eq!(bootstrap_discounted_fee(&cfg, &snap, 1_100, 1_024), 512);
        assert_eq!(bootstrap_discounted_fee(&cfg, &snap, 1_200, 1_024), 768);
        assert_eq!(bootstrap_discounted_fee(&cfg, &snap, 1_000_000, 1_024), 1_024);
    }

    #[test]
    fn test_bootstrap_discount_disabled() {
        let cfg = config();
        let snap = snapshot(0);
        assert_eq!(bootstrap_discounted_fee(&cfg, &snap, 1_000, 777), 777);
    }

    #[test]
    fn test_block_fee_deposit_share() {
        let cfg = config();
        let snap = snapshot(1_000_000);
        let (new_fee_base, fee, deposit) = block_fee(&cfg, &snap, 1_010);
        assert_eq!(new_fee_base, 1_000_000);
        assert_eq!(fee, 1_000_000);
        assert_eq!(deposit, 250_000);
    }

    #[test]
    fn test_proof_reward_burn() {
        let cfg = ProtocolConfig {
            reward_burn_bps: 10_000,
            ..config()
        };
        let snap = snapshot(1_000_000);
        let (_, reward, _) = proof_reward(&cfg, &snap, 1_100, 1_000);
        assert_eq!(reward, 0);
    }

    #[test]
    fn test_deposit_refund_bounds() {
        assert_eq!(deposit_refund(1_000, 0), 1_000);
        assert_eq!(deposit_refund(1_000, 10_000), 0);
        assert_eq!(deposit_refund(1_000, 2_500), 750);
    }

    proptest! {
        #[test]
        fn prop_moving_average_adopts_first_sample(v in any::<u64>(), s in 1u64..10_000) {
            prop_assert_eq!(moving_average(0, v as u128, s), v as u128);
        }

        #[test]
        fn prop_moving_average_unit_smoothing(m in any::<u64>(), v in any::<u64>()) {
            prop_assert_eq!(moving_average(m as u128, v as u128, 1), v as u128);
        }

        #[test]
        fn prop_moving_average_stays_between(
            m in 1u64..u64::MAX,
            v in any::<u64>(),
            s in 1u64..10_000,
        ) {
            let (m, v) = (m as u128, v as u128);
            let avg = moving_average(m, v, s);
            prop_assert!(avg >= m.min(v) && avg <= m.max(v));
        }
    }
}
