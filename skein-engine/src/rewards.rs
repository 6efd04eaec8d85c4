//! Splitting a proof reward between the provers of one fork choice.

use skein_crypto::hash::{blake3_hash_domain_multi, PROVER_DRAW_DOMAIN};
use skein_types::config::ProtocolConfig;
use skein_types::constants::BPS_DENOMINATOR;
use skein_types::primitives::*;

/// Largest geometric-decay exponent; weights of later provers bottom out at 1.
const MAX_DECAY_EXPONENT: usize = 64;

/// Pseudo-random 16-bit draw for the prover at `index`.
fn draw(seed: &Hash, index: usize) -> u128 {
    let h = blake3_hash_domain_multi(
        PROVER_DRAW_DOMAIN,
        &[seed.as_slice(), &(index as u64).to_le_bytes()],
    );
    u16::from_le_bytes([h[0], h[1]]) as u128
}

/// Basis-point weights for `num_provers` provers ordered by submission priority.
///
/// `prover_randomized_pct` (clamped to 100) of the total is split in proportion
/// to seeded random draws; the rest follows geometric decay `2^(n-1) .. 2^0`
/// so earlier provers earn more. Rounding dust goes to the first prover, so
/// the weights always total exactly 10000.
pub fn prover_reward_weights(
    config: &ProtocolConfig,
    num_provers: usize,
    seed: &Hash,
) -> Vec<u64> {
    if num_provers == 0 {
        return Vec::new();
    }
    let randomized = config.prover_randomized_pct.min(100) as u128;
    let mut weights = vec![0u128; num_provers];

    if randomized > 0 {
        let mut draws: Vec<u128> = (0..num_provers).map(|i| draw(seed, i)).collect();
        let mut sum: u128 = draws.iter().sum();
        if sum == 0 {
            draws = vec![1; num_provers];
            sum = num_provers as u128;
        }
        for (weight, value) in weights.iter_mut().zip(&draws) {
            *weight += value * 100 * randomized / sum;
        }
    }

    if randomized < 100 {
        let fixed = 100 - randomized;
        let terms: Vec<u128> = (0..num_provers)
            .map(|i| 1u128 << (num_provers - 1 - i).min(MAX_DECAY_EXPONENT))
            .collect();
        let sum: u128 = terms.iter().sum();
        for (weight, term) in weights.iter_mut().zip(&terms) {
            *weight += term * 100 * fixed / sum;
        }
    }

    let total: u128 = weights.iter().sum();
    weights[0] += BPS_DENOMINATOR as u128 - total;
    weights.into_iter().map(|w| w as u64).collect()
}

/// Split `reward` by `weights`; the truncation remainder goes to the first share.
pub fn split_reward(reward: Amount, weights: &[u64]) -> Vec<Amount> {
    if weights.is_empty() {
        return Vec::new();
    }
    let mut shares: Vec<Amount> = weights
        .iter()
        .map(|w| reward.saturating_mul(*w as Amount) / BPS_DENOMINATOR as Amount)
        .collect();
    let paid: Amount = shares.iter().sum();
    shares[0] += reward.saturating_sub(paid);
    shares
}
