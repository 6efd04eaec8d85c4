//! Block metadata commitments and the reward seed derived from them.

use skein_crypto::hash::{
    blake3_hash_domain, blake3_hash_domain_multi, METADATA_DOMAIN, REWARD_SEED_DOMAIN,
};
use skein_types::block::BlockMetadata;
use skein_types::primitives::Hash;

/// Canonical encoding of block metadata:
/// `id(8) || parent_height(8) || parent_hash(32) || beneficiary(20) ||
///  tx_list_hash(32) || mix_seed(32) || gas_limit(8) || timestamp(8)`,
/// integers little-endian.
pub fn metadata_encoding(meta: &BlockMetadata) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 8 + 32 + 20 + 32 + 32 + 8 + 8);
    bytes.extend_from_slice(&meta.id.to_le_bytes());
    bytes.extend_from_slice(&meta.parent_height.to_le_bytes());
    bytes.extend_from_slice(&meta.parent_hash);
    bytes.extend_from_slice(&meta.beneficiary);
    bytes.extend_from_slice(&meta.tx_list_hash);
    bytes.extend_from_slice(&meta.mix_seed);
    bytes.extend_from_slice(&meta.gas_limit.to_le_bytes());
    bytes.extend_from_slice(&meta.timestamp.to_le_bytes());
    bytes
}

/// Commitment hash of block metadata, returned to the proposer and stored in
/// the pending ring.
pub fn metadata_hash(meta: &BlockMetadata) -> Hash {
    blake3_hash_domain(METADATA_DOMAIN, &metadata_encoding(meta))
}

/// Seed for splitting a block's reward, bound to the verifying call's
/// randomness and the block's commitment.
pub fn reward_seed(randomness: &Hash, metadata_hash: &Hash) -> Hash {
    blake3_hash_domain_multi(
        REWARD_SEED_DOMAIN,
        &[randomness.as_slice(), metadata_hash.as_slice()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_meta() -> BlockMetadata {
        BlockMetadata {
            id: 1,
            parent_height: 10,
            parent_hash: [1u8; 32],
            beneficiary: [2u8; 20],
            tx_list_hash: [3u8; 32],
            mix_seed: [4u8; 32],
            gas_limit: 21_000,
            timestamp: 1_000,
        }
    }

    #[test]
    fn test_metadata_hash_deterministic() {
        assert_eq!(metadata_hash(&make_meta()), metadata_hash(&make_meta()));
    }

    #[test]
    fn test_reward_seed_binds_randomness_and_commitment() {
        let commitment = metadata_hash(&make_meta());
        let seed = reward_seed(&[9u8; 32], &commitment);
        assert_ne!(seed, reward_seed(&[8u8; 32], &commitment));

        let mut meta = make_meta();
        meta.mix_seed[0] ^= 1;
        assert_ne!(seed, reward_seed(&[9u8; 32], &metadata_hash(&meta)));
    }

    #[test]
    fn test_metadata_encoding_length() {
        assert_eq!(metadata_encoding(&make_meta()).len(), 148);
    }

    #[test]
    fn test_metadata_hash_changes_on_any_field() {
        let base = metadata_hash(&make_meta());
        let mutations: Vec<fn(&mut BlockMetadata)> = vec![
            |m: &mut BlockMetadata| m.id += 1,
            |m: &mut BlockMetadata| m.parent_height += 1,
            |m: &mut BlockMetadata| m.parent_hash[0] ^= 1,
            |m: &mut BlockMetadata| m.beneficiary[0] ^= 1,
            |m: &mut BlockMetadata| m.tx_list_hash[0] ^= 1,
            |m: &mut BlockMetadata| m.mix_seed[0] ^= 1,
            |m: &mut BlockMetadata| m.gas_limit += 1,
            |m: &mut BlockMetadata| m.timestamp += 1,
        ];
        for mutate in mutations {
            let mut meta = make_meta();
            mutate(&mut meta);
            assert_ne!(metadata_hash(&meta), base);
        }
    }
}
