use skein_types::primitives::Hash;

/// Domain tag for block metadata commitments.
pub const METADATA_DOMAIN: &str = "skein 2024 block metadata v1";

/// Domain tag for per-block mix seeds.
pub const MIX_SEED_DOMAIN: &str = "skein 2024 mix seed v1";

/// Domain tag for transaction list hashes.
pub const TX_LIST_DOMAIN: &str = "skein 2024 tx list v1";

/// Domain tag for prover reward randomness.
pub const REWARD_SEED_DOMAIN: &str = "skein 2024 prover reward seed v1";

/// Domain tag for the per-prover draws taken from a reward seed.
pub const PROVER_DRAW_DOMAIN: &str = "skein 2024 prover reward draw v1";

/// Compute the BLAKE3 hash of the given data.
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute a BLAKE3 hash with domain separation.
/// The context string ensures different uses of hashing produce different outputs.
pub fn blake3_hash_domain(context: &str, data: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash multiple pieces of data together under a domain.
pub fn blake3_hash_domain_multi(context: &str, parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Hash a raw transaction list.
pub fn hash_tx_list(tx_list: &[u8]) -> Hash {
    blake3_hash_domain(TX_LIST_DOMAIN, tx_list)
}

/// Mix host randomness with a block id so that every proposal admitted
/// within one host step receives a distinct seed.
pub fn mix_seed(randomness: &Hash, block_id: u64) -> Hash {
    blake3_hash_domain_multi(MIX_SEED_DOMAIN, &[randomness.as_slice(), &block_id.to_le_bytes()])
}
