/// 32-byte hash (BLAKE3 for everything the engine computes itself).
pub type Hash = [u8; 32];

/// 20-byte account address.
pub type Address = [u8; 20];

/// Amount of tokens in base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Sequential identifier of a proposed block (genesis is 0, first proposal is 1).
pub type BlockId = u64;

/// Height on the canonical chain.
pub type Height = u64;

/// The all-zero hash. In a fork choice it means "not yet proven".
pub const ZERO_HASH: Hash = [0u8; 32];

/// Sentinel block hash marking a block proven invalid or empty.
/// Such a block is verified but does not advance the canonical height.
pub const DEAD_END_HASH: Hash = [0xffu8; 32];

/// The all-zero address, used for "unset".
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Serde helper for `Hash` fields rendered as lowercase hex strings.
pub mod serde_hash_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_hash_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a 64-character hex string (optional `0x` prefix) into a hash.
pub fn parse_hash_hex(s: &str) -> Result<Hash, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 32];
    hex::decode_to_slice(s, &mut out).map_err(|e| format!("invalid hash hex: {e}"))?;
    Ok(out)
}

/// Parse a 40-character hex string (optional `0x` prefix) into an address.
pub fn parse_address_hex(s: &str) -> Result<Address, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 20];
    hex::decode_to_slice(s, &mut out).map_err(|e| format!("invalid address hex: {e}"))?;
    Ok(out)
}
