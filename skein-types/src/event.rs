use serde::{Deserialize, Serialize};

use crate::block::BlockMetadata;
use crate::primitives::*;

/// Notifications emitted after a state change has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// A block was admitted.
    BlockProposed { id: BlockId, meta: BlockMetadata },
    /// A block was verified with the given resulting hash (possibly the dead-end sentinel).
    BlockVerified {
        id: BlockId,
        #[serde(with = "crate::primitives::serde_hash_hex")]
        block_hash: Hash,
    },
    /// The canonical chain advanced to a new synced header.
    HeaderSynced {
        height: Height,
        #[serde(with = "crate::primitives::serde_hash_hex")]
        hash: Hash,
    },
}
