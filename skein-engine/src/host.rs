//! Collaborators the engine consumes but does not own.

use skein_types::error::ProtocolError;
use skein_types::event::ProtocolEvent;
use skein_types::primitives::*;

/// The host environment of a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Account invoking the operation.
    pub caller: Address,
    /// Host timestamp of the call.
    pub timestamp: Timestamp,
    /// Number of the host block executing the call.
    pub block_number: u64,
    /// Hash of the previous host block.
    pub parent_hash: Hash,
    /// Latest randomness beacon exposed by the host.
    pub randomness: Hash,
}

impl HostContext {
    /// Height of the host block a proposal is built on.
    pub fn parent_height(&self) -> u64 {
        self.block_number.saturating_sub(1)
    }
}

/// Name-to-address resolution.
pub trait AddressResolver {
    /// Resolve `name`. A missing name yields [`ZERO_ADDRESS`] when `allow_missing`
    /// is set and [`ProtocolError::ResolveFailed`] otherwise.
    fn resolve(&self, name: &str, allow_missing: bool) -> Result<Address, ProtocolError>;
}

/// The fungible-token ledger paying provers and holding withdrawn balances.
pub trait TokenLedger {
    fn balance_of(&self, token: &Address, account: &Address) -> Amount;

    /// Increase `account`'s balance. Minting has no cap and always succeeds.
    fn mint(&mut self, token: &Address, account: &Address, amount: Amount);

    /// Decrease `account`'s balance, failing with `InsufficientTokens` if it
    /// holds less than `amount`.
    fn burn(
        &mut self,
        token: &Address,
        account: &Address,
        amount: Amount,
    ) -> Result<(), ProtocolError>;
}

/// Receiver of notifications, invoked only after the owning mutation committed.
pub trait EventSink {
    fn emit(&mut self, event: ProtocolEvent);
}

impl EventSink for Vec<ProtocolEvent> {
    fn emit(&mut self, event: ProtocolEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: ProtocolEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_height_saturates() {
        let mut ctx = HostContext {
            caller: [1u8; 20],
            timestamp: 0,
            block_number: 0,
            parent_hash: [0u8; 32],
            randomness: [0u8; 32],
        };
        assert_eq!(ctx.parent_height(), 0);
        ctx.block_number = 10;
        assert_eq!(ctx.parent_height(), 9);
    }

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<ProtocolEvent> = Vec::new();
        sink.emit(ProtocolEvent::HeaderSynced {
            height: 0,
            hash: [1u8; 32],
        });
        sink.emit(ProtocolEvent::BlockVerified {
            id: 1,
            block_hash: [2u8; 32],
        });
        assert_eq!(sink.len(), 2);
        assert!(matches!(sink[0], ProtocolEvent::HeaderSynced { height: 0, .. }));
    }
}
