//! In-memory collaborators for embedding the engine and for tests.

use std::collections::BTreeMap;

use skein_types::error::ProtocolError;
use skein_types::primitives::*;

use crate::host::{AddressResolver, TokenLedger};

/// Token ledger backed by a BTreeMap keyed by `(token, account)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: BTreeMap<(Address, Address), Amount>,
    total_minted: Amount,
    total_burned: Amount,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total amount minted over the ledger's lifetime.
    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    /// Total amount burned over the ledger's lifetime.
    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        self.balances
            .get(&(*token, *account))
            .copied()
            .unwrap_or(0)
    }

    fn mint(&mut self, token: &Address, account: &Address, amount: Amount) {
        let entry = self.balances.entry((*token, *account)).or_insert(0);
        *entry = entry.saturating_add(amount);
        self.total_minted = self.total_minted.saturating_add(amount);
    }

    fn burn(
        &mut self,
        token: &Address,
        account: &Address,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        let available = self.balance_of(token, account);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(ProtocolError::InsufficientTokens {
                    available,
                    requested: amount,
                })?;
        if remaining == 0 {
            self.balances.remove(&(*token, *account));
        } else {
            self.balances.insert((*token, *account), remaining);
        }
        self.total_burned = self.total_burned.saturating_add(amount);
        Ok(())
    }
}

/// Resolver answering from a fixed name table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: BTreeMap<String, Address>,
}

impl StaticResolver {
    /// Create a new empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of a name.
    pub fn with(mut self, name: &str, address: Address) -> Self {
        self.register(name, address);
        self
    }

    /// Register or replace a name.
    pub fn register(&mut self, name: &str, address: Address) {
        self.names.insert(name.to_string(), address);
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self, name: &str, allow_missing: bool) -> Result<Address, ProtocolError> {
        match self.names.get(name) {
            Some(address) if *address != ZERO_ADDRESS => Ok(*address),
            _ if allow_missing => Ok(ZERO_ADDRESS),
            _ => Err(ProtocolError::ResolveFailed {
                name: name.to_string(),
            }),
        }
    }
}
