//! Block lifecycle engine for the Skein rollup protocol.
//!
//! Admits block proposals into a bounded pending ring, prices them with
//! moving-average tokenomics, and verifies them in strict order against
//! fork-choice proofs, paying provers and refunding proposer deposits.

pub mod balances;
pub mod commitment;
pub mod host;
pub mod memory;
pub mod proposing;
pub mod rewards;
pub mod state;
pub mod tokenomics;
pub mod verifying;

#[cfg(test)]
mod testing;

pub use host::{AddressResolver, EventSink, HostContext, TokenLedger};
pub use state::State;
