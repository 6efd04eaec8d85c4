//! Moving tokens between the external ledger and internal proposer balances.

use skein_types::config::ProtocolConfig;
use skein_types::error::ProtocolError;
use skein_types::primitives::*;

use crate::host::{AddressResolver, HostContext, TokenLedger};
use crate::state::State;

/// Burn `amount` of the caller's ledger tokens and credit it internally,
/// where proposal fees and deposits are drawn from.
pub fn deposit_balance<R, L>(
    state: &mut State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    resolver: &R,
    ledger: &mut L,
    amount: Amount,
) -> Result<Amount, ProtocolError>
where
    R: AddressResolver + ?Sized,
    L: TokenLedger + ?Sized,
{
    state.ensure_live()?;
    let token = resolver.resolve(&config.token_name, false)?;
    let balance = state
        .balance_of(&ctx.caller)
        .checked_add(amount)
        .ok_or(ProtocolError::Overflow)?;

    ledger.burn(&token, &ctx.caller, amount)?;
    state.balances.insert(ctx.caller, balance);

    tracing::debug!(account = ?ctx.caller, amount, balance, "balance deposited");
    Ok(balance)
}

/// Mint the caller's whole internal balance back to the ledger. Returns the
/// amount withdrawn; withdrawing an empty balance is a no-op.
pub fn withdraw_balance<R, L>(
    state: &mut State,
    config: &ProtocolConfig,
    ctx: &HostContext,
    resolver: &R,
    ledger: &mut L,
) -> Result<Amount, ProtocolError>
where
    R: AddressResolver + ?Sized,
    L: TokenLedger + ?Sized,
{
    state.ensure_live()?;
    let token = resolver.resolve(&config.token_name, false)?;
    let amount = state.balances.remove(&ctx.caller).unwrap_or(0);
    if amount > 0 {
        ledger.mint(&token, &ctx.caller, amount);
        tracing::debug!(account = ?ctx.caller, amount, "balance withdrawn");
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticResolver;
    use crate::testing::*;

    #[test]
    fn test_deposit_moves_tokens_inside() {
        let mut h = Harness::new(paid_config());
        h.ledger.mint(&TOKEN, &PROPOSER, 500);
        let ctx = context(PROPOSER, 1_010);

        let balance =
            deposit_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger, 300)
                .unwrap();
        assert_eq!(balance, 300);
        assert_eq!(h.state.balance_of(&PROPOSER), 300);
        assert_eq!(h.ledger.balance_of(&TOKEN, &PROPOSER), 200);
        assert_eq!(h.ledger.total_burned(), 300);
    }

    #[test]
    fn test_deposit_without_tokens_fails() {
        let mut h = Harness::new(paid_config());
        h.ledger.mint(&TOKEN, &PROPOSER, 10);
        let ctx = context(PROPOSER, 1_010);

        let err = deposit_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger, 11)
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InsufficientTokens {
                available: 10,
                requested: 11
            }
        );
        assert_eq!(h.state.balance_of(&PROPOSER), 0);
        assert_eq!(h.ledger.balance_of(&TOKEN, &PROPOSER), 10);
    }

    #[test]
    fn test_deposit_overflow_burns_nothing() {
        let mut h = Harness::new(paid_config());
        h.state.seed_balances([(PROPOSER, Amount::MAX)]);
        h.ledger.mint(&TOKEN, &PROPOSER, 10);
        let ctx = context(PROPOSER, 1_010);

        let err = deposit_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger, 1)
            .unwrap_err();
        assert_eq!(err, ProtocolError::Overflow);
        assert_eq!(h.ledger.balance_of(&TOKEN, &PROPOSER), 10);
    }

    #[test]
    fn test_withdraw_returns_everything() {
        let mut h = Harness::new(paid_config());
        h.state.seed_balances([(PROPOSER, 42)]);
        let ctx = context(PROPOSER, 1_010);

        let amount =
            withdraw_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger).unwrap();
        assert_eq!(amount, 42);
        assert_eq!(h.state.balance_of(&PROPOSER), 0);
        assert_eq!(h.ledger.balance_of(&TOKEN, &PROPOSER), 42);

        let amount =
            withdraw_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger).unwrap();
        assert_eq!(amount, 0);
    }

    #[test]
    fn test_unresolved_token_fails() {
        let mut h = Harness::new(paid_config());
        h.state.seed_balances([(PROPOSER, 42)]);
        let ctx = context(PROPOSER, 1_010);
        let err = withdraw_balance(
            &mut h.state,
            &h.config,
            &ctx,
            &StaticResolver::new(),
            &mut h.ledger,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::ResolveFailed { .. }));
        assert_eq!(h.state.balance_of(&PROPOSER), 42);
    }

    #[test]
    fn test_halted_blocks_balance_moves() {
        let mut h = Harness::new(paid_config());
        crate::state::set_halted(&mut h.state, true);
        let ctx = context(PROPOSER, 1_010);
        assert_eq!(
            withdraw_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger),
            Err(ProtocolError::HaltedProtocol)
        );
        assert_eq!(
            deposit_balance(&mut h.state, &h.config, &ctx, &h.resolver, &mut h.ledger, 1),
            Err(ProtocolError::HaltedProtocol)
        );
    }
}
