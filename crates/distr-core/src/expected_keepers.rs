// ─────────────────────────────────────────────────────────────────
// Collaborators the distribution engine depends on
// ─────────────────────────────────────────────────────────────────
// Both are handles without state of their own: everything they know
// lives in the Context's store, so a branch that rolls back rolls back
// balances and delegations together with distribution state.
// ─────────────────────────────────────────────────────────────────

use distr_math::Coins;

use crate::address::Address;
use crate::context::Context;
use crate::error::Result;
use crate::types::{Delegation, TokenizeShareRecord, Validator};

pub trait BankKeeper {
    fn get_all_balances(&self, ctx: &Context<'_>, addr: &Address) -> Result<Coins>;

    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()>;

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        to: &Address,
        amount: &Coins,
    ) -> Result<()> {
        self.send_coins(ctx, &Address::module(module), to, amount)
    }

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        module: &str,
        amount: &Coins,
    ) -> Result<()> {
        self.send_coins(ctx, from, &Address::module(module), amount)
    }

    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        amount: &Coins,
    ) -> Result<()> {
        self.send_coins(ctx, &Address::module(from), &Address::module(to), amount)
    }

    /// Module accounts and other addresses that must never receive funds
    /// through a user-chosen destination.
    fn blocked_addr(&self, addr: &Address) -> bool;
}

pub trait StakingKeeper {
    fn validator(&self, ctx: &Context<'_>, operator: &Address) -> Result<Option<Validator>>;

    fn validator_by_cons_addr(
        &self,
        ctx: &Context<'_>,
        cons: &Address,
    ) -> Result<Option<Validator>>;

    fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<Delegation>>;

    /// All validators, ordered by operator address.
    fn validators(&self, ctx: &Context<'_>) -> Result<Vec<Validator>>;

    /// All delegations of one delegator, ordered by validator address.
    fn delegator_delegations(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
    ) -> Result<Vec<Delegation>>;

    /// All delegations to one validator, ordered by delegator address.
    fn validator_delegations(
        &self,
        ctx: &Context<'_>,
        validator: &Address,
    ) -> Result<Vec<Delegation>>;

    fn tokenize_share_record(&self, ctx: &Context<'_>, id: u64)
        -> Result<Option<TokenizeShareRecord>>;

    fn tokenize_share_records_by_owner(
        &self,
        ctx: &Context<'_>,
        owner: &Address,
    ) -> Result<Vec<TokenizeShareRecord>>;
}
