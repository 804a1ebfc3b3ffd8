// ─────────────────────────────────────────────────────────────────
// Staking lifecycle hooks
// ─────────────────────────────────────────────────────────────────
// The staking side calls these synchronously. The "before" hooks run
// while the staking state still holds the old stake, which is what the
// period being closed was earned against.
// ─────────────────────────────────────────────────────────────────

use log::debug;

use distr_math::Dec;

use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::{store, Keeper};
use crate::types::Validator;

pub trait StakingHooks {
    fn after_validator_created(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()>;

    fn before_validator_modified(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()>;

    fn after_validator_removed(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()>;

    fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()>;

    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()>;

    fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()>;

    fn before_delegation_removed(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()>;

    fn before_validator_slashed(
        &self,
        ctx: &mut Context<'_>,
        val: &Address,
        fraction: &Dec,
    ) -> Result<()>;
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    fn hook_validator(&self, ctx: &Context<'_>, val: &Address) -> Result<Validator> {
        self.staking()
            .validator(ctx, val)?
            .ok_or_else(|| DistrError::NoValidatorExists(val.to_hex()))
    }
}

impl<B: BankKeeper, S: StakingKeeper> StakingHooks for Keeper<B, S> {
    fn after_validator_created(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()> {
        self.initialize_validator(ctx, val)
    }

    fn before_validator_modified(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()> {
        let validator = self.hook_validator(ctx, val)?;
        self.increment_validator_period(ctx, &validator)?;
        Ok(())
    }

    fn after_validator_removed(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()> {
        self.remove_validator_state(ctx, val)
    }

    fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        _del: &Address,
        val: &Address,
    ) -> Result<()> {
        let validator = self.hook_validator(ctx, val)?;
        self.increment_validator_period(ctx, &validator)?;
        Ok(())
    }

    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()> {
        let validator = self.hook_validator(ctx, val)?;
        let delegation = self
            .staking()
            .delegation(ctx, del, val)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;
        self.withdraw_delegation_rewards_for(ctx, &validator, &delegation)?;
        Ok(())
    }

    fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()> {
        self.initialize_delegation(ctx, val, del)
    }

    fn before_delegation_removed(
        &self,
        ctx: &mut Context<'_>,
        del: &Address,
        val: &Address,
    ) -> Result<()> {
        if !store::has_starting_info(ctx, val, del)? {
            debug!("delegation {} -> {} already settled", del, val);
            return Ok(());
        }
        self.before_delegation_shares_modified(ctx, del, val)
    }

    fn before_validator_slashed(
        &self,
        ctx: &mut Context<'_>,
        val: &Address,
        fraction: &Dec,
    ) -> Result<()> {
        self.update_validator_slash_fraction(ctx, val, fraction)
    }
}
