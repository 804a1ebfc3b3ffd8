// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// F1 DISTRIBUTION - KEEPER
//
// Entry point for every state transition of the distribution module.
//   validator.rs  — period accounting, reference counts, slash recording
//   delegation.rs — reward calculation and withdrawal (incl. tokenized shares)
//   allocation.rs — per-block fee allocation
//   store.rs      — typed accessors over the key layout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod allocation;
pub mod delegation;
pub mod store;
pub mod validator;

use log::info;

use distr_math::{Coins, DecCoins};

use crate::address::Address;
use crate::config::DistributionConfig;
use crate::context::{events, Context, Event};
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::types::{FeePool, Params, ValidatorOutstandingRewards};
use crate::MODULE_NAME;

pub struct Keeper<B, S> {
    bank: B,
    staking: S,
    authority: Address,
    fee_collector: String,
    bond_denom: String,
    blocked: Vec<Address>,
    genesis_params: Params,
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    pub fn new(bank: B, staking: S, config: &DistributionConfig) -> Result<Self> {
        config.validate().map_err(DistrError::InvalidParams)?;
        Ok(Self {
            bank,
            staking,
            authority: config.authority_address().map_err(DistrError::InvalidAddress)?,
            fee_collector: config.fee_collector.clone(),
            bond_denom: config.bond_denom.clone(),
            blocked: config.blocked_address_list().map_err(DistrError::InvalidAddress)?,
            genesis_params: config.params.clone(),
        })
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn staking(&self) -> &S {
        &self.staking
    }

    pub fn authority(&self) -> &Address {
        &self.authority
    }

    pub fn bond_denom(&self) -> &str {
        &self.bond_denom
    }

    pub fn fee_collector_name(&self) -> &str {
        &self.fee_collector
    }

    /// Account holding every coin the module has not paid out yet.
    pub fn module_address() -> Address {
        Address::module(MODULE_NAME)
    }

    /// Write the empty fee pool and genesis params unless already present.
    pub fn initialize(&self, ctx: &mut Context<'_>) -> Result<()> {
        if !store::has_fee_pool(ctx)? {
            store::set_fee_pool(ctx, &FeePool::default())?;
        }
        if !store::has_params(ctx)? {
            store::set_params(ctx, &self.genesis_params)?;
            info!(
                "distribution initialized: community_tax={} withdraw_addr_enabled={}",
                self.genesis_params.community_tax, self.genesis_params.withdraw_addr_enabled
            );
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Params
    // ─────────────────────────────────────────────────────────────────

    pub fn get_params(&self, ctx: &Context<'_>) -> Result<Params> {
        store::get_params(ctx)
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &Params) -> Result<()> {
        params.validate()?;
        store::set_params(ctx, params)
    }

    /// Governance-gated params update. A community tax of exactly 1 is
    /// refused here even though stored params may carry it.
    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &Address,
        params: &Params,
    ) -> Result<()> {
        self.check_authority(authority)?;
        if !params.base_proposer_reward.is_zero() || !params.bonus_proposer_reward.is_zero() {
            return Err(DistrError::InvalidParams(
                "cannot update base or bonus proposer reward because these are deprecated fields"
                    .into(),
            ));
        }
        if params.community_tax >= distr_math::Dec::one() {
            return Err(DistrError::InvalidParams(format!(
                "community tax must be within [0, 1): {}",
                params.community_tax
            )));
        }
        self.set_params(ctx, params)?;
        ctx.emit(
            Event::new(events::UPDATE_PARAMS)
                .attr(events::ATTR_AUTHORITY, authority)
                .attr("community_tax", &params.community_tax)
                .attr("withdraw_addr_enabled", params.withdraw_addr_enabled),
        );
        info!("distribution params updated by {}", authority);
        Ok(())
    }

    pub(crate) fn check_authority(&self, authority: &Address) -> Result<()> {
        if authority != &self.authority {
            return Err(DistrError::Unauthorized {
                expected: self.authority.to_hex(),
                got: authority.to_hex(),
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Withdraw addresses
    // ─────────────────────────────────────────────────────────────────

    pub fn is_blocked(&self, addr: &Address) -> bool {
        self.bank.blocked_addr(addr) || self.blocked.contains(addr)
    }

    pub fn set_withdraw_addr(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        withdraw: &Address,
    ) -> Result<()> {
        if self.is_blocked(withdraw) {
            return Err(DistrError::BlockedAddress(withdraw.to_hex()));
        }
        if !store::get_params(ctx)?.withdraw_addr_enabled {
            return Err(DistrError::SetWithdrawAddrDisabled);
        }
        ctx.emit(
            Event::new(events::SET_WITHDRAW_ADDRESS)
                .attr(events::ATTR_DELEGATOR, delegator)
                .attr(events::ATTR_WITHDRAW_ADDRESS, withdraw),
        );
        if withdraw == delegator {
            return store::delete_withdraw_addr(ctx, delegator);
        }
        store::set_withdraw_addr(ctx, delegator, withdraw)
    }

    /// Payout address for `delegator` (the delegator itself unless overridden).
    pub fn get_delegator_withdraw_addr(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
    ) -> Result<Address> {
        Ok(store::get_withdraw_addr(ctx, delegator)?.unwrap_or_else(|| delegator.clone()))
    }

    // ─────────────────────────────────────────────────────────────────
    // Community pool
    // ─────────────────────────────────────────────────────────────────

    pub fn fund_community_pool(
        &self,
        ctx: &mut Context<'_>,
        amount: &Coins,
        depositor: &Address,
    ) -> Result<()> {
        self.bank
            .send_coins_from_account_to_module(ctx, depositor, MODULE_NAME, amount)?;
        let mut pool = store::get_fee_pool(ctx)?;
        pool.community_pool = pool.community_pool.add(&DecCoins::from_coins(amount));
        store::set_fee_pool(ctx, &pool)?;
        ctx.emit(
            Event::new(events::FUND_COMMUNITY_POOL)
                .attr(events::ATTR_DEPOSITOR, depositor)
                .attr(events::ATTR_AMOUNT, amount),
        );
        Ok(())
    }

    /// Pay `amount` out of the community pool to `recipient`.
    pub fn distribute_from_fee_pool(
        &self,
        ctx: &mut Context<'_>,
        amount: &Coins,
        recipient: &Address,
    ) -> Result<()> {
        if self.bank.blocked_addr(recipient) {
            return Err(DistrError::BlockedAddress(recipient.to_hex()));
        }
        let mut pool = store::get_fee_pool(ctx)?;
        pool.community_pool = pool
            .community_pool
            .checked_sub(&DecCoins::from_coins(amount))
            .ok_or(DistrError::InsufficientCommunityPool)?;
        store::set_fee_pool(ctx, &pool)?;
        self.bank
            .send_coins_from_module_to_account(ctx, MODULE_NAME, recipient, amount)?;
        ctx.emit(
            Event::new(events::COMMUNITY_POOL_SPEND)
                .attr(events::ATTR_RECIPIENT, recipient)
                .attr(events::ATTR_AMOUNT, amount),
        );
        info!("community pool spent {} to {}", amount, recipient);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Commission
    // ─────────────────────────────────────────────────────────────────

    /// Pay the integer part of the accumulated commission to the operator's
    /// withdraw address; the fractional remainder stays accumulated.
    pub fn withdraw_validator_commission(
        &self,
        ctx: &mut Context<'_>,
        validator: &Address,
    ) -> Result<Coins> {
        let mut accumulated = store::get_commission(ctx, validator)?;
        if accumulated.commission.is_zero() {
            return Err(DistrError::NoValidatorCommission);
        }

        let (commission, remainder) = accumulated.commission.truncate_decimal()?;
        accumulated.commission = remainder;
        store::set_commission(ctx, validator, &accumulated)?;

        let outstanding = store::get_outstanding_rewards(ctx, validator)?;
        let rewards = outstanding
            .rewards
            .checked_sub(&DecCoins::from_coins(&commission))
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "outstanding rewards of {} would go negative withdrawing commission {}",
                    validator, commission
                ))
            })?;
        store::set_outstanding_rewards(ctx, validator, &ValidatorOutstandingRewards { rewards })?;

        if !commission.is_zero() {
            let withdraw_addr = self.get_delegator_withdraw_addr(ctx, validator)?;
            self.bank
                .send_coins_from_module_to_account(ctx, MODULE_NAME, &withdraw_addr, &commission)?;
        }

        ctx.emit(
            Event::new(events::WITHDRAW_COMMISSION)
                .attr(events::ATTR_VALIDATOR, validator)
                .attr(events::ATTR_AMOUNT, &commission),
        );
        info!("validator {} withdrew commission {}", validator, commission);
        Ok(commission)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use distr_math::Dec;
    use distr_store::MemStore;

    #[test]
    fn test_initialize_is_idempotent() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let mut p = k.get_params(&ctx).unwrap();
        p.withdraw_addr_enabled = false;
        k.set_params(&mut ctx, &p).unwrap();
        k.initialize(&mut ctx).unwrap();
        assert!(!k.get_params(&ctx).unwrap().withdraw_addr_enabled);
    }

    #[test]
    fn test_set_withdraw_addr_rules() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let del = addr(1);
        let target = addr(2);
        assert_eq!(k.get_delegator_withdraw_addr(&ctx, &del).unwrap(), del);
        k.set_withdraw_addr(&mut ctx, &del, &target).unwrap();
        assert_eq!(k.get_delegator_withdraw_addr(&ctx, &del).unwrap(), target);

        let blocked = Keeper::<&MapBank, &MapStaking>::module_address();
        assert!(matches!(
            k.set_withdraw_addr(&mut ctx, &del, &blocked),
            Err(DistrError::BlockedAddress(_))
        ));

        let mut p = k.get_params(&ctx).unwrap();
        p.withdraw_addr_enabled = false;
        k.set_params(&mut ctx, &p).unwrap();
        assert!(matches!(
            k.set_withdraw_addr(&mut ctx, &del, &addr(3)),
            Err(DistrError::SetWithdrawAddrDisabled)
        ));
    }

    #[test]
    fn test_update_params_authority_and_bounds() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();
        let gov = k.authority().clone();

        let mut p = Params::default();
        assert!(matches!(
            k.update_params(&mut ctx, &addr(9), &p),
            Err(DistrError::Unauthorized { .. })
        ));
        p.community_tax = Dec::one();
        assert!(matches!(
            k.update_params(&mut ctx, &gov, &p),
            Err(DistrError::InvalidParams(_))
        ));
        p.community_tax = Dec::zero();
        p.bonus_proposer_reward = Dec::with_prec(1, 2);
        assert!(k.update_params(&mut ctx, &gov, &p).is_err());
        p.bonus_proposer_reward = Dec::zero();
        k.update_params(&mut ctx, &gov, &p).unwrap();
        assert_eq!(k.get_params(&ctx).unwrap().community_tax, Dec::zero());
    }

    #[test]
    fn test_community_pool_fund_and_spend() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let depositor = addr(1);
        bank.mint(&depositor, &Coins::single("stake", 100));
        k.fund_community_pool(&mut ctx, &Coins::single("stake", 60), &depositor)
            .unwrap();
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", Dec::from_u128(60))
        );

        let recipient = addr(2);
        assert!(matches!(
            k.distribute_from_fee_pool(&mut ctx, &Coins::single("stake", 61), &recipient),
            Err(DistrError::InsufficientCommunityPool)
        ));
        k.distribute_from_fee_pool(&mut ctx, &Coins::single("stake", 25), &recipient)
            .unwrap();
        assert_eq!(
            (&bank).get_all_balances(&ctx, &recipient).unwrap(),
            Coins::single("stake", 25)
        );
    }

    #[test]
    fn test_withdraw_commission_requires_commission() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();
        assert!(matches!(
            k.withdraw_validator_commission(&mut ctx, &addr(5)),
            Err(DistrError::NoValidatorCommission)
        ));
    }
}
