// ─────────────────────────────────────────────────────────────────
// Fee allocation
// ─────────────────────────────────────────────────────────────────
// Once per block the fee collector is emptied into the distribution
// module. The community tax comes off the top; the rest is split across
// the previous block's signers by voting power, each share truncated.
// Whatever truncation leaves behind joins the community pool, so
//   Δcommunity_pool + Σ Δoutstanding = fees collected
// holds exactly.
// ─────────────────────────────────────────────────────────────────

use log::{debug, warn};

use distr_math::{Dec, DecCoins};

use super::{store, Keeper};
use crate::address::Address;
use crate::context::{events, Context, Event};
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::types::{Validator, VoteInfo};
use crate::MODULE_NAME;

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Allocate the collected fees to the validators in `votes`.
    /// `total_power` is the summed power of the votes that signed.
    pub fn allocate_tokens(
        &self,
        ctx: &mut Context<'_>,
        total_power: u64,
        votes: &[VoteInfo],
    ) -> Result<()> {
        let fee_collector = Address::module(self.fee_collector_name());
        let collected = self.bank().get_all_balances(ctx, &fee_collector)?;
        if collected.is_zero() {
            return Ok(());
        }
        self.bank().send_coins_from_module_to_module(
            ctx,
            self.fee_collector_name(),
            MODULE_NAME,
            &collected,
        )?;
        let fees = DecCoins::from_coins(&collected);

        let mut pool = store::get_fee_pool(ctx)?;
        if total_power == 0 {
            pool.community_pool = pool.community_pool.add(&fees);
            store::set_fee_pool(ctx, &pool)?;
            debug!("no signing power; {} to community pool", fees);
            return Ok(());
        }

        let community_tax = store::get_params(ctx)?.community_tax;
        let vote_multiplier = Dec::one() - community_tax;
        let fee_multiplier = fees.mul_dec_truncate(&vote_multiplier);

        let total = Dec::from_u128(u128::from(total_power));
        let mut remaining = fees.clone();
        for vote in votes.iter().filter(|v| v.signed_last_block) {
            let validator = match self.staking().validator_by_cons_addr(ctx, &vote.cons_address)? {
                Some(v) => v,
                None => {
                    warn!(
                        "skipping allocation to unknown validator with consensus address {}",
                        vote.cons_address
                    );
                    continue;
                }
            };

            let power_fraction = Dec::from_u128(u128::from(vote.power))
                .checked_quo_truncate(&total)
                .unwrap_or_default();
            let reward = fee_multiplier.mul_dec_truncate(&power_fraction);
            self.allocate_tokens_to_validator(ctx, &validator, &reward)?;
            remaining = remaining.checked_sub(&reward).ok_or_else(|| {
                DistrError::invariant(format!(
                    "allocated more than collected: {} of {}",
                    reward, remaining
                ))
            })?;
        }

        pool.community_pool = pool.community_pool.add(&remaining);
        store::set_fee_pool(ctx, &pool)?;
        debug!(
            "allocated {} at height {} ({} to community pool)",
            fees,
            ctx.height(),
            remaining
        );
        Ok(())
    }

    /// Split `tokens` between the validator's commission and its
    /// delegators' current-period rewards.
    pub fn allocate_tokens_to_validator(
        &self,
        ctx: &mut Context<'_>,
        val: &Validator,
        tokens: &DecCoins,
    ) -> Result<()> {
        let operator = &val.operator;
        let mut current = store::get_current_rewards(ctx, operator)?.ok_or_else(|| {
            DistrError::invariant(format!("no current rewards for validator {}", operator))
        })?;
        let commission = tokens.mul_dec(&val.commission_rate);
        let shared = tokens.checked_sub(&commission).ok_or_else(|| {
            DistrError::invariant(format!(
                "commission {} of validator {} exceeds allocation {}",
                commission, operator, tokens
            ))
        })?;

        ctx.emit(
            Event::new(events::COMMISSION)
                .attr(events::ATTR_AMOUNT, &commission)
                .attr(events::ATTR_VALIDATOR, operator),
        );
        let mut accumulated = store::get_commission(ctx, operator)?;
        accumulated.commission = accumulated.commission.add(&commission);
        store::set_commission(ctx, operator, &accumulated)?;

        current.rewards = current.rewards.add(&shared);
        store::set_current_rewards(ctx, operator, &current)?;

        ctx.emit(
            Event::new(events::REWARDS)
                .attr(events::ATTR_AMOUNT, tokens)
                .attr(events::ATTR_VALIDATOR, operator),
        );
        let mut outstanding = store::get_outstanding_rewards(ctx, operator)?;
        outstanding.rewards = outstanding.rewards.add(tokens);
        store::set_outstanding_rewards(ctx, operator, &outstanding)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::DistributionConfig;
    use crate::types::Params;
    use crate::FEE_COLLECTOR_NAME;
    use distr_math::Coins;
    use distr_store::MemStore;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_allocate_to_validator_splits_commission() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 100, dec("0.5"));
        k.initialize_validator(&mut ctx, &v).unwrap();
        let val = staking.validators.borrow()[&v].clone();

        let tokens = DecCoins::single("stake", dec("10"));
        k.allocate_tokens_to_validator(&mut ctx, &val, &tokens).unwrap();

        let five = DecCoins::single("stake", dec("5"));
        assert_eq!(store::get_commission(&ctx, &v).unwrap().commission, five);
        assert_eq!(
            store::get_current_rewards(&ctx, &v).unwrap().unwrap().rewards,
            five
        );
        assert_eq!(store::get_outstanding_rewards(&ctx, &v).unwrap().rewards, tokens);
        let kinds: Vec<&str> = ctx.events().iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec![events::COMMISSION, events::REWARDS]);
    }

    #[test]
    fn test_allocate_to_uninitialized_validator_is_fatal() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 100, dec("0.5"));
        let val = staking.validators.borrow()[&v].clone();

        let err = k
            .allocate_tokens_to_validator(&mut ctx, &val, &DecCoins::single("stake", dec("10")))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(store::get_current_rewards(&ctx, &v).unwrap().is_none());
        assert!(store::get_commission(&ctx, &v).unwrap().commission.is_zero());
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_allocate_tokens_two_validators() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 2);
        k.initialize(&mut ctx).unwrap();

        let (v0, v1) = (addr(1), addr(2));
        staking.add_validator(&v0, 100, dec("0.5"));
        staking.add_validator(&v1, 100, Dec::zero());
        k.initialize_validator(&mut ctx, &v0).unwrap();
        k.initialize_validator(&mut ctx, &v1).unwrap();

        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 100));
        let votes = vec![
            VoteInfo { cons_address: v0.clone(), power: 100, signed_last_block: true },
            VoteInfo { cons_address: v1.clone(), power: 100, signed_last_block: true },
        ];
        k.allocate_tokens(&mut ctx, 200, &votes).unwrap();

        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", dec("2"))
        );
        for v in [&v0, &v1] {
            assert_eq!(
                store::get_outstanding_rewards(&ctx, v).unwrap().rewards,
                DecCoins::single("stake", dec("49"))
            );
        }
        assert_eq!(
            store::get_commission(&ctx, &v0).unwrap().commission,
            DecCoins::single("stake", dec("24.5"))
        );
        assert!(store::get_commission(&ctx, &v1).unwrap().commission.is_zero());
        assert_eq!(
            store::get_current_rewards(&ctx, &v1).unwrap().unwrap().rewards,
            DecCoins::single("stake", dec("49"))
        );
        assert!((&bank)
            .get_all_balances(&ctx, &Address::module(FEE_COLLECTOR_NAME))
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_allocate_without_signers_goes_to_pool() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 2);
        k.initialize(&mut ctx).unwrap();
        k.set_params(&mut ctx, &Params { community_tax: Dec::zero(), ..Params::default() })
            .unwrap();

        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 33));
        k.allocate_tokens(&mut ctx, 0, &[]).unwrap();
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", dec("33"))
        );
    }

    #[test]
    fn test_unknown_voter_share_goes_to_pool() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 2);
        k.initialize(&mut ctx).unwrap();
        k.set_params(&mut ctx, &Params { community_tax: Dec::zero(), ..Params::default() })
            .unwrap();

        let v = addr(1);
        staking.add_validator(&v, 10, Dec::zero());
        k.initialize_validator(&mut ctx, &v).unwrap();
        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 10));
        let votes = vec![
            VoteInfo { cons_address: v.clone(), power: 1, signed_last_block: true },
            VoteInfo { cons_address: addr(7), power: 1, signed_last_block: true },
        ];
        k.allocate_tokens(&mut ctx, 2, &votes).unwrap();
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", dec("5"))
        );
        assert_eq!(
            store::get_outstanding_rewards(&ctx, &v).unwrap().rewards,
            DecCoins::single("stake", dec("5"))
        );
    }
}
