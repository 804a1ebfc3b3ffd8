// ─────────────────────────────────────────────────────────────────
// Validator periods
// ─────────────────────────────────────────────────────────────────
// Every change to a validator's stake closes its current period and
// snapshots the cumulative reward-per-token ratio into a historical
// record. Historical records are reference counted: one reference for
// the current period's predecessor, one per delegator starting there,
// one per slash event ending there. A record with no references left is
// deleted.
// ─────────────────────────────────────────────────────────────────

use log::{debug, info};

use distr_math::{Dec, DecCoins};

use super::{store, Keeper};
use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::types::{
    Validator, ValidatorAccumulatedCommission, ValidatorCurrentRewards,
    ValidatorHistoricalRewards, ValidatorOutstandingRewards, ValidatorSlashEvent,
};
use crate::MODULE_NAME;

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Fresh distribution state for a new validator: period 0 with a zero
    /// ratio, current period 1.
    pub fn initialize_validator(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()> {
        store::set_historical_rewards(
            ctx,
            val,
            0,
            &ValidatorHistoricalRewards {
                cumulative_reward_ratio: DecCoins::empty(),
                reference_count: 1,
            },
        )?;
        store::set_current_rewards(
            ctx,
            val,
            &ValidatorCurrentRewards {
                rewards: DecCoins::empty(),
                period: 1,
            },
        )?;
        store::set_commission(ctx, val, &ValidatorAccumulatedCommission::default())?;
        store::set_outstanding_rewards(ctx, val, &ValidatorOutstandingRewards::default())?;
        debug!("initialized distribution state for validator {}", val);
        Ok(())
    }

    /// Close the validator's current period and return its number.
    pub fn increment_validator_period(&self, ctx: &mut Context<'_>, val: &Validator) -> Result<u64> {
        let operator = &val.operator;
        let current = store::get_current_rewards(ctx, operator)?.ok_or_else(|| {
            DistrError::invariant(format!("no current rewards for validator {}", operator))
        })?;

        let ratio = if val.tokens == 0 {
            // Nobody to pay: the period's rewards go to the community pool.
            let mut pool = store::get_fee_pool(ctx)?;
            pool.community_pool = pool.community_pool.add(&current.rewards);
            store::set_fee_pool(ctx, &pool)?;

            let mut outstanding = store::get_outstanding_rewards(ctx, operator)?;
            outstanding.rewards = outstanding
                .rewards
                .checked_sub(&current.rewards)
                .ok_or_else(|| {
                    DistrError::invariant(format!(
                        "outstanding rewards of {} below current rewards {}",
                        operator, current.rewards
                    ))
                })?;
            store::set_outstanding_rewards(ctx, operator, &outstanding)?;
            DecCoins::empty()
        } else {
            current
                .rewards
                .quo_dec_truncate(&Dec::from_u128(val.tokens))
                .ok_or_else(|| DistrError::invariant("division by zero tokens".to_string()))?
        };

        let previous = current.previous_period().ok_or_else(|| {
            DistrError::invariant(format!("validator {} has no closed period", operator))
        })?;
        let historical = store::get_historical_rewards(ctx, operator, previous)?.ok_or_else(|| {
            DistrError::invariant(format!(
                "missing historical rewards for validator {} period {}",
                operator, previous
            ))
        })?;
        self.decrement_reference_count(ctx, operator, previous)?;

        store::set_historical_rewards(
            ctx,
            operator,
            current.period,
            &ValidatorHistoricalRewards {
                cumulative_reward_ratio: historical.cumulative_reward_ratio.add(&ratio),
                reference_count: 1,
            },
        )?;
        store::set_current_rewards(
            ctx,
            operator,
            &ValidatorCurrentRewards {
                rewards: DecCoins::empty(),
                period: current.period + 1,
            },
        )?;

        debug!(
            "validator {} closed period {} (ratio += {})",
            operator, current.period, ratio
        );
        Ok(current.period)
    }

    pub(crate) fn increment_reference_count(
        &self,
        ctx: &mut Context<'_>,
        val: &Address,
        period: u64,
    ) -> Result<()> {
        let mut historical = store::get_historical_rewards(ctx, val, period)?.ok_or_else(|| {
            DistrError::invariant(format!(
                "cannot reference missing period {} of validator {}",
                period, val
            ))
        })?;
        historical.reference_count += 1;
        store::set_historical_rewards(ctx, val, period, &historical)
    }

    pub(crate) fn decrement_reference_count(
        &self,
        ctx: &mut Context<'_>,
        val: &Address,
        period: u64,
    ) -> Result<()> {
        let mut historical = store::get_historical_rewards(ctx, val, period)?.ok_or_else(|| {
            DistrError::invariant(format!(
                "cannot dereference missing period {} of validator {}",
                period, val
            ))
        })?;
        if historical.reference_count == 0 {
            return Err(DistrError::invariant(format!(
                "reference count of validator {} period {} already zero",
                val, period
            )));
        }
        historical.reference_count -= 1;
        if historical.reference_count == 0 {
            store::delete_historical_rewards(ctx, val, period)
        } else {
            store::set_historical_rewards(ctx, val, period, &historical)
        }
    }

    /// Record a slash of `fraction` at the current height. The slash closes
    /// the current period; delegators crossing it later lose `fraction` of
    /// their stake from that boundary on.
    pub fn update_validator_slash_fraction(
        &self,
        ctx: &mut Context<'_>,
        val: &Address,
        fraction: &Dec,
    ) -> Result<()> {
        if fraction.is_negative() || fraction > &Dec::one() {
            return Err(DistrError::InvalidSlashFraction(fraction.to_string()));
        }

        let validator = self
            .staking()
            .validator(ctx, val)?
            .ok_or_else(|| DistrError::NoValidatorExists(val.to_hex()))?;

        let ended = self.increment_validator_period(ctx, &validator)?;
        self.increment_reference_count(ctx, val, ended)?;

        let height = ctx.height();
        let period = ended + 1;
        store::set_slash_event(
            ctx,
            val,
            height,
            period,
            &ValidatorSlashEvent {
                validator_period: period,
                fraction: fraction.clone(),
            },
        )?;
        info!(
            "validator {} slashed by {} at height {} (period {})",
            val, fraction, height, period
        );
        Ok(())
    }

    /// Tear down every distribution record of a removed validator. The
    /// commission's integer part is paid to the operator, everything else
    /// still outstanding (including truncation dust) goes to the community
    /// pool.
    pub fn remove_validator_state(&self, ctx: &mut Context<'_>, val: &Address) -> Result<()> {
        let mut outstanding = store::get_outstanding_rewards(ctx, val)?.rewards;
        let commission = store::get_commission(ctx, val)?.commission;

        if !commission.is_zero() {
            let (coins, _) = commission.truncate_decimal()?;
            if !coins.is_zero() {
                outstanding = outstanding
                    .checked_sub(&DecCoins::from_coins(&coins))
                    .ok_or_else(|| {
                        DistrError::invariant(format!(
                            "outstanding rewards of removed validator {} below its commission",
                            val
                        ))
                    })?;
                let withdraw_addr = self.get_delegator_withdraw_addr(ctx, val)?;
                self.bank()
                    .send_coins_from_module_to_account(ctx, MODULE_NAME, &withdraw_addr, &coins)?;
            }
        }

        let mut pool = store::get_fee_pool(ctx)?;
        pool.community_pool = pool.community_pool.add(&outstanding);
        store::set_fee_pool(ctx, &pool)?;

        store::delete_outstanding_rewards(ctx, val)?;
        store::delete_commission(ctx, val)?;
        store::delete_current_rewards(ctx, val)?;
        store::delete_validator_historical_rewards(ctx, val)?;
        store::delete_validator_slash_events(ctx, val)?;

        info!("removed distribution state of validator {}", val);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::DistributionConfig;
    use distr_math::Coins;
    use distr_store::MemStore;

    fn dec(v: u128) -> Dec {
        Dec::from_u128(v)
    }

    #[test]
    fn test_initialize_validator_records() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        k.initialize_validator(&mut ctx, &v).unwrap();
        let h0 = store::get_historical_rewards(&ctx, &v, 0).unwrap().unwrap();
        assert_eq!(h0.reference_count, 1);
        assert!(h0.cumulative_reward_ratio.is_zero());
        assert_eq!(
            store::get_current_rewards(&ctx, &v).unwrap().unwrap().period,
            1
        );
    }

    #[test]
    fn test_increment_period_accumulates_ratio() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 10, Dec::zero());
        k.initialize_validator(&mut ctx, &v).unwrap();

        store::set_current_rewards(
            &mut ctx,
            &v,
            &ValidatorCurrentRewards {
                rewards: DecCoins::single("stake", dec(50)),
                period: 1,
            },
        )
        .unwrap();
        let validator = staking.validators.borrow()[&v].clone();
        assert_eq!(k.increment_validator_period(&mut ctx, &validator).unwrap(), 1);

        // Period 0 lost its only reference and is gone.
        assert!(store::get_historical_rewards(&ctx, &v, 0).unwrap().is_none());
        let h1 = store::get_historical_rewards(&ctx, &v, 1).unwrap().unwrap();
        assert_eq!(h1.cumulative_reward_ratio, DecCoins::single("stake", dec(5)));
        assert_eq!(h1.reference_count, 1);

        let cur = store::get_current_rewards(&ctx, &v).unwrap().unwrap();
        assert_eq!(cur.period, 2);
        assert!(cur.rewards.is_zero());
    }

    #[test]
    fn test_zero_token_period_feeds_community_pool() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 0, Dec::zero());
        k.initialize_validator(&mut ctx, &v).unwrap();
        let rewards = DecCoins::single("stake", dec(7));
        store::set_current_rewards(
            &mut ctx,
            &v,
            &ValidatorCurrentRewards {
                rewards: rewards.clone(),
                period: 1,
            },
        )
        .unwrap();
        store::set_outstanding_rewards(
            &mut ctx,
            &v,
            &ValidatorOutstandingRewards {
                rewards: rewards.clone(),
            },
        )
        .unwrap();

        let validator = staking.validators.borrow()[&v].clone();
        k.increment_validator_period(&mut ctx, &validator).unwrap();
        assert_eq!(store::get_fee_pool(&ctx).unwrap().community_pool, rewards);
        assert!(store::get_outstanding_rewards(&ctx, &v)
            .unwrap()
            .rewards
            .is_zero());
        assert!(store::get_historical_rewards(&ctx, &v, 1)
            .unwrap()
            .unwrap()
            .cumulative_reward_ratio
            .is_zero());
    }

    #[test]
    fn test_reference_count_underflow_is_fatal() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let v = addr(1);
        k.initialize_validator(&mut ctx, &v).unwrap();

        k.increment_reference_count(&mut ctx, &v, 0).unwrap();
        k.decrement_reference_count(&mut ctx, &v, 0).unwrap();
        k.decrement_reference_count(&mut ctx, &v, 0).unwrap();
        let err = k.decrement_reference_count(&mut ctx, &v, 0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_slash_records_event_and_reference() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 5);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 100, Dec::zero());
        k.initialize_validator(&mut ctx, &v).unwrap();

        assert!(matches!(
            k.update_validator_slash_fraction(&mut ctx, &v, &dec(2)),
            Err(DistrError::InvalidSlashFraction(_))
        ));

        let half = Dec::with_prec(5, 1);
        k.update_validator_slash_fraction(&mut ctx, &v, &half).unwrap();
        let events = store::slash_events_between(&ctx, &v, 0, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, 5);
        assert_eq!(events[0].1.validator_period, 2);
        assert_eq!(events[0].1.fraction, half);
        // Held by the slash event and as predecessor of current period 2.
        assert_eq!(
            store::get_historical_rewards(&ctx, &v, 1)
                .unwrap()
                .unwrap()
                .reference_count,
            2
        );
    }

    #[test]
    fn test_remove_validator_state_pays_commission_and_sweeps_dust() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        k.initialize_validator(&mut ctx, &v).unwrap();
        bank.mint(&Keeper::<&MapBank, &MapStaking>::module_address(), &Coins::single("stake", 10));
        store::set_commission(
            &mut ctx,
            &v,
            &ValidatorAccumulatedCommission {
                commission: DecCoins::single("stake", "3.5".parse().unwrap()),
            },
        )
        .unwrap();
        store::set_outstanding_rewards(
            &mut ctx,
            &v,
            &ValidatorOutstandingRewards {
                rewards: DecCoins::single("stake", "4.25".parse().unwrap()),
            },
        )
        .unwrap();

        k.remove_validator_state(&mut ctx, &v).unwrap();
        assert_eq!(
            (&bank).get_all_balances(&ctx, &v).unwrap(),
            Coins::single("stake", 3)
        );
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", "1.25".parse().unwrap())
        );
        assert!(store::get_current_rewards(&ctx, &v).unwrap().is_none());
        assert!(store::all_historical_rewards(&ctx).unwrap().is_empty());
    }
}
