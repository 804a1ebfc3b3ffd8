// ─────────────────────────────────────────────────────────────────
// Delegator rewards
// ─────────────────────────────────────────────────────────────────
// A delegator's rewards between two periods are its stake times the
// difference of the validator's cumulative ratios at those periods.
// Slashes split the range: each slash closes a segment and scales the
// stake by (1 - fraction) for everything after it.
// ─────────────────────────────────────────────────────────────────

use log::{info, warn};

use distr_math::{Coins, Dec, DecCoins};

use super::{store, Keeper};
use crate::address::Address;
use crate::context::{events, Context, Event};
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::types::{Delegation, DelegatorStartingInfo, TokenizeShareRecord, Validator};
use crate::{MODULE_NAME, STAKE_TOLERANCE_UNITS};

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Start tracking `delegator` at the validator's last closed period.
    pub fn initialize_delegation(
        &self,
        ctx: &mut Context<'_>,
        validator: &Address,
        delegator: &Address,
    ) -> Result<()> {
        let current = store::get_current_rewards(ctx, validator)?
            .ok_or_else(|| DistrError::NoValidatorDistInfo(validator.to_hex()))?;
        let previous_period = current.previous_period().ok_or_else(|| {
            DistrError::invariant(format!("validator {} has no closed period", validator))
        })?;
        self.increment_reference_count(ctx, validator, previous_period)?;

        let val = self
            .staking()
            .validator(ctx, validator)?
            .ok_or_else(|| DistrError::NoValidatorExists(validator.to_hex()))?;
        let del = self
            .staking()
            .delegation(ctx, delegator, validator)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;

        let stake = val.tokens_from_shares_truncated(&del.shares);
        let height = ctx.height();
        store::set_starting_info(
            ctx,
            validator,
            delegator,
            &DelegatorStartingInfo {
                previous_period,
                stake,
                height,
            },
        )
    }

    /// Rewards for `stake` held from `starting_period` to `ending_period`.
    pub(crate) fn calculate_delegation_rewards_between(
        &self,
        ctx: &Context<'_>,
        val: &Address,
        starting_period: u64,
        ending_period: u64,
        stake: &Dec,
    ) -> Result<DecCoins> {
        if starting_period > ending_period {
            return Err(DistrError::invariant(format!(
                "starting period {} after ending period {}",
                starting_period, ending_period
            )));
        }
        if stake.is_negative() {
            return Err(DistrError::invariant(format!("negative stake {}", stake)));
        }

        let ratio = |period: u64| -> Result<DecCoins> {
            store::get_historical_rewards(ctx, val, period)?
                .map(|h| h.cumulative_reward_ratio)
                .ok_or_else(|| {
                    DistrError::invariant(format!(
                        "missing historical rewards for validator {} period {}",
                        val, period
                    ))
                })
        };
        let starting = ratio(starting_period)?;
        let ending = ratio(ending_period)?;

        let difference = ending.checked_sub(&starting).ok_or_else(|| {
            DistrError::invariant(format!(
                "cumulative ratio of {} decreased between periods {} and {}",
                val, starting_period, ending_period
            ))
        })?;
        Ok(difference.mul_dec_truncate(stake))
    }

    /// Rewards accrued by `del` up to `ending_period` (which must already be
    /// closed). Read-only.
    pub fn calculate_delegation_rewards(
        &self,
        ctx: &Context<'_>,
        val: &Validator,
        del: &Delegation,
        ending_period: u64,
    ) -> Result<DecCoins> {
        let operator = &val.operator;
        let starting_info = store::get_starting_info(ctx, operator, &del.delegator)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;

        let mut rewards = DecCoins::empty();
        let mut starting_period = starting_info.previous_period;
        let mut stake = starting_info.stake;

        let starting_height = starting_info.height;
        let ending_height = ctx.height();
        if ending_height >= starting_height {
            // A slash in the delegation's own block counts only if it closed a
            // period after the delegation started; one applied before the
            // delegation closed a period it never held.
            let slashes =
                store::slash_events_between(ctx, operator, starting_height, ending_height)?;
            for (_, event) in slashes {
                let boundary = event.validator_period.saturating_sub(1);
                if boundary > starting_period {
                    rewards = rewards.add(&self.calculate_delegation_rewards_between(
                        ctx,
                        operator,
                        starting_period,
                        boundary,
                        &stake,
                    )?);
                    stake = stake.mul_truncate(&(Dec::one() - event.fraction));
                    starting_period = boundary;
                }
            }
        }

        let current_stake = val.tokens_from_shares(&del.shares);
        if stake > current_stake {
            let margin = Dec::smallest().mul_int(STAKE_TOLERANCE_UNITS);
            if stake <= &current_stake + &margin {
                stake = current_stake;
            } else {
                return Err(DistrError::invariant(format!(
                    "calculated final stake for delegator {} greater than current stake\n\
                     \tfinal stake:\t{}\n\tcurrent stake:\t{}",
                    del.delegator, stake, current_stake
                )));
            }
        }

        rewards = rewards.add(&self.calculate_delegation_rewards_between(
            ctx,
            operator,
            starting_period,
            ending_period,
            &stake,
        )?);
        Ok(rewards)
    }

    /// Pay out everything `del` has accrued and drop its starting info. The
    /// caller re-initializes the delegation if it survives.
    pub(crate) fn withdraw_delegation_rewards_for(
        &self,
        ctx: &mut Context<'_>,
        val: &Validator,
        del: &Delegation,
    ) -> Result<Coins> {
        let operator = &val.operator;
        let starting_info = store::get_starting_info(ctx, operator, &del.delegator)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;

        let ending_period = self.increment_validator_period(ctx, val)?;
        let computed = self.calculate_delegation_rewards(ctx, val, del, ending_period)?;
        let mut outstanding = store::get_outstanding_rewards(ctx, operator)?;

        // Rounding can leave the calculation a hair above what is left.
        let rewards = computed.intersect(&outstanding.rewards);
        if rewards != computed {
            warn!(
                "rounding error withdrawing rewards from validator {}: got {}, expected {}",
                operator, rewards, computed
            );
        }

        let (coins, _remainder) = rewards.truncate_decimal()?;
        if !coins.is_zero() {
            let withdraw_addr = self.get_delegator_withdraw_addr(ctx, &del.delegator)?;
            self.bank()
                .send_coins_from_module_to_account(ctx, MODULE_NAME, &withdraw_addr, &coins)?;
        }

        // Only the integer part leaves; the remainder stays outstanding.
        outstanding.rewards = outstanding
            .rewards
            .checked_sub(&DecCoins::from_coins(&coins))
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "outstanding rewards of {} would go negative paying {}",
                    operator, coins
                ))
            })?;
        store::set_outstanding_rewards(ctx, operator, &outstanding)?;

        self.decrement_reference_count(ctx, operator, starting_info.previous_period)?;
        store::delete_starting_info(ctx, operator, &del.delegator)?;

        let amount = if coins.is_zero() {
            format!("0{}", self.bond_denom())
        } else {
            coins.to_string()
        };
        ctx.emit(
            Event::new(events::WITHDRAW_REWARDS)
                .attr(events::ATTR_AMOUNT, amount)
                .attr(events::ATTR_VALIDATOR, operator)
                .attr(events::ATTR_DELEGATOR, &del.delegator),
        );
        info!(
            "delegator {} withdrew {} from validator {}",
            del.delegator, coins, operator
        );
        Ok(coins)
    }

    /// Withdraw the rewards of `delegator` at `validator` and restart its
    /// accrual from the current period.
    pub fn withdraw_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Coins> {
        let val = self
            .staking()
            .validator(ctx, validator)?
            .ok_or_else(|| DistrError::NoValidatorExists(validator.to_hex()))?;
        let del = self
            .staking()
            .delegation(ctx, delegator, validator)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;

        let coins = self.withdraw_delegation_rewards_for(ctx, &val, &del)?;
        self.initialize_delegation(ctx, validator, delegator)?;
        Ok(coins)
    }

    // ─────────────────────────────────────────────────────────────────
    // Tokenized shares
    // ─────────────────────────────────────────────────────────────────

    /// Withdraw the record's delegation rewards into its module account and
    /// forward that account's whole balance to the record owner.
    pub(crate) fn withdraw_share_record_reward(
        &self,
        ctx: &mut Context<'_>,
        record: &TokenizeShareRecord,
    ) -> Result<Coins> {
        let val = self.staking().validator(ctx, &record.validator)?;
        let del = self
            .staking()
            .delegation(ctx, &record.module_address, &record.validator)?;

        if val.is_some() && del.is_some() {
            self.withdraw_delegation_rewards(ctx, &record.module_address, &record.validator)?;
        }

        let balance = self.bank().get_all_balances(ctx, &record.module_address)?;
        if !balance.is_zero() {
            self.bank()
                .send_coins(ctx, &record.module_address, &record.owner, &balance)?;
        }
        Ok(balance)
    }

    /// Owner-checked withdrawal for a single tokenize-share record.
    pub fn withdraw_single_share_record_reward(
        &self,
        ctx: &mut Context<'_>,
        owner: &Address,
        record_id: u64,
    ) -> Result<Coins> {
        let record = self
            .staking()
            .tokenize_share_record(ctx, record_id)?
            .ok_or(DistrError::NoTokenizeShareRecord(record_id))?;
        if &record.owner != owner {
            return Err(DistrError::NotTokenizeShareRecordOwner {
                id: record_id,
                owner: owner.to_hex(),
            });
        }

        let coins = self.withdraw_share_record_reward(ctx, &record)?;
        ctx.emit(
            Event::new(events::WITHDRAW_TOKENIZE_SHARE_REWARD)
                .attr(events::ATTR_OWNER, owner)
                .attr(events::ATTR_RECORD_ID, record_id)
                .attr(events::ATTR_AMOUNT, &coins),
        );
        Ok(coins)
    }

    /// Withdraw every record of `owner`. Each record commits on its own; a
    /// record that fails is logged and skipped unless the failure is fatal.
    pub fn withdraw_all_share_record_rewards(
        &self,
        ctx: &mut Context<'_>,
        owner: &Address,
    ) -> Result<Coins> {
        let records = self.staking().tokenize_share_records_by_owner(ctx, owner)?;
        let mut total = Coins::empty();

        for record in &records {
            match ctx.branch(|c| self.withdraw_share_record_reward(c, record)) {
                Ok(coins) => total = total.checked_add(&coins)?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(
                    "skipping tokenize share record {} of {}: {}",
                    record.id, owner, e
                ),
            }
        }

        ctx.emit(
            Event::new(events::WITHDRAW_TOKENIZE_SHARE_REWARD)
                .attr(events::ATTR_OWNER, owner)
                .attr(events::ATTR_AMOUNT, &total),
        );
        info!(
            "owner {} withdrew {} from {} tokenize share records",
            owner,
            total,
            records.len()
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::DistributionConfig;
    use crate::types::{ValidatorCurrentRewards, ValidatorOutstandingRewards};
    use distr_store::MemStore;

    fn dec(v: u128) -> Dec {
        Dec::from_u128(v)
    }

    /// Validator `v` with one delegator `d` holding all `tokens`, tracked
    /// from period 0.
    fn setup(
        k: &Keeper<&MapBank, &MapStaking>,
        staking: &MapStaking,
        ctx: &mut Context<'_>,
        tokens: u128,
    ) -> (Address, Address) {
        let (v, d) = (addr(1), addr(2));
        k.initialize(ctx).unwrap();
        staking.add_validator(&v, tokens, Dec::zero());
        staking.add_delegation(&d, &v, tokens);
        k.initialize_validator(ctx, &v).unwrap();
        k.initialize_delegation(ctx, &v, &d).unwrap();
        (v, d)
    }

    fn accrue(ctx: &mut Context<'_>, v: &Address, amount: u128) {
        let mut cur = store::get_current_rewards(ctx, v).unwrap().unwrap();
        cur.rewards = cur.rewards.add(&DecCoins::single("stake", dec(amount)));
        store::set_current_rewards(ctx, v, &cur).unwrap();
        let mut out = store::get_outstanding_rewards(ctx, v).unwrap();
        out.rewards = out.rewards.add(&DecCoins::single("stake", dec(amount)));
        store::set_outstanding_rewards(ctx, v, &out).unwrap();
    }

    #[test]
    fn test_rewards_between_periods() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let (v, d) = setup(&k, &staking, &mut ctx, 100);

        accrue(&mut ctx, &v, 10);
        let val = staking.validators.borrow()[&v].clone();
        let del = staking.delegations.borrow()[&(v.clone(), d.clone())].clone();
        let end = k.increment_validator_period(&mut ctx, &val).unwrap();
        let rewards = k.calculate_delegation_rewards(&ctx, &val, &del, end).unwrap();
        assert_eq!(rewards, DecCoins::single("stake", dec(10)));
    }

    #[test]
    fn test_reversed_periods_are_fatal() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let (v, _) = setup(&k, &staking, &mut ctx, 100);
        let err = k
            .calculate_delegation_rewards_between(&ctx, &v, 1, 0, &dec(1))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_withdraw_pays_integer_part_and_keeps_residue() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let (v, d) = setup(&k, &staking, &mut ctx, 3);
        bank.mint(
            &Keeper::<&MapBank, &MapStaking>::module_address(),
            &Coins::single("stake", 10),
        );
        accrue(&mut ctx, &v, 10);

        // 10 / 3 per token truncates, so 3 tokens earn 9.999... stake.
        let paid = k.withdraw_delegation_rewards(&mut ctx, &d, &v).unwrap();
        assert_eq!(paid, Coins::single("stake", 9));
        let outstanding = store::get_outstanding_rewards(&ctx, &v).unwrap().rewards;
        assert_eq!(outstanding, DecCoins::single("stake", dec(1)));

        let ev = ctx
            .events()
            .iter()
            .find(|e| e.kind == events::WITHDRAW_REWARDS)
            .unwrap();
        assert_eq!(ev.get(events::ATTR_AMOUNT), Some("9stake"));

        // Immediately again: nothing accrued, zero payout.
        let again = k.withdraw_delegation_rewards(&mut ctx, &d, &v).unwrap();
        assert!(again.is_zero());
        let last = ctx.events().last().unwrap();
        assert_eq!(last.get(events::ATTR_AMOUNT), Some("0stake"));
    }

    #[test]
    fn test_withdraw_unknown_delegation() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let (v, _) = setup(&k, &staking, &mut ctx, 100);
        assert!(matches!(
            k.withdraw_delegation_rewards(&mut ctx, &addr(9), &v),
            Err(DistrError::EmptyDelegationDistInfo)
        ));
        assert!(matches!(
            k.withdraw_delegation_rewards(&mut ctx, &addr(2), &addr(8)),
            Err(DistrError::NoValidatorExists(_))
        ));
    }

    #[test]
    fn test_stake_drift_within_tolerance_is_clamped() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let (v, d) = setup(&k, &staking, &mut ctx, 100);

        let mut si = store::get_starting_info(&ctx, &v, &d).unwrap().unwrap();
        si.stake = &si.stake + &Dec::smallest().mul_int(2);
        store::set_starting_info(&mut ctx, &v, &d, &si).unwrap();

        let val = staking.validators.borrow()[&v].clone();
        let del = staking.delegations.borrow()[&(v.clone(), d.clone())].clone();
        let end = k.increment_validator_period(&mut ctx, &val).unwrap();
        assert!(k.calculate_delegation_rewards(&ctx, &val, &del, end).is_ok());

        si.stake = &si.stake + &Dec::smallest().mul_int(10);
        store::set_starting_info(&mut ctx, &v, &d, &si).unwrap();
        let err = k
            .calculate_delegation_rewards(&ctx, &val, &del, end)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_initialize_delegation_requires_validator_state() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        assert!(matches!(
            k.initialize_delegation(&mut ctx, &addr(1), &addr(2)),
            Err(DistrError::NoValidatorDistInfo(_))
        ));
        // Current rewards without the matching historical record is corrupt.
        store::set_current_rewards(
            &mut ctx,
            &addr(1),
            &ValidatorCurrentRewards {
                rewards: DecCoins::empty(),
                period: 4,
            },
        )
        .unwrap();
        store::set_outstanding_rewards(
            &mut ctx,
            &addr(1),
            &ValidatorOutstandingRewards::default(),
        )
        .unwrap();
        assert!(k
            .initialize_delegation(&mut ctx, &addr(1), &addr(2))
            .unwrap_err()
            .is_fatal());
    }
}
