// ─────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────
// Reads never persist anything. Reward queries need a closed period, so
// they run inside `Context::simulate` and close one there.
// ─────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use distr_math::DecCoins;

use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::{store, Keeper};
use crate::types::{Delegation, Params, Validator, ValidatorSlashEvent};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidatorDistributionInfo {
    pub operator_address: Address,
    /// Pending rewards of the operator's own delegation.
    pub self_bond_rewards: DecCoins,
    pub commission: DecCoins,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegationDelegatorReward {
    pub validator_address: Address,
    pub reward: DecCoins,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegationTotalRewards {
    pub rewards: Vec<DelegationDelegatorReward>,
    pub total: DecCoins,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenizeShareRecordReward {
    pub record_id: u64,
    pub reward: DecCoins,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenizeShareRecordRewards {
    pub rewards: Vec<TokenizeShareRecordReward>,
    pub total: DecCoins,
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    pub fn query_params(&self, ctx: &Context<'_>) -> Result<Params> {
        store::get_params(ctx)
    }

    pub fn query_validator_distribution_info(
        &self,
        ctx: &mut Context<'_>,
        validator: &Address,
    ) -> Result<ValidatorDistributionInfo> {
        let val = self.query_validator(ctx, validator)?;
        let delegation = self.staking().delegation(ctx, validator, validator)?;
        let self_bond_rewards = match delegation {
            Some(del) => self.pending_rewards(ctx, &val, &del)?,
            None => DecCoins::empty(),
        };
        Ok(ValidatorDistributionInfo {
            operator_address: validator.clone(),
            self_bond_rewards,
            commission: store::get_commission(ctx, validator)?.commission,
        })
    }

    pub fn query_validator_outstanding_rewards(
        &self,
        ctx: &Context<'_>,
        validator: &Address,
    ) -> Result<DecCoins> {
        self.query_validator(ctx, validator)?;
        Ok(store::get_outstanding_rewards(ctx, validator)?.rewards)
    }

    pub fn query_validator_commission(
        &self,
        ctx: &Context<'_>,
        validator: &Address,
    ) -> Result<DecCoins> {
        self.query_validator(ctx, validator)?;
        Ok(store::get_commission(ctx, validator)?.commission)
    }

    /// Slash events with `starting_height <= height <= ending_height`.
    pub fn query_validator_slashes(
        &self,
        ctx: &Context<'_>,
        validator: &Address,
        starting_height: u64,
        ending_height: u64,
    ) -> Result<Vec<(u64, ValidatorSlashEvent)>> {
        if starting_height > ending_height {
            return Err(DistrError::InvalidParams(format!(
                "starting height {} greater than ending height {}",
                starting_height, ending_height
            )));
        }
        store::slash_events_between(ctx, validator, starting_height, ending_height)
    }

    pub fn query_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        validator: &Address,
    ) -> Result<DecCoins> {
        let val = self.query_validator(ctx, validator)?;
        let del = self
            .staking()
            .delegation(ctx, delegator, validator)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;
        self.pending_rewards(ctx, &val, &del)
    }

    pub fn query_delegation_total_rewards(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
    ) -> Result<DelegationTotalRewards> {
        let delegations = self.staking().delegator_delegations(ctx, delegator)?;
        let mut rewards = Vec::with_capacity(delegations.len());
        let mut total = DecCoins::empty();
        for del in &delegations {
            let val = self.query_validator(ctx, &del.validator)?;
            let reward = self.pending_rewards(ctx, &val, del)?;
            total = total.add(&reward);
            rewards.push(DelegationDelegatorReward {
                validator_address: del.validator.clone(),
                reward,
            });
        }
        Ok(DelegationTotalRewards { rewards, total })
    }

    pub fn query_delegator_validators(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
    ) -> Result<Vec<Address>> {
        Ok(self
            .staking()
            .delegator_delegations(ctx, delegator)?
            .into_iter()
            .map(|d| d.validator)
            .collect())
    }

    pub fn query_delegator_withdraw_address(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
    ) -> Result<Address> {
        self.get_delegator_withdraw_addr(ctx, delegator)
    }

    pub fn query_community_pool(&self, ctx: &Context<'_>) -> Result<DecCoins> {
        Ok(store::get_fee_pool(ctx)?.community_pool)
    }

    /// Pending rewards of every tokenize-share record held by `owner`.
    pub fn query_tokenize_share_record_rewards(
        &self,
        ctx: &mut Context<'_>,
        owner: &Address,
    ) -> Result<TokenizeShareRecordRewards> {
        let records = self.staking().tokenize_share_records_by_owner(ctx, owner)?;
        let mut rewards = Vec::new();
        let mut total = DecCoins::empty();
        for record in records {
            let val = match self.staking().validator(ctx, &record.validator)? {
                Some(v) => v,
                None => continue,
            };
            let del = match self
                .staking()
                .delegation(ctx, &record.module_address, &record.validator)?
            {
                Some(d) => d,
                None => continue,
            };
            let reward = self.pending_rewards(ctx, &val, &del)?;
            total = total.add(&reward);
            rewards.push(TokenizeShareRecordReward {
                record_id: record.id,
                reward,
            });
        }
        Ok(TokenizeShareRecordRewards { rewards, total })
    }

    /// Sum of reference counts over every historical rewards record.
    pub fn query_historical_reference_count(&self, ctx: &Context<'_>) -> Result<u64> {
        Ok(store::all_historical_rewards(ctx)?
            .iter()
            .map(|(_, _, h)| u64::from(h.reference_count))
            .sum())
    }

    fn query_validator(&self, ctx: &Context<'_>, validator: &Address) -> Result<Validator> {
        self.staking()
            .validator(ctx, validator)?
            .ok_or_else(|| DistrError::NoValidatorExists(validator.to_hex()))
    }

    /// Rewards `del` would receive if it withdrew now.
    fn pending_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &Validator,
        del: &Delegation,
    ) -> Result<DecCoins> {
        ctx.simulate(|sim| {
            let ending_period = self.increment_validator_period(sim, val)?;
            self.calculate_delegation_rewards(sim, val, del, ending_period)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::keeper::test_support::*;
    use distr_math::Dec;
    use distr_store::MemStore;

    #[test]
    fn test_delegation_rewards_query_does_not_persist() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 100, Dec::with_prec(5, 1));
        staking.add_delegation(&v, &v, 100);
        k.initialize_validator(&mut ctx, &v).unwrap();
        k.initialize_delegation(&mut ctx, &v, &v).unwrap();

        let val = staking.validators.borrow()[&v].clone();
        k.allocate_tokens_to_validator(&mut ctx, &val, &DecCoins::single("stake", Dec::from_u128(10)))
            .unwrap();

        let five = DecCoins::single("stake", Dec::from_u128(5));
        assert_eq!(k.query_delegation_rewards(&mut ctx, &v, &v).unwrap(), five);
        // Same answer twice: the simulated period close was discarded.
        assert_eq!(k.query_delegation_rewards(&mut ctx, &v, &v).unwrap(), five);
        assert_eq!(store::get_current_rewards(&ctx, &v).unwrap().unwrap().period, 1);

        let info = k.query_validator_distribution_info(&mut ctx, &v).unwrap();
        assert_eq!(info.self_bond_rewards, five);
        assert_eq!(info.commission, five);

        let total = k.query_delegation_total_rewards(&mut ctx, &v).unwrap();
        assert_eq!(total.total, five);
        assert_eq!(total.rewards.len(), 1);
        assert_eq!(k.query_delegator_validators(&ctx, &v).unwrap(), vec![v.clone()]);
        // Period 0 held by the current record and the starting info.
        assert_eq!(k.query_historical_reference_count(&ctx).unwrap(), 2);
    }

    #[test]
    fn test_slash_query_bounds() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 3);
        k.initialize(&mut ctx).unwrap();

        let v = addr(1);
        staking.add_validator(&v, 100, Dec::zero());
        k.initialize_validator(&mut ctx, &v).unwrap();
        k.update_validator_slash_fraction(&mut ctx, &v, &Dec::with_prec(1, 1))
            .unwrap();

        assert_eq!(k.query_validator_slashes(&ctx, &v, 3, 3).unwrap().len(), 1);
        assert!(k.query_validator_slashes(&ctx, &v, 4, 9).unwrap().is_empty());
        assert!(matches!(
            k.query_validator_slashes(&ctx, &v, 5, 4),
            Err(DistrError::InvalidParams(_))
        ));
        assert!(matches!(
            k.query_validator_outstanding_rewards(&ctx, &addr(9)),
            Err(DistrError::NoValidatorExists(_))
        ));
    }
}
